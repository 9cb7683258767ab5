use super::text::{clean_text, stripped_text};
use crate::models::{CheckFailure, CheckResult, Migration, Registration};
use scraper::{Html, Selector};
use std::sync::LazyLock;

static EMAIL_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name=\"inputEmail\"]").unwrap());
static LABEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("label").unwrap());
static LABEL_OR_DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("label, div").unwrap());

pub const MIGRATION_LABEL: &str = "Migration Status";

/// Reads the registration state off a `player_edit.php` page.
pub fn parse_registration(html: &str) -> Registration {
    let document = Html::parse_document(html);

    let Some(input) = document.select(&EMAIL_INPUT).next() else {
        return Registration::UnregisteredNoField;
    };

    let email = input.value().attr("value").unwrap_or_default().trim();
    if email.is_empty() {
        Registration::Unregistered
    } else {
        Registration::Registered
    }
}

/// Reads the migration state off a `player_edit.php` page.
///
/// The value sits in the first `<div>` after the "Migration Status" label,
/// sometimes wrapped in double quotes.
pub fn parse_migration(html: &str) -> CheckResult<Migration> {
    let document = Html::parse_document(html);

    let Some(label) = document
        .select(&LABEL)
        .find(|l| clean_text(&stripped_text(*l)) == MIGRATION_LABEL)
    else {
        return Ok(Migration::NotMigrated);
    };

    let value = document
        .select(&LABEL_OR_DIV)
        .skip_while(|el| el.id() != label.id())
        .skip(1)
        .find(|el| el.value().name() == "div")
        .map(stripped_text)
        .ok_or_else(|| CheckFailure::parse("no value after the Migration Status label"))?;

    if value.trim_matches('"') == "Banned" {
        Ok(Migration::Banned)
    } else {
        Ok(Migration::Migrated)
    }
}
