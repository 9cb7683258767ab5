//! Parsing of the `player_migration.php` case page.
//!
//! The page carries two `<h1>`-headed tables: the "Hard facts" summary and the
//! list of names the player finished maps on. Neither table has an id, and the
//! heading texts are not always present, so each table is located by trying
//! an ordered list of [`TableStrategy`] values.

use super::text::{clean_text, digits_only, spaced_text, split_shared_with, stripped_text};
use crate::error::{Result, ReviewError};
use crate::models::{CaseRow, CaseSummary};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static HEADING_OR_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANY_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

pub const TOTAL_FINISHES_KEY: &str = "Total finishes";
pub const SHARED_WITH_KEY: &str = "Same user or shared computer as/with";

/// One way of finding a table on the case page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    /// The first table after the first heading whose text contains the
    /// (lowercase) marker, compared case-insensitively.
    HeadingContains(&'static str),
    /// The first table after the n-th heading (0-based).
    NthHeading(usize),
}

pub const SUMMARY_TABLE: [TableStrategy; 2] = [
    TableStrategy::HeadingContains("hard facts"),
    TableStrategy::NthHeading(0),
];

pub const NAMES_TABLE: [TableStrategy; 2] = [
    TableStrategy::HeadingContains("finished on"),
    TableStrategy::NthHeading(1),
];

impl TableStrategy {
    pub fn locate<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        let mut headings = document.select(&HEADING);
        let heading = match *self {
            TableStrategy::HeadingContains(marker) => {
                headings.find(|h| stripped_text(*h).to_lowercase().contains(marker))
            }
            TableStrategy::NthHeading(n) => headings.nth(n),
        }?;
        table_after(document, heading)
    }
}

/// Tries each strategy in turn and returns the first table found.
pub fn locate_table<'a>(document: &'a Html, strategies: &[TableStrategy]) -> Option<ElementRef<'a>> {
    strategies.iter().find_map(|s| s.locate(document))
}

/// First `<table>` following `heading` in document order.
fn table_after<'a>(document: &'a Html, heading: ElementRef<'a>) -> Option<ElementRef<'a>> {
    document
        .select(&HEADING_OR_TABLE)
        .skip_while(|el| el.id() != heading.id())
        .skip(1)
        .find(|el| el.value().name() == "table")
}

/// Parses a whole case page into its summary and deduplicated name rows.
pub fn parse_case_page(html: &str) -> Result<(CaseSummary, Vec<CaseRow>)> {
    let document = Html::parse_document(html);

    let headings = document.select(&HEADING).count();
    if headings < 2 {
        return Err(ReviewError::PageStructure(format!(
            "expected at least 2 headers, found {}",
            headings
        )));
    }

    let summary = locate_table(&document, &SUMMARY_TABLE)
        .map(parse_summary_table)
        .unwrap_or_default();
    let rows = locate_table(&document, &NAMES_TABLE)
        .map(parse_names_table)
        .unwrap_or_default();

    Ok((summary, rows))
}

/// Cleaned key to cleaned value, from every row with at least two cells.
pub fn parse_key_value_table(table: ElementRef<'_>) -> HashMap<String, String> {
    let mut kv = HashMap::new();
    for row in table.select(&ROW) {
        let cells: Vec<_> = row.select(&ANY_CELL).collect();
        if cells.len() < 2 {
            continue;
        }
        let key = clean_text(&spaced_text(cells[0]));
        if key.is_empty() {
            continue;
        }
        kv.insert(key, clean_text(&spaced_text(cells[1])));
    }
    kv
}

pub fn parse_summary_table(table: ElementRef<'_>) -> CaseSummary {
    let kv = parse_key_value_table(table);
    CaseSummary {
        total_finishes: kv.get(TOTAL_FINISHES_KEY).and_then(|v| digits_only(v)),
        same_user_with: kv
            .get(SHARED_WITH_KEY)
            .map(|v| split_shared_with(v))
            .unwrap_or_default(),
    }
}

/// Name/finishes rows, header skipped.
///
/// The site nests `<tr>`s inside each other on some pages, which makes a row
/// show up twice; identical `(name, finishes)` pairs are kept once.
pub fn parse_names_table(table: ElementRef<'_>) -> Vec<CaseRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for row in table.select(&ROW).skip(1) {
        let cells: Vec<_> = row.select(&DATA_CELL).collect();
        if cells.len() != 2 {
            continue;
        }
        let entry = CaseRow {
            name: stripped_text(cells[0]),
            finishes: stripped_text(cells[1]),
        };
        if seen.insert(entry.clone()) {
            rows.push(entry);
        }
    }
    rows
}
