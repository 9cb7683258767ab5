use crate::models::PlayerRecord;
use std::io::{self, Write};

const RULEBOOK_URL: &str = "https://discord.com/channels/342003344476471296/978628693389885490";
const BANNER_WIDTH: usize = 80;

/// Names a review message would list, with the reviewed name left out when
/// `exclude_self` is set (compared trimmed and case-insensitively).
pub fn listed_names<'a>(
    review_name: &str,
    players: impl IntoIterator<Item = &'a PlayerRecord>,
    exclude_self: bool,
) -> Vec<&'a str> {
    let own = review_name.trim().to_lowercase();
    players
        .into_iter()
        .filter(|p| !exclude_self || p.name.trim().to_lowercase() != own)
        .map(|p| p.name.as_str())
        .collect()
}

/// The message posted to the player under review.
pub fn build_message<'a>(
    review_name: &str,
    players: impl IntoIterator<Item = &'a PlayerRecord>,
    exclude_self: bool,
) -> String {
    let names = listed_names(review_name, players, exclude_self);

    let mut msg = format!("## Manual review is for: `{}`\n", review_name);
    msg.push_str(
        "Have you registered or completed a map with one or more of the following names?\n\n",
    );

    if names.is_empty() {
        msg.push_str("_(no other names found)_");
    } else {
        let bullets: Vec<String> = names.iter().map(|n| format!("- `{}`", n)).collect();
        msg.push_str(&bullets.join("\n"));
    }

    msg.push_str("\n\n### Please elaborate your case:\n");
    msg.push_str("- If you already registered one of these names, why are you trying to register a new name?\n");
    msg.push_str("- If you just finished with one of these names, please do not finish maps for other names besides the one associated with your account.\n");
    msg.push_str("- If you did not register or finish maps for any of these names, please confirm that you did not register or finish any maps for these names.\n\n");
    msg.push_str(&format!(
        "*While you are waiting for us, make sure to familiarize yourself with our [#kog-rulebook]({})*",
        RULEBOOK_URL
    ));

    msg
}

/// Players whose registration check came back `REGISTERED`.
pub fn registered_only(players: &[PlayerRecord]) -> Vec<&PlayerRecord> {
    players.iter().filter(|p| p.is_registered()).collect()
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|v| v.chars().count()).max().unwrap_or(0) + 2
}

/// Computed layout of the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub name_width: usize,
    pub status_width: usize,
    /// `None` when no player has a migration label.
    pub migration_width: Option<usize>,
    pub finishes_width: usize,
    pub show_percentage: bool,
}

impl TableLayout {
    pub fn for_players(players: &[PlayerRecord]) -> Self {
        let statuses: Vec<String> = players.iter().map(|p| p.status_label()).collect();
        let migrations: Vec<String> = players.iter().map(|p| p.migration_label()).collect();

        let migration_width = if migrations.iter().any(|m| !m.is_empty()) {
            Some(column_width(migrations.iter().map(String::as_str)))
        } else {
            None
        };

        Self {
            name_width: column_width(players.iter().map(|p| p.name.as_str())),
            status_width: column_width(statuses.iter().map(String::as_str)),
            migration_width,
            finishes_width: column_width(players.iter().map(|p| p.finishes.as_str())),
            show_percentage: players.iter().any(|p| p.match_percentage.is_some()),
        }
    }
}

/// Writes the results as a fixed-width table.
pub fn render_table<W: Write>(players: &[PlayerRecord], out: &mut W) -> io::Result<()> {
    if players.is_empty() {
        return writeln!(out, "No players to display");
    }

    let layout = TableLayout::for_players(players);

    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;

    let mut header = format!(
        "{:<nw$} {:<sw$}",
        "Name",
        "Status",
        nw = layout.name_width,
        sw = layout.status_width
    );
    if let Some(mw) = layout.migration_width {
        header.push_str(&format!(" {:<mw$}", "Migration"));
    }
    header.push_str(&format!(" {:<fw$}", "Finishes", fw = layout.finishes_width));
    if layout.show_percentage {
        header.push_str(" IP Match %");
    }
    writeln!(out, "{}", header)?;
    writeln!(out, "{}", "-".repeat(BANNER_WIDTH))?;

    for p in players {
        let mut row = format!(
            "{:<nw$} {:<sw$}",
            p.name,
            p.status_label(),
            nw = layout.name_width,
            sw = layout.status_width
        );
        if let Some(mw) = layout.migration_width {
            row.push_str(&format!(" {:<mw$}", p.migration_label()));
        }
        row.push_str(&format!(" {:<fw$}", p.finishes, fw = layout.finishes_width));
        if let Some(pct) = p.match_percentage {
            row.push_str(&format!(" {}%", pct));
        }
        writeln!(out, "{}", row)?;
    }

    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;
    writeln!(out)
}
