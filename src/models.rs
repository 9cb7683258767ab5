use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate data from the "Hard facts" section of a case page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    /// Total number of finishes, if the page states one.
    pub total_finishes: Option<u64>,
    /// Names the case is flagged as sharing a user or computer with.
    pub same_user_with: Vec<String>,
}

/// One row of the "Finished on names" table of a case page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseRow {
    pub name: String,
    /// Shown as scraped; not guaranteed to be numeric.
    pub finishes: String,
}

/// Whether a player name is registered to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Registration {
    /// The edit page carries a non-empty email.
    Registered,
    /// The email field is present but empty.
    Unregistered,
    /// The edit page has no email field at all.
    UnregisteredNoField,
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Registration::Registered => "REGISTERED",
            Registration::Unregistered => "UNREGISTERED",
            Registration::UnregisteredNoField => "UNREGISTERED (NO EMAIL FIELD)",
        })
    }
}

/// Account-migration state of a player name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Migration {
    /// Migrated and not banned. Rendered as an empty cell.
    Migrated,
    Banned,
    NotMigrated,
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Migration::Migrated => "",
            Migration::Banned => "BANNED",
            Migration::NotMigrated => "NOT MIGRATED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The page could not be fetched.
    Transport,
    /// The page was fetched but did not have the expected shape.
    Parse,
}

/// A per-player lookup that failed without aborting the rest of the review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl CheckFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Parse,
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR: {}", self.message)
    }
}

pub type CheckResult<T> = std::result::Result<T, CheckFailure>;

/// A candidate name together with everything checked about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub finishes: String,
    pub status: CheckResult<Registration>,
    pub migration: CheckResult<Migration>,
    /// Only filled when an IP was given and the name is registered.
    pub match_percentage: Option<u8>,
}

impl PlayerRecord {
    pub fn is_registered(&self) -> bool {
        matches!(self.status, Ok(Registration::Registered))
    }

    pub fn status_label(&self) -> String {
        label(&self.status)
    }

    pub fn migration_label(&self) -> String {
        label(&self.migration)
    }
}

fn label<T: fmt::Display>(result: &CheckResult<T>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(failure) => failure.to_string(),
    }
}
