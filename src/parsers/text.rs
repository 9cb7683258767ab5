//! Text clean-up shared by the page parsers.

use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;
use tracing::debug;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Separators of the free-text "shared with" field: a comma or the word "and".
static SHARED_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\band\b").unwrap());

const NA_SPELLINGS: [&str; 5] = ["n/a", "na", "none", "-", ""];

/// Normalises a scraped label or value: non-breaking spaces become spaces,
/// whitespace runs collapse, and a single trailing colon is dropped.
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\u{a0}', " ");
    let collapsed = WHITESPACE.replace_all(&text, " ");
    let trimmed = collapsed.trim();
    trimmed
        .strip_suffix(':')
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

/// Whether a value is one of the site's spellings of "not applicable".
pub fn is_na(text: &str) -> bool {
    let text = text.replace('\u{a0}', " ");
    let text = WHITESPACE.replace_all(text.trim(), " ").to_lowercase();
    NA_SPELLINGS.contains(&text.as_str())
}

/// Number made of every ASCII digit in `text`, e.g. `"1,234 maps"` is 1234.
/// Saturates at `u64::MAX`.
pub fn digits_only(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    match digits.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            debug!("{} digits overflow u64, saturating", digits.len());
            Some(u64::MAX)
        }
    }
}

/// Splits the "shared with" field into names. "Not applicable" yields nothing.
pub fn split_shared_with(text: &str) -> Vec<String> {
    if is_na(text) {
        return Vec::new();
    }
    SHARED_SEPARATOR
        .split(text)
        .map(|part| part.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\''))
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text nodes of `element`, each trimmed, concatenated.
pub fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Non-empty trimmed text nodes of `element` joined by single spaces.
pub fn spaced_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_normalises_labels() {
        assert_eq!(clean_text("  Total\u{a0}finishes: "), "Total finishes");
        assert_eq!(clean_text("Same user\n\t or shared:"), "Same user or shared");
        assert_eq!(clean_text("a::"), "a:");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn na_spellings_are_case_and_space_insensitive() {
        for text in ["N/A", " n/a ", "NA", "None", "-", "", "\u{a0}NONE\u{a0}"] {
            assert!(is_na(text), "{:?} should be n/a", text);
        }
        assert!(!is_na("Bob"));
    }

    #[test]
    fn digits_only_ignores_everything_else() {
        assert_eq!(digits_only("Total finishes: 1,234 maps"), Some(1234));
        assert_eq!(digits_only("none"), None);
        assert_eq!(digits_only(""), None);
        assert_eq!(digits_only("000042"), Some(42));
        assert_eq!(digits_only(&"9".repeat(25)), Some(u64::MAX));
    }

    #[test]
    fn shared_with_splits_on_comma_and_word_and() {
        assert_eq!(
            split_shared_with("Bob and Carol, Dave"),
            vec!["Bob", "Carol", "Dave"]
        );
        assert_eq!(
            split_shared_with("\"Sandy\" AND 'Andrew'"),
            vec!["Sandy", "Andrew"]
        );
        assert!(split_shared_with(" n/A ").is_empty());
        assert!(split_shared_with(", ,").is_empty());
    }
}
