//! Shared text normalization utilities
//!
//! Titles scraped from the index and the catalogs carry year/quality
//! decorations ("Movie Title (2015) [720p]") and stray HTML whitespace.
//! Everything stored on a record or compared by the matcher goes through here.

use once_cell::sync::Lazy;
use regex::Regex;

/// Letters kept by [`fold_for_matching`] besides ASCII alphanumerics
pub const DEFAULT_EXTRA_LETTERS: &str = "áéíóúüñ";

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\(.*?\)").expect("parenthesis pattern is valid"));
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*?\]").expect("bracket pattern is valid"));

/// Canonical form of a title.
/// Removes every `(...)` span, then every `[...]` span (shortest match), then trims.
///
/// # Example
/// ```ignore
/// assert_eq!(normalize_title("Her (2013) [HD]"), "Her");
/// ```
pub fn normalize_title(raw: &str) -> String {
    let without_parens = PARENTHESIZED.replace_all(raw, "");
    let without_brackets = BRACKETED.replace_all(&without_parens, "");
    without_brackets.trim().to_string()
}

/// Collapse runs of whitespace (including newlines from markup) into single spaces
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold a title for subset matching.
/// Normalizes, lowercases, drops every character that is not an ASCII
/// alphanumeric, whitespace or one of `extra_letters`, and collapses whitespace.
pub fn fold_for_matching(raw: &str, extra_letters: &str) -> String {
    let folded: String = normalize_title(raw)
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_ascii_alphanumeric() || extra_letters.contains(c) {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    clean_text(&folded)
}
