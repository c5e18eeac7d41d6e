//! Record linkage between a movie title and a source's search results
//!
//! Search listings are already ranked by the source, so the matcher walks
//! them in presentation order and stops at the first acceptable candidate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::text_utils::{DEFAULT_EXTRA_LETTERS, fold_for_matching, normalize_title};

/// One entry of a search result listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate<L> {
    /// Display text as shown by the source
    pub text: String,
    /// Source-specific reference used to fetch the detail page
    pub locator: L,
}

impl<L> Candidate<L> {
    pub fn new(text: impl Into<String>, locator: L) -> Self {
        Self {
            text: text.into(),
            locator,
        }
    }
}

/// How a candidate title is compared to the target title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Normalized titles must be equal (case-sensitive)
    Exact,
    /// Every word of the folded target must appear somewhere in the folded candidate
    Subset,
}

/// Selects the candidate that represents the same movie
#[derive(Debug, Clone)]
pub struct TitleMatcher {
    extra_letters: String,
}

impl Default for TitleMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXTRA_LETTERS)
    }
}

impl TitleMatcher {
    /// `extra_letters` are the non-ASCII letters of the sources' alphabet that survive folding
    pub fn new(extra_letters: impl Into<String>) -> Self {
        Self {
            extra_letters: extra_letters.into(),
        }
    }

    /// First candidate accepted under `mode`, in presentation order
    pub fn find_match<'a, L>(
        &self,
        target: &str,
        candidates: &'a [Candidate<L>],
        mode: MatchMode,
    ) -> Option<&'a L> {
        let found = match mode {
            MatchMode::Exact => {
                let target = normalize_title(target);
                candidates
                    .iter()
                    .find(|c| normalize_title(&c.text) == target)
            }
            MatchMode::Subset => {
                let target = fold_for_matching(target, &self.extra_letters);
                let words: Vec<&str> = target.split(' ').filter(|w| !w.is_empty()).collect();
                // A title that folds to nothing carries no evidence to match on
                if words.is_empty() {
                    debug!("Target title folds to no words, skipping match");
                    return None;
                }
                candidates.iter().find(|c| {
                    let folded = fold_for_matching(&c.text, &self.extra_letters);
                    words.iter().all(|w| folded.contains(w))
                })
            }
        };

        if let Some(candidate) = found {
            debug!(target = %target, candidate = %candidate.text, mode = ?mode, "Match found");
        }
        found.map(|c| &c.locator)
    }
}
