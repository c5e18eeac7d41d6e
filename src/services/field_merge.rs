//! Field merge policy
//!
//! Integrates one source's [`FieldMap`] into a [`MovieRecord`], field by field.
//! With `overwrite` off a fetch only fills gaps; with it on, any present
//! incoming value replaces what is stored. The per-field behavior lives in
//! [`FIELD_RULES`], a table from canonical field name to slot and policy.

use tracing::{debug, warn};

use super::text_utils::{clean_text, normalize_title};
use crate::models::{FieldMap, MovieRecord};

/// Delimiter between genre tokens
pub const GENRE_DELIMITER: char = '|';

/// Something that may be missing even when it is set (e.g. an empty string)
pub trait FieldValue {
    fn is_present(&self) -> bool;
}

impl FieldValue for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl FieldValue for &str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

/// Overwrite policy for a single field
pub fn merge_field<V: FieldValue>(existing: Option<V>, incoming: Option<V>, overwrite: bool) -> Option<V> {
    let incoming = incoming.filter(|v| v.is_present());
    let existing_present = existing.as_ref().is_some_and(|v| v.is_present());

    match incoming {
        Some(value) if overwrite || !existing_present => Some(value),
        _ => existing,
    }
}

/// How incoming text is prepared and applied for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Whitespace-collapsed free text
    Text,
    /// Passed through the title normalizer
    Title,
    /// External key, rejected when malformed
    Identity,
    /// Stored untouched apart from trimming; parsed by the record accessors
    Raw,
    /// Tokens appended to a delimited list, never replaced
    Appended,
}

#[derive(Clone, Copy)]
enum Slot {
    Required(fn(&mut MovieRecord) -> &mut String),
    Optional(fn(&mut MovieRecord) -> &mut Option<String>),
}

/// One row of the dispatch table
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub policy: MergePolicy,
    slot: Slot,
}

macro_rules! optional {
    ($name:literal, $policy:ident, $field:ident) => {
        FieldRule {
            name: $name,
            policy: MergePolicy::$policy,
            slot: Slot::Optional(|m| &mut m.$field),
        }
    };
}

/// Canonical field names understood by the merge step
pub static FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        name: "title",
        policy: MergePolicy::Title,
        slot: Slot::Required(|m| &mut m.title),
    },
    optional!("original_title", Title, original_title),
    optional!("imdb_id", Identity, imdb_id),
    optional!("film_affinity_id", Identity, film_affinity_id),
    optional!("year", Text, year),
    optional!("released", Text, released),
    optional!("country", Text, country),
    optional!("genre", Appended, genre),
    optional!("rated", Text, rated),
    optional!("duration", Text, duration),
    optional!("rating", Raw, rating),
    optional!("metascore", Raw, metascore),
    optional!("imdb_rating", Raw, imdb_rating),
    optional!("imdb_votes", Raw, imdb_votes),
    optional!("director", Text, director),
    optional!("writer", Text, writer),
    optional!("actors", Text, actors),
    optional!("plot", Text, plot),
    optional!("description", Text, description),
    optional!("web_url", Raw, web_url),
    optional!("image_url", Raw, image_url),
    optional!("imdb_url", Raw, imdb_url),
    optional!("file_size", Raw, file_size),
];

pub fn field_rule(name: &str) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|r| r.name == name)
}

/// An external id is accepted when it is non-empty and carries no path separators
pub fn is_valid_external_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && !id.contains(['/', '\\'])
}

/// What a merge did to the record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Fields whose stored value changed
    pub changed: Vec<&'static str>,
    /// Identity values dropped as malformed
    pub rejected: Vec<String>,
    /// Keys with no rule
    pub ignored: Vec<String>,
}

impl MergeOutcome {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    fn mark_changed(&mut self, name: &'static str) {
        if !self.changed.contains(&name) {
            self.changed.push(name);
        }
    }
}

fn prepare(policy: MergePolicy, raw: &str) -> String {
    match policy {
        MergePolicy::Title => clean_text(&normalize_title(raw)),
        MergePolicy::Text | MergePolicy::Appended => clean_text(raw),
        MergePolicy::Identity | MergePolicy::Raw => raw.trim().to_string(),
    }
}

/// Merge every recognized entry of `fields` into `record`
pub fn merge_fields(record: &mut MovieRecord, fields: &FieldMap, overwrite: bool) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (key, raw) in fields.iter() {
        let Some(rule) = field_rule(key) else {
            debug!(field = %key, "Ignoring unrecognized field");
            outcome.ignored.push(key.to_string());
            continue;
        };

        let value = prepare(rule.policy, raw);

        if rule.policy == MergePolicy::Identity && !value.is_empty() && !is_valid_external_id(&value) {
            warn!(field = rule.name, value = %value, "Rejecting malformed external id");
            outcome.rejected.push(value);
            continue;
        }

        let changed = match rule.slot {
            Slot::Required(slot) => {
                let current = slot(record);
                let merged = merge_field(Some(current.clone()), Some(value), overwrite);
                match merged {
                    Some(merged) if merged != *current => {
                        *current = merged;
                        true
                    }
                    _ => false,
                }
            }
            Slot::Optional(slot) if rule.policy == MergePolicy::Appended => {
                append_token(slot(record), &value)
            }
            Slot::Optional(slot) => {
                let current = slot(record);
                let before = current.clone();
                *current = merge_field(current.take(), Some(value), overwrite);
                *current != before
            }
        };

        if changed {
            outcome.mark_changed(rule.name);
        }
    }

    outcome
}

/// Append a token to a delimited list, returning whether the list grew
fn append_token(list: &mut Option<String>, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    match list {
        Some(existing) if existing.is_present() => {
            existing.push(GENRE_DELIMITER);
            existing.push_str(token);
        }
        _ => *list = Some(token.to_string()),
    }
    true
}
