use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::language_utils::LanguagePair;

/// Document-side data model and per-document decision logic
///
/// A document carries an append-only list of translation records in its
/// target field; the engine appends or (under force) replaces its own
/// entry and never disturbs records written for other tuples.
/// One entry in a document's translation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Stable backend identifier (e.g. "ARGOS")
    pub backend: String,
    /// Uppercase English source language name (e.g. "FRENCH")
    pub source_language: String,
    /// Uppercase English target language name (e.g. "ENGLISH")
    pub target_language: String,
    /// Translated content
    pub content: String,
}

impl TranslationRecord {
    /// Whether this record belongs to the given (backend, source, target)
    /// tuple
    pub fn matches_tuple(&self, backend: &str, source_name: &str, target_name: &str) -> bool {
        self.backend == backend
            && self.source_language == source_name
            && self.target_language == target_name
    }
}

/// The subset of a document the engine cares about.
///
/// Read once from the store per processing attempt; never cached across
/// documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentSnapshot {
    /// Document identifier
    pub id: String,
    /// Routing value, when the index uses one
    pub routing: Option<String>,
    /// Source field content; `None` when the field is missing
    pub source_content: Option<String>,
    /// Existing translation records in the target field
    pub records: Vec<TranslationRecord>,
}

impl DocumentSnapshot {
    /// Whether a record already exists for the exact tuple
    pub fn has_record(&self, backend: &str, source_name: &str, target_name: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.matches_tuple(backend, source_name, target_name))
    }
}

/// Insert a record into a record list: replaces in place when an entry for
/// the same (backend, source, target) tuple exists, appends otherwise.
/// Returns true when an existing record was replaced.
pub fn upsert_record(records: &mut Vec<TranslationRecord>, record: TranslationRecord) -> bool {
    let existing = records.iter_mut().find(|r| {
        r.matches_tuple(&record.backend, &record.source_language, &record.target_language)
    });
    match existing {
        Some(slot) => {
            *slot = record;
            true
        }
        None => {
            records.push(record);
            false
        }
    }
}

/// Per-document decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Translate the whole source field
    Translate,
    /// Translate only the first N bytes of the source field
    TranslateTruncated(usize),
    /// A record for the tuple already exists and force is off
    SkipAlreadyTranslated,
    /// The source field is missing or empty
    SkipEmptySource,
}

/// Decide what to do with a document for a given job
pub fn decide(
    snapshot: &DocumentSnapshot,
    backend: &str,
    pair: &LanguagePair,
    force: bool,
    max_content_length: u64,
) -> Result<Decision, EngineError> {
    let content = match &snapshot.source_content {
        Some(content) if !content.trim().is_empty() => content,
        _ => return Ok(Decision::SkipEmptySource),
    };

    if !force && snapshot.has_record(backend, &pair.source_name()?, &pair.target_name()?) {
        return Ok(Decision::SkipAlreadyTranslated);
    }

    if (content.len() as u64) > max_content_length {
        return Ok(Decision::TranslateTruncated(max_content_length as usize));
    }

    Ok(Decision::Translate)
}

/// Cut text back to at most `limit` bytes without splitting a UTF-8
/// character
pub fn truncate_to_boundary(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
