use serde::{Deserialize, Serialize};

use crate::app_config::Config;
use crate::errors::{EngineError, InterpreterError, StoreError};
use crate::interpreters::Interpreter;
use crate::pair_resolver;
use crate::store::document::{Decision, decide, truncate_to_boundary, upsert_record};
use crate::store::{DocumentSnapshot, DocumentStore, TranslationRecord};

/// Per-document translation engine
///
/// One state machine, used by both execution topologies: the immediate
/// worker pool calls `process_snapshot` on documents it already scanned,
/// the distributed worker calls `process_job` which fetches a fresh
/// snapshot first. Replaying either path over an already-committed
/// document degenerates to a skip (unless force), which makes at-least-once
/// delivery safe.
/// An immutable, serializable unit of planned work: one document plus the
/// full configuration needed to translate it. Safe to replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    /// Identifier of the document to translate
    pub document_id: String,
    /// Routing value, when the index uses one
    pub routing: Option<String>,
    /// Full engine configuration (content itself stays out of the queue)
    pub config: Config,
}

impl TranslationJob {
    /// Build the job for one scanned document
    pub fn new(config: &Config, snapshot: &DocumentSnapshot) -> Self {
        Self {
            document_id: snapshot.id.clone(),
            routing: snapshot.routing.clone(),
            config: config.clone(),
        }
    }
}

/// Terminal state of one document's processing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// A record was committed; `replaced` when force overwrote an entry
    Committed {
        /// Whether an existing record for the tuple was replaced in place
        replaced: bool,
    },
    /// Dry-run: the record was computed and logged but not written
    WouldCommit,
    /// A record for the tuple already exists and force is off
    SkippedAlreadyTranslated,
    /// The source field is missing or empty
    SkippedEmptySource,
    /// No direct or two-hop path exists for the pair
    PairUnavailable(String),
    /// The backend failed or timed out on this document
    TranslationFailed(String),
    /// The translation succeeded but the store rejected the write
    WriteFailed(String),
}

impl DocumentOutcome {
    /// Whether this outcome produced (or would produce) a stored record
    pub fn is_translated(&self) -> bool {
        matches!(self, DocumentOutcome::Committed { .. } | DocumentOutcome::WouldCommit)
    }

    /// Whether this outcome counts as a per-document failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DocumentOutcome::PairUnavailable(_)
                | DocumentOutcome::TranslationFailed(_)
                | DocumentOutcome::WriteFailed(_)
        )
    }

    /// Failure outcome for a job that exceeded its per-document deadline
    pub fn timed_out(timeout_secs: u64) -> Self {
        DocumentOutcome::TranslationFailed(InterpreterError::Timeout(timeout_secs).to_string())
    }

    /// Short label for run summaries
    pub fn label(&self) -> &'static str {
        match self {
            DocumentOutcome::Committed { .. } => "committed",
            DocumentOutcome::WouldCommit => "would-commit",
            DocumentOutcome::SkippedAlreadyTranslated => "skipped-already-translated",
            DocumentOutcome::SkippedEmptySource => "skipped-empty-source",
            DocumentOutcome::PairUnavailable(_) => "pair-unavailable",
            DocumentOutcome::TranslationFailed(_) => "translation-failed",
            DocumentOutcome::WriteFailed(_) => "write-failed",
        }
    }
}

/// Run the full state machine over an already-fetched snapshot.
///
/// Document-scoped failures come back as outcomes; only run-scoped
/// conditions (store unreachable, backend runtime missing, invalid
/// configuration) surface as errors.
pub async fn process_snapshot(
    store: &dyn DocumentStore,
    interpreter: &dyn Interpreter,
    config: &Config,
    snapshot: &DocumentSnapshot,
) -> Result<DocumentOutcome, EngineError> {
    let pair = config.pair()?;
    let max_content_length = config.max_content_length_bytes()?;

    let decision = decide(
        snapshot,
        interpreter.label(),
        &pair,
        config.force,
        max_content_length,
    )?;
    let limit = match decision {
        Decision::SkipAlreadyTranslated => return Ok(DocumentOutcome::SkippedAlreadyTranslated),
        Decision::SkipEmptySource => return Ok(DocumentOutcome::SkippedEmptySource),
        Decision::TranslateTruncated(limit) => Some(limit),
        Decision::Translate => None,
    };

    // Availability is computed fresh per dispatch; backends may gain or
    // lose pairs between runs
    let route = match pair_resolver::resolve(
        interpreter,
        &pair,
        config.intermediary_language.as_deref(),
    )
    .await
    {
        Ok(route) => route,
        Err(EngineError::PairNotAvailable(p)) => return Ok(DocumentOutcome::PairUnavailable(p)),
        Err(e) => return Err(e),
    };

    let content = snapshot.source_content.as_deref().unwrap_or_default();
    let content = match limit {
        Some(limit) => truncate_to_boundary(content, limit),
        None => content,
    };

    let translated = match pair_resolver::translate_route(interpreter, &route, content).await {
        Ok(text) => text,
        Err(e @ InterpreterError::BackendUnavailable(_)) => return Err(e.into()),
        Err(e) => return Ok(DocumentOutcome::TranslationFailed(e.to_string())),
    };

    // The record names the end-to-end pair; an intermediary leg is not
    // separately recorded
    let record = TranslationRecord {
        backend: interpreter.label().to_string(),
        source_language: pair.source_name()?,
        target_language: pair.target_name()?,
        content: translated,
    };

    let mut records = snapshot.records.clone();
    let replaced = upsert_record(&mut records, record);

    if config.dry_run {
        return Ok(DocumentOutcome::WouldCommit);
    }

    match store.commit(snapshot, &config.target_field, &records).await {
        Ok(()) => Ok(DocumentOutcome::Committed { replaced }),
        Err(e @ StoreError::Connection(_)) => Err(e.into()),
        Err(e) => Ok(DocumentOutcome::WriteFailed(e.to_string())),
    }
}

/// Run the state machine for a queued job: fetch a fresh snapshot, then
/// process it. Used by distributed workers at consumption time.
pub async fn process_job(
    store: &dyn DocumentStore,
    interpreter: &dyn Interpreter,
    job: &TranslationJob,
) -> Result<DocumentOutcome, EngineError> {
    let snapshot = store
        .fetch(
            &job.document_id,
            job.routing.as_deref(),
            &job.config.source_field,
            &job.config.target_field,
        )
        .await?;

    process_snapshot(store, interpreter, &job.config, &snapshot).await
}
