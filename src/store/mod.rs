/*!
 * Document store access.
 *
 * This module contains the narrow store surface the engine needs — paged
 * scan, fresh single-document fetch, partial field update — behind the
 * `DocumentStore` trait, plus the document-side data model and decision
 * logic:
 * - `document`: snapshots, translation records, (re)translation decisions
 * - `elastic`: Elasticsearch implementation over HTTP
 * - `memory`: in-memory implementation for tests
 */

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;

pub mod document;
pub mod elastic;
pub mod memory;

pub use document::{Decision, DocumentSnapshot, TranslationRecord};
pub use elastic::ElasticStore;
pub use memory::MemoryStore;

/// Parameters for a paged scan over matching documents
#[derive(Debug, Clone)]
pub struct ScanParams {
    /// Optional query string predicate
    pub query_string: Option<String>,
    /// Documents per page
    pub page_size: usize,
    /// Cursor lease literal understood by the store (e.g. "5m")
    pub scroll: String,
    /// The same lease as a duration, for local expiry tracking
    pub lease: Duration,
    /// Field holding the source text
    pub source_field: String,
    /// Field holding the translation records
    pub target_field: String,
    /// Fetch identifiers only (planned mode keeps payloads small)
    pub ids_only: bool,
}

/// A paged cursor over scan results.
///
/// An empty page signals the end of the sequence. The cursor is valid only
/// for its lease; expiry surfaces as `StoreError::CursorExpired`, and the
/// caller restarts the scan from the top (each document's outcome is
/// idempotent, so re-scanning is safe).
#[async_trait]
pub trait ScanCursor: Send {
    /// Fetch the next page of documents
    async fn next_page(&mut self) -> Result<Vec<DocumentSnapshot>, StoreError>;
}

/// The store operations the engine depends on
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Count documents matching the predicate
    async fn count(&self, query_string: Option<&str>) -> Result<u64, StoreError>;

    /// Open a paged scan over matching documents
    async fn start_scan(&self, params: &ScanParams) -> Result<Box<dyn ScanCursor>, StoreError>;

    /// Read a fresh snapshot of a single document
    async fn fetch(
        &self,
        id: &str,
        routing: Option<&str>,
        source_field: &str,
        target_field: &str,
    ) -> Result<DocumentSnapshot, StoreError>;

    /// Commit the full record list for the target field of one document.
    ///
    /// This is a partial update: no other field of the document is
    /// touched.
    async fn commit(
        &self,
        snapshot: &DocumentSnapshot,
        target_field: &str,
        records: &[TranslationRecord],
    ) -> Result<(), StoreError>;
}

impl ScanParams {
    /// Build scan parameters from the engine configuration
    pub fn from_config(
        config: &crate::app_config::Config,
        ids_only: bool,
    ) -> Result<Self, crate::errors::EngineError> {
        Ok(Self {
            query_string: config.query_string.clone(),
            page_size: config.scan_page_size,
            scroll: config.scan_scroll.clone(),
            lease: config.scan_lease()?,
            source_field: config.source_field.clone(),
            target_field: config.target_field.clone(),
            ids_only,
        })
    }
}
