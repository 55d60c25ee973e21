/*!
 * In-memory document store for testing.
 *
 * Implements the full `DocumentStore` surface over a shared map, with
 * write counting and write-failure injection so tests can assert dry-run
 * behavior and per-document error handling.
 */

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::StoreError;

use super::{DocumentSnapshot, DocumentStore, ScanCursor, ScanParams, TranslationRecord};

#[derive(Debug, Default, Clone)]
struct StoredDocument {
    source_content: Option<String>,
    records: Vec<TranslationRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, StoredDocument>,
    write_count: usize,
    fail_writes: bool,
}

/// Shared in-memory store; clones see the same documents
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document with source content only
    pub fn insert(&self, id: &str, content: &str) {
        self.inner.lock().documents.insert(
            id.to_string(),
            StoredDocument { source_content: Some(content.to_string()), records: Vec::new() },
        );
    }

    /// Insert a document that already carries translation records
    pub fn insert_with_records(&self, id: &str, content: &str, records: Vec<TranslationRecord>) {
        self.inner.lock().documents.insert(
            id.to_string(),
            StoredDocument { source_content: Some(content.to_string()), records },
        );
    }

    /// Insert a document without a source field
    pub fn insert_empty(&self, id: &str) {
        self.inner.lock().documents.insert(id.to_string(), StoredDocument::default());
    }

    /// Records currently stored for a document
    pub fn records(&self, id: &str) -> Vec<TranslationRecord> {
        self.inner
            .lock()
            .documents
            .get(id)
            .map(|d| d.records.clone())
            .unwrap_or_default()
    }

    /// Number of commits performed against this store
    pub fn write_count(&self) -> usize {
        self.inner.lock().write_count
    }

    /// Make every subsequent commit fail
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    fn matching_snapshots(&self, params: &ScanParams) -> Vec<DocumentSnapshot> {
        let inner = self.inner.lock();
        inner
            .documents
            .iter()
            .filter(|(_, doc)| match &params.query_string {
                Some(query) => doc
                    .source_content
                    .as_deref()
                    .is_some_and(|content| content.contains(query.as_str())),
                None => true,
            })
            .map(|(id, doc)| {
                if params.ids_only {
                    DocumentSnapshot { id: id.clone(), ..Default::default() }
                } else {
                    DocumentSnapshot {
                        id: id.clone(),
                        routing: None,
                        source_content: doc.source_content.clone(),
                        records: doc.records.clone(),
                    }
                }
            })
            .collect()
    }
}

struct MemoryScanCursor {
    pages: VecDeque<Vec<DocumentSnapshot>>,
}

#[async_trait]
impl ScanCursor for MemoryScanCursor {
    async fn next_page(&mut self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        Ok(self.pages.pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, query_string: Option<&str>) -> Result<u64, StoreError> {
        let params = ScanParams {
            query_string: query_string.map(str::to_string),
            page_size: 1,
            scroll: "5m".to_string(),
            lease: std::time::Duration::from_secs(300),
            source_field: String::new(),
            target_field: String::new(),
            ids_only: true,
        };
        Ok(self.matching_snapshots(&params).len() as u64)
    }

    async fn start_scan(&self, params: &ScanParams) -> Result<Box<dyn ScanCursor>, StoreError> {
        let snapshots = self.matching_snapshots(params);
        let pages = snapshots
            .chunks(params.page_size.max(1))
            .map(<[DocumentSnapshot]>::to_vec)
            .collect();
        Ok(Box::new(MemoryScanCursor { pages }))
    }

    async fn fetch(
        &self,
        id: &str,
        _routing: Option<&str>,
        _source_field: &str,
        _target_field: &str,
    ) -> Result<DocumentSnapshot, StoreError> {
        let inner = self.inner.lock();
        let doc = inner
            .documents
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(DocumentSnapshot {
            id: id.to_string(),
            routing: None,
            source_content: doc.source_content.clone(),
            records: doc.records.clone(),
        })
    }

    async fn commit(
        &self,
        snapshot: &DocumentSnapshot,
        _target_field: &str,
        records: &[TranslationRecord],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StoreError::Write {
                id: snapshot.id.clone(),
                reason: "write failure injected".to_string(),
            });
        }
        let doc = inner
            .documents
            .get_mut(&snapshot.id)
            .ok_or_else(|| StoreError::NotFound(snapshot.id.clone()))?;
        doc.records = records.to_vec();
        inner.write_count += 1;
        Ok(())
    }
}
