/*!
 * Common test utilities for the estrans test suite
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use estrans::app_config::{Backend, Config};
use estrans::errors::StoreError;
use estrans::store::{
    DocumentSnapshot, DocumentStore, MemoryStore, ScanCursor, ScanParams, TranslationRecord,
};

/// Build a configuration wired for in-process testing: mock backend,
/// small pages, short per-job timeout.
pub fn test_config(source: &str, target: &str) -> Config {
    Config {
        backend: Backend::Mock,
        source_language: source.to_string(),
        target_language: target.to_string(),
        scan_page_size: 2,
        pool_timeout_secs: 5,
        ..Config::default()
    }
}

/// Build a translation record the way the engine stores them
pub fn record(backend: &str, source: &str, target: &str, content: &str) -> TranslationRecord {
    TranslationRecord {
        backend: backend.to_string(),
        source_language: source.to_string(),
        target_language: target.to_string(),
        content: content.to_string(),
    }
}

/// A store holding three French documents, one of which already carries
/// a mock-backend French-to-English record.
pub fn seed_french_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour tout le monde");
    store.insert("doc-2", "au revoir");
    store.insert_with_records(
        "doc-3",
        "bonne nuit",
        vec![record("MOCK", "FRENCH", "ENGLISH", "good night")],
    );
    store
}

/// A store whose scan cursor lapses mid-scan a fixed number of times.
///
/// Each affected cursor serves its first page, then fails the next fetch
/// with `CursorExpired` while the failure budget lasts. `scans` counts
/// how many times a scan was (re)opened.
pub struct ExpiringStore {
    inner: MemoryStore,
    failures: Arc<AtomicUsize>,
    scans: Arc<AtomicUsize>,
}

impl ExpiringStore {
    pub fn new(inner: MemoryStore, failures: usize) -> Self {
        Self {
            inner,
            failures: Arc::new(AtomicUsize::new(failures)),
            scans: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

struct ExpiringCursor {
    inner: Box<dyn ScanCursor>,
    failures: Arc<AtomicUsize>,
    pages: usize,
}

#[async_trait]
impl ScanCursor for ExpiringCursor {
    async fn next_page(&mut self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        if self.pages > 0 && self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::CursorExpired(300));
        }
        self.pages += 1;
        self.inner.next_page().await
    }
}

#[async_trait]
impl DocumentStore for ExpiringStore {
    async fn count(&self, query_string: Option<&str>) -> Result<u64, StoreError> {
        self.inner.count(query_string).await
    }

    async fn start_scan(&self, params: &ScanParams) -> Result<Box<dyn ScanCursor>, StoreError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.start_scan(params).await?;
        Ok(Box::new(ExpiringCursor {
            inner,
            failures: Arc::clone(&self.failures),
            pages: 0,
        }))
    }

    async fn fetch(
        &self,
        id: &str,
        routing: Option<&str>,
        source_field: &str,
        target_field: &str,
    ) -> Result<DocumentSnapshot, StoreError> {
        self.inner.fetch(id, routing, source_field, target_field).await
    }

    async fn commit(
        &self,
        snapshot: &DocumentSnapshot,
        target_field: &str,
        records: &[TranslationRecord],
    ) -> Result<(), StoreError> {
        self.inner.commit(snapshot, target_field, records).await
    }
}
