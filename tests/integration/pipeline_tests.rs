/*!
 * End-to-end tests for immediate and planned translation runs
 */

use estrans::app_controller::Controller;
use estrans::broker::JobQueue;
use estrans::errors::{EngineError, StoreError};
use estrans::interpreters::mock::Mock;
use estrans::store::MemoryStore;

use crate::common::{ExpiringStore, seed_french_store, test_config};

/// Test that a run translates exactly the documents missing a record for
/// the (backend, source, target) tuple
#[tokio::test]
async fn test_run_immediate_withPartiallyTranslatedIndex_shouldTranslateOnlyMissing() {
    let store = seed_french_store();
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let controller = Controller::new(test_config("fr", "en")).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.translated, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.write_count(), 2);
    assert_eq!(store.records("doc-1")[0].content, "[fra-eng] bonjour tout le monde");
    // The pre-existing record is untouched
    assert_eq!(store.records("doc-3")[0].content, "good night");
}

/// Test that a second identical run is a no-op
#[tokio::test]
async fn test_run_immediate_withAlreadyTranslatedIndex_shouldBeIdempotent() {
    let store = seed_french_store();
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let controller = Controller::new(test_config("fr", "en")).unwrap();

    controller.run_immediate(&store, &interpreter).await.unwrap();
    let second = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(second.translated, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(store.write_count(), 2);
}

/// Test that force replaces records in place instead of appending
#[tokio::test]
async fn test_run_immediate_withForce_shouldReplaceRecordsInPlace() {
    let store = seed_french_store();
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.force = true;
    let controller = Controller::new(config).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.translated, 3);
    assert_eq!(summary.replaced, 1);
    for id in ["doc-1", "doc-2", "doc-3"] {
        let records = store.records(id);
        assert_eq!(records.len(), 1, "doc {} should hold exactly one record", id);
        assert!(records[0].content.starts_with("[fra-eng] "));
    }
}

/// Test a pair the backend lacks directly but can reach through an
/// intermediary language
#[tokio::test]
async fn test_run_immediate_withTwoHopRoute_shouldStoreEndToEndPair() {
    let store = MemoryStore::new();
    store.insert("doc-1", "ola");
    let interpreter = Mock::with_pairs(&[("pt", "es"), ("es", "en")]);
    let controller = Controller::new(test_config("pt", "en")).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.translated, 1);
    let records = store.records("doc-1");
    assert_eq!(records[0].source_language, "PORTUGUESE");
    assert_eq!(records[0].target_language, "ENGLISH");
    assert_eq!(records[0].content, "[spa-eng] [por-spa] ola");
}

/// Test dry-run end to end: outcomes computed, nothing written
#[tokio::test]
async fn test_run_immediate_withDryRun_shouldWriteNothing() {
    let store = seed_french_store();
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.dry_run = true;
    let controller = Controller::new(config).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.translated, 2);
    assert_eq!(store.write_count(), 0);
    assert!(store.records("doc-1").is_empty());
}

/// Test that a query string narrows the run to matching documents
#[tokio::test]
async fn test_run_immediate_withQueryString_shouldFilterDocuments() {
    let store = seed_french_store();
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.query_string = Some("bonjour".to_string());
    let controller = Controller::new(config).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.translated, 1);
    assert!(store.records("doc-2").is_empty());
}

/// Test that per-document failures are counted without stopping the run
#[tokio::test]
async fn test_run_immediate_withUnroutablePair_shouldCountFailuresAndContinue() {
    let store = seed_french_store();
    let interpreter = Mock::with_pairs(&[("de", "en")]);
    let controller = Controller::new(test_config("fr", "en")).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.translated, 0);
    // doc-3 already has its record and still counts as a skip
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(store.write_count(), 0);
}

/// Test a pool larger than the page size
#[tokio::test]
async fn test_run_immediate_withConcurrentPool_shouldTranslateEverything() {
    let store = MemoryStore::new();
    for i in 0..10 {
        store.insert(&format!("doc-{}", i), "bonjour");
    }
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.pool_size = 4;
    config.scan_page_size = 3;
    let controller = Controller::new(config).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.scanned, 10);
    assert_eq!(summary.translated, 10);
    assert_eq!(store.write_count(), 10);
}

/// Test planned mode: one queued job per matching document, no writes
#[tokio::test]
async fn test_run_planned_shouldEnqueueOneJobPerDocument() {
    let store = seed_french_store();
    let queue = JobQueue::connect(":memory:").unwrap();
    let mut config = test_config("fr", "en");
    config.plan = true;
    let controller = Controller::new(config).unwrap();

    let summary = controller.run_planned(&store, &queue).await.unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.planned, 3);
    assert_eq!(queue.pending().await.unwrap(), 3);
    // Planning never touches the documents
    assert_eq!(store.write_count(), 0);
}

/// Test that a document exceeding the pool timeout is counted as failed
/// and writes nothing, while already-translated documents still skip
#[tokio::test]
async fn test_run_immediate_withSlowBackend_shouldTimeOutWithoutWrites() {
    let store = seed_french_store();
    let interpreter =
        Mock::with_pairs(&[("fr", "en")]).with_delay(std::time::Duration::from_secs(5));
    let mut config = test_config("fr", "en");
    config.pool_timeout_secs = 0;
    let controller = Controller::new(config).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.translated, 0);
    assert_eq!(store.write_count(), 0);
}

/// Test that one lapsed cursor restarts the scan from the top, with the
/// already-committed documents degenerating to skips
#[tokio::test]
async fn test_run_immediate_withLapsedCursor_shouldRestartScanOnce() {
    let store = ExpiringStore::new(seed_french_store(), 1);
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let controller = Controller::new(test_config("fr", "en")).unwrap();

    let summary = controller.run_immediate(&store, &interpreter).await.unwrap();

    // First scan committed its first page before lapsing, so the rerun
    // sees every document as already translated
    assert_eq!(store.scans(), 2);
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.inner().write_count(), 2);
    assert_eq!(
        store.inner().records("doc-1")[0].content,
        "[fra-eng] bonjour tout le monde"
    );
}

/// Test that a cursor lapsing again after the restart aborts the run
#[tokio::test]
async fn test_run_immediate_withRepeatedlyLapsedCursor_shouldAbort() {
    let store = ExpiringStore::new(seed_french_store(), 2);
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let controller = Controller::new(test_config("fr", "en")).unwrap();

    let error = controller.run_immediate(&store, &interpreter).await.unwrap_err();

    assert!(matches!(
        error,
        EngineError::Store(StoreError::CursorExpired(_))
    ));
    assert_eq!(store.scans(), 2);
}
