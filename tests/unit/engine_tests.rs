/*!
 * Tests for the per-document translation engine
 */

use estrans::engine::{self, DocumentOutcome, TranslationJob};
use estrans::errors::EngineError;
use estrans::interpreters::mock::Mock;
use estrans::store::{DocumentStore, MemoryStore};

use crate::common::{record, test_config};

/// Test the happy path: translate and commit one document
#[tokio::test]
async fn test_process_snapshot_withFreshDocument_shouldCommitRecord() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour");
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert_eq!(outcome, DocumentOutcome::Committed { replaced: false });
    let records = store.records("doc-1");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].backend, "MOCK");
    assert_eq!(records[0].source_language, "FRENCH");
    assert_eq!(records[0].target_language, "ENGLISH");
    assert_eq!(records[0].content, "[fra-eng] bonjour");
}

/// Test that an existing record for the same tuple short-circuits the
/// backend entirely
#[tokio::test]
async fn test_process_snapshot_withExistingRecord_shouldSkipWithoutTranslating() {
    let store = MemoryStore::new();
    store.insert_with_records(
        "doc-1",
        "bonjour",
        vec![record("MOCK", "FRENCH", "ENGLISH", "hello")],
    );
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert_eq!(outcome, DocumentOutcome::SkippedAlreadyTranslated);
    assert_eq!(interpreter.translate_calls(), 0);
    assert_eq!(store.write_count(), 0);
}

/// Test that a record from another backend or pair does not block translation
#[tokio::test]
async fn test_process_snapshot_withForeignRecord_shouldStillTranslate() {
    let store = MemoryStore::new();
    store.insert_with_records(
        "doc-1",
        "bonjour",
        vec![record("APERTIUM", "FRENCH", "ENGLISH", "hello")],
    );
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert_eq!(outcome, DocumentOutcome::Committed { replaced: false });
    // Both records coexist on the document
    assert_eq!(store.records("doc-1").len(), 2);
}

/// Test force mode replacing the existing record in place
#[tokio::test]
async fn test_process_snapshot_withForce_shouldReplaceExistingRecord() {
    let store = MemoryStore::new();
    store.insert_with_records(
        "doc-1",
        "bonjour",
        vec![record("MOCK", "FRENCH", "ENGLISH", "stale translation")],
    );
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.force = true;

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert_eq!(outcome, DocumentOutcome::Committed { replaced: true });
    let records = store.records("doc-1");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "[fra-eng] bonjour");
}

/// Test that an empty or absent source field is skipped, not failed
#[tokio::test]
async fn test_process_snapshot_withEmptySource_shouldSkip() {
    let store = MemoryStore::new();
    store.insert("doc-1", "   ");
    store.insert_empty("doc-2");
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    for id in ["doc-1", "doc-2"] {
        let snapshot = store.fetch(id, None, "content", "content_translated").await.unwrap();
        let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
            .await
            .unwrap();
        assert_eq!(outcome, DocumentOutcome::SkippedEmptySource);
    }
    assert_eq!(store.write_count(), 0);
}

/// Test dry-run: full computation, zero writes
#[tokio::test]
async fn test_process_snapshot_withDryRun_shouldNotWrite() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour");
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.dry_run = true;

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert_eq!(outcome, DocumentOutcome::WouldCommit);
    assert_eq!(interpreter.translate_calls(), 1);
    assert_eq!(store.write_count(), 0);
    assert!(store.records("doc-1").is_empty());
}

/// Test that a pair with no direct or two-hop route is a per-document
/// outcome, not an error
#[tokio::test]
async fn test_process_snapshot_withUnroutablePair_shouldReportPairUnavailable() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour");
    let interpreter = Mock::with_pairs(&[("de", "en")]);
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert!(matches!(outcome, DocumentOutcome::PairUnavailable(_)));
}

/// Test that a backend failure on one document does not abort the run
#[tokio::test]
async fn test_process_snapshot_withBackendFailure_shouldReportTranslationFailed() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour");
    let interpreter = Mock::with_pairs(&[("fr", "en")]).failing("model exploded");
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert!(matches!(outcome, DocumentOutcome::TranslationFailed(_)));
    assert_eq!(store.write_count(), 0);
}

/// Test that a rejected write surfaces as a per-document outcome
#[tokio::test]
async fn test_process_snapshot_withRejectedWrite_shouldReportWriteFailed() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour");
    store.fail_writes(true);
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert!(matches!(outcome, DocumentOutcome::WriteFailed(_)));
}

/// Test content truncation to the configured byte budget
#[tokio::test]
async fn test_process_snapshot_withOversizedContent_shouldTruncateBeforeTranslating() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour le monde");
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let mut config = test_config("fr", "en");
    config.max_content_length = "4".to_string();

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let outcome = engine::process_snapshot(&store, &interpreter, &config, &snapshot)
        .await
        .unwrap();

    assert_eq!(outcome, DocumentOutcome::Committed { replaced: false });
    assert_eq!(store.records("doc-1")[0].content, "[fra-eng] bonj");
}

/// Test that a queued job re-reads the document at consumption time
#[tokio::test]
async fn test_process_job_withChangedDocument_shouldUseFreshSnapshot() {
    let store = MemoryStore::new();
    store.insert("doc-1", "bonjour");
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    let snapshot = store.fetch("doc-1", None, "content", "content_translated").await.unwrap();
    let job = TranslationJob::new(&config, &snapshot);

    // The document changes between planning and consumption
    store.insert("doc-1", "salut");

    let outcome = engine::process_job(&store, &interpreter, &job).await.unwrap();
    assert_eq!(outcome, DocumentOutcome::Committed { replaced: false });
    assert_eq!(store.records("doc-1")[0].content, "[fra-eng] salut");
}

/// Test that a vanished document surfaces as a non-fatal store error
#[tokio::test]
async fn test_process_job_withMissingDocument_shouldReturnNonFatalError() {
    let store = MemoryStore::new();
    let interpreter = Mock::with_pairs(&[("fr", "en")]);
    let config = test_config("fr", "en");

    let job = TranslationJob {
        document_id: "ghost".to_string(),
        routing: None,
        config,
    };

    let err = engine::process_job(&store, &interpreter, &job).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(!err.is_fatal());
}

/// Test that a timed-out job reads as a typed translation failure
#[test]
fn test_timed_out_shouldBuildTypedTimeoutFailure() {
    let outcome = DocumentOutcome::timed_out(30);

    assert!(outcome.is_failure());
    assert_eq!(outcome.label(), "translation-failed");
    assert_eq!(
        outcome,
        DocumentOutcome::TranslationFailed("Translation timed out after 30s".to_string())
    );
}
