/*!
 * Tests for the SQLite-backed job queue
 */

use std::time::Duration;

use estrans::broker::JobQueue;
use estrans::engine::TranslationJob;

use crate::common::test_config;

fn job(document_id: &str) -> TranslationJob {
    TranslationJob {
        document_id: document_id.to_string(),
        routing: None,
        config: test_config("fr", "en"),
    }
}

/// Test that a queued job round-trips its full payload
#[tokio::test]
async fn test_enqueue_withJob_shouldRoundTripPayload() {
    let queue = JobQueue::connect(":memory:").unwrap();
    queue.enqueue(&job("doc-1")).await.unwrap();

    let delivered = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(delivered.job.document_id, "doc-1");
    assert_eq!(delivered.job.config.source_language, "fr");
    assert_eq!(delivered.attempts, 1);
}

/// Test FIFO delivery order for deliverable jobs
#[tokio::test]
async fn test_claim_withMultipleJobs_shouldDeliverOldestFirst() {
    let queue = JobQueue::connect(":memory:").unwrap();
    for id in ["doc-1", "doc-2", "doc-3"] {
        queue.enqueue(&job(id)).await.unwrap();
    }
    assert_eq!(queue.pending().await.unwrap(), 3);

    let first = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    let second = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(first.job.document_id, "doc-1");
    assert_eq!(second.job.document_id, "doc-2");
}

/// Test that a leased job is invisible to other claims until acked
#[tokio::test]
async fn test_claim_withActiveLease_shouldHideJob() {
    let queue = JobQueue::connect(":memory:").unwrap();
    queue.enqueue(&job("doc-1")).await.unwrap();

    let delivered = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    assert!(queue.claim(Duration::from_secs(60)).await.unwrap().is_none());

    queue.ack(&delivered.id).await.unwrap();
    assert_eq!(queue.pending().await.unwrap(), 0);
}

/// Test that a lapsed lease makes the job deliverable again with an
/// incremented attempt count
#[tokio::test]
async fn test_claim_withLapsedLease_shouldRedeliver() {
    let queue = JobQueue::connect(":memory:").unwrap();
    queue.enqueue(&job("doc-1")).await.unwrap();

    let first = queue.claim(Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(first.attempts, 1);

    // Zero-length lease lapses immediately
    let second = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.attempts, 2);
}

/// Test explicit release for immediate redelivery
#[tokio::test]
async fn test_release_withLeasedJob_shouldMakeItDeliverable() {
    let queue = JobQueue::connect(":memory:").unwrap();
    queue.enqueue(&job("doc-1")).await.unwrap();

    let delivered = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    queue.release(&delivered.id).await.unwrap();

    let redelivered = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(redelivered.id, delivered.id);
    assert_eq!(redelivered.attempts, 2);
}

/// Test claiming from an empty queue
#[tokio::test]
async fn test_claim_withEmptyQueue_shouldReturnNone() {
    let queue = JobQueue::connect(":memory:").unwrap();
    assert!(queue.claim(Duration::from_secs(60)).await.unwrap().is_none());
    assert_eq!(queue.pending().await.unwrap(), 0);
}

/// Test that queue stats split occupancy by lease state
#[tokio::test]
async fn test_stats_shouldSplitTotalIntoLeasedAndDeliverable() {
    let queue = JobQueue::connect(":memory:").unwrap();
    for id in ["doc-1", "doc-2", "doc-3"] {
        queue.enqueue(&job(id)).await.unwrap();
    }

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.leased, 0);
    assert_eq!(stats.deliverable(), 3);

    let delivered = queue.claim(Duration::from_secs(60)).await.unwrap().unwrap();
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.leased, 1);
    assert_eq!(stats.deliverable(), 2);

    queue.ack(&delivered.id).await.unwrap();
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.leased, 0);
}
