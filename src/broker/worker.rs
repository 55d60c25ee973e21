use std::time::Duration;

use log::{debug, error, info, warn};
use rand::Rng;

use crate::engine;
use crate::errors::{BrokerError, InterpreterError};
use crate::interpreters::{Interpreter, create_interpreter};
use crate::store::{DocumentStore, ElasticStore};

use super::queue::{DeliveredJob, JobQueue};

/// Distributed translation worker
///
/// A long-lived pool of consumer loops, independent of the dispatching
/// run and scaled on its own. Each claim fetches a fresh document
/// snapshot and runs the same per-document engine as immediate mode, so
/// broker redeliveries degenerate to skips on already-committed
/// documents.
/// Lease taken on claim; a worker that dies mid-job loses the lease and
/// the job becomes deliverable again
const CLAIM_LEASE: Duration = Duration::from_secs(45 * 60);

/// Idle poll interval when the queue is empty
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Timed-out jobs are redelivered this many times before being dropped
const MAX_TIMEOUT_DELIVERIES: i64 = 2;

/// Consumer pool over one queue
pub struct Worker {
    queue: JobQueue,
    concurrency: usize,
}

impl Worker {
    /// Connect a worker pool to the broker
    pub fn connect(broker_url: &str, concurrency: usize) -> Result<Self, BrokerError> {
        Ok(Self {
            queue: JobQueue::connect(broker_url)?,
            concurrency: concurrency.max(1),
        })
    }

    /// Build a worker over an existing queue (used by tests)
    pub fn with_queue(queue: JobQueue, concurrency: usize) -> Self {
        Self { queue, concurrency: concurrency.max(1) }
    }

    /// Consume jobs until the process is terminated
    pub async fn run_forever(&self) -> Result<(), BrokerError> {
        info!("Starting {} consumer loop(s)", self.concurrency);

        let mut handles = Vec::with_capacity(self.concurrency);
        for worker_id in 0..self.concurrency {
            let queue = self.queue.clone();
            handles.push(tokio::spawn(async move {
                consumer_loop(worker_id, queue).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Consume jobs until the queue is empty, then return the number of
    /// jobs processed. Used by tests and one-shot drains.
    pub async fn drain(&self) -> Result<usize, BrokerError> {
        let mut processed = 0;
        while let Some(delivered) = self.queue.claim(CLAIM_LEASE).await? {
            let config = &delivered.job.config;
            let store = ElasticStore::new(&config.url, &config.index);
            let interpreter = match create_interpreter(config) {
                Ok(interpreter) => interpreter,
                Err(e) => {
                    error!("Job {}: cannot build backend: {}", delivered.id, e);
                    self.queue.release(&delivered.id).await?;
                    break;
                }
            };
            handle_delivery(&self.queue, &store, interpreter.as_ref(), &delivered).await?;
            processed += 1;
        }
        Ok(processed)
    }
}

async fn consumer_loop(worker_id: usize, queue: JobQueue) {
    loop {
        let claimed = match queue.claim(CLAIM_LEASE).await {
            Ok(claimed) => claimed,
            Err(e) => {
                error!("Worker {}: claim failed: {}", worker_id, e);
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        let Some(delivered) = claimed else {
            // Jittered so idle workers don't poll in lockstep
            let jitter = rand::rng().random_range(0..500);
            tokio::time::sleep(POLL_INTERVAL + Duration::from_millis(jitter)).await;
            continue;
        };

        let config = &delivered.job.config;
        let store = ElasticStore::new(&config.url, &config.index);
        let interpreter = match create_interpreter(config) {
            Ok(interpreter) => interpreter,
            Err(e) => {
                error!("Worker {}: cannot build backend: {}", worker_id, e);
                let _ = queue.release(&delivered.id).await;
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        match handle_delivery(&queue, &store, interpreter.as_ref(), &delivered).await {
            Ok(true) => {}
            Ok(false) => {
                // Run-scoped condition; keep the worker alive but back off
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                error!("Worker {}: broker error: {}", worker_id, e);
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Execute one delivered job against the given store and interpreter.
///
/// Returns false when the job was released because of a run-scoped
/// condition (store unreachable, backend runtime missing) and the caller
/// should back off before claiming again.
pub async fn handle_delivery(
    queue: &JobQueue,
    store: &dyn DocumentStore,
    interpreter: &dyn Interpreter,
    delivered: &DeliveredJob,
) -> Result<bool, BrokerError> {
    let job = &delivered.job;
    let doc_id = job.document_id.as_str();
    debug!("Processing job {} for doc {}", delivered.id, doc_id);

    let result =
        tokio::time::timeout(job.config.job_timeout(), engine::process_job(store, interpreter, job))
            .await;

    match result {
        Ok(Ok(outcome)) => {
            if outcome.is_failure() {
                warn!("Doc {}: {:?}", doc_id, outcome);
            } else {
                info!("Doc {}: {}", doc_id, outcome.label());
            }
            queue.ack(&delivered.id).await?;
            Ok(true)
        }
        Ok(Err(e)) if e.is_fatal() => {
            error!("Doc {}: {}", doc_id, e);
            queue.release(&delivered.id).await?;
            Ok(false)
        }
        Ok(Err(e)) => {
            // Document-scoped (e.g. the document disappeared); drop it
            warn!("Doc {}: dropping job: {}", doc_id, e);
            queue.ack(&delivered.id).await?;
            Ok(true)
        }
        Err(_) => {
            let timeout = InterpreterError::Timeout(job.config.pool_timeout_secs);
            if delivered.attempts < MAX_TIMEOUT_DELIVERIES {
                warn!("Doc {}: {}, releasing for one retry", doc_id, timeout);
                queue.release(&delivered.id).await?;
            } else {
                warn!(
                    "Doc {}: {} on attempt {}, dropping",
                    doc_id, timeout, delivered.attempts
                );
                queue.ack(&delivered.id).await?;
            }
            Ok(true)
        }
    }
}
