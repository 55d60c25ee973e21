use std::time::Duration;

use log::debug;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::engine::TranslationJob;
use crate::errors::BrokerError;

use super::connection::BrokerConnection;

/// Durable queue of serialized translation jobs
///
/// A claim takes a lease: the job stays in the table, invisible to other
/// consumers until the lease lapses. Acknowledging deletes it; releasing
/// (or a lapsed lease) makes it deliverable again with an incremented
/// attempt count. That is at-least-once delivery — consumers must
/// tolerate replays, which the per-document engine does by design.
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Queue database connection
    db: BrokerConnection,
}

/// Point-in-time queue occupancy, split by lease state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs on the queue, leased or not
    pub total: u64,
    /// Jobs currently held under an unexpired lease
    pub leased: u64,
}

impl QueueStats {
    /// Jobs a consumer could claim right now
    pub fn deliverable(&self) -> u64 {
        self.total - self.leased
    }
}

/// A claimed job together with its delivery metadata
#[derive(Debug, Clone)]
pub struct DeliveredJob {
    /// Queue-side identifier, used to ack or release
    pub id: String,
    /// How many times this job has been delivered, this claim included
    pub attempts: i64,
    /// The deserialized job
    pub job: TranslationJob,
}

impl JobQueue {
    /// Open a queue at the given broker URL (a SQLite database path)
    pub fn connect(broker_url: &str) -> Result<Self, BrokerError> {
        let path = broker_url.trim_start_matches("sqlite://");
        let db = if path == ":memory:" {
            BrokerConnection::new_in_memory()?
        } else {
            BrokerConnection::new(path)?
        };
        Ok(Self { db })
    }

    /// Build a queue over an existing connection (used by tests)
    pub fn with_connection(db: BrokerConnection) -> Self {
        Self { db }
    }

    /// Serialize a job onto the queue; returns the queue-side id
    pub async fn enqueue(&self, job: &TranslationJob) -> Result<String, BrokerError> {
        let payload = serde_json::to_string(job)
            .map_err(|e| BrokerError::InvalidPayload(e.to_string()))?;
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let insert_id = id.clone();
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO jobs (id, payload, attempts, leased_until, created_at)
                     VALUES (?1, ?2, 0, NULL, ?3)",
                    params![insert_id, payload, created_at],
                )?;
                Ok(())
            })
            .await?;

        debug!("Enqueued job {}", id);
        Ok(id)
    }

    /// Claim the oldest deliverable job, leasing it for `lease`.
    ///
    /// Returns `None` when nothing is currently deliverable.
    pub async fn claim(&self, lease: Duration) -> Result<Option<DeliveredJob>, BrokerError> {
        let now = chrono::Utc::now().timestamp();
        let leased_until = now + lease.as_secs() as i64;

        let row = self
            .db
            .execute_async(move |conn| {
                let tx = conn.transaction()?;
                let row = tx
                    .query_row(
                        "SELECT id, payload, attempts FROM jobs
                         WHERE leased_until IS NULL OR leased_until <= ?1
                         ORDER BY created_at, id LIMIT 1",
                        params![now],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, i64>(2)?,
                            ))
                        },
                    )
                    .optional()?;

                let claimed = match row {
                    Some((id, payload, attempts)) => {
                        tx.execute(
                            "UPDATE jobs SET leased_until = ?1, attempts = attempts + 1
                             WHERE id = ?2",
                            params![leased_until, id],
                        )?;
                        Some((id, payload, attempts + 1))
                    }
                    None => None,
                };
                tx.commit()?;
                Ok(claimed)
            })
            .await?;

        let Some((id, payload, attempts)) = row else {
            return Ok(None);
        };

        let job: TranslationJob = serde_json::from_str(&payload)
            .map_err(|e| BrokerError::InvalidPayload(format!("job {}: {}", id, e)))?;

        debug!("Claimed job {} (attempt {})", id, attempts);
        Ok(Some(DeliveredJob { id, attempts, job }))
    }

    /// Acknowledge a job: it is done (or is being dropped deliberately)
    pub async fn ack(&self, id: &str) -> Result<(), BrokerError> {
        let id = id.to_string();
        self.db
            .execute_async(move |conn| {
                conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
    }

    /// Release a claimed job for immediate redelivery
    pub async fn release(&self, id: &str) -> Result<(), BrokerError> {
        let id = id.to_string();
        self.db
            .execute_async(move |conn| {
                conn.execute("UPDATE jobs SET leased_until = NULL WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
    }

    /// Number of jobs currently on the queue (leased or not)
    pub async fn pending(&self) -> Result<u64, BrokerError> {
        self.db
            .execute_async(|conn| {
                conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get::<_, i64>(0))
            })
            .await
            .map(|n| n as u64)
    }

    /// Snapshot of the queue occupancy, for monitoring
    pub async fn stats(&self) -> Result<QueueStats, BrokerError> {
        let now = chrono::Utc::now().timestamp();
        let (total, leased) = self
            .db
            .execute_async(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*),
                            COALESCE(SUM(CASE WHEN leased_until > ?1 THEN 1 ELSE 0 END), 0)
                     FROM jobs",
                    params![now],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
            })
            .await?;
        Ok(QueueStats { total: total as u64, leased: leased as u64 })
    }
}
