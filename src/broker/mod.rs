/*!
 * Durable job broker for planned (distributed) translation.
 *
 * Planned mode serializes one `TranslationJob` per document onto a
 * SQLite-backed queue; one or more independent worker processes later
 * claim, execute and acknowledge them. Delivery is at-least-once: a claim
 * takes a lease, an unacknowledged job whose lease lapses becomes
 * claimable again, and replays are safe because the per-document engine
 * skips already-committed work.
 *
 * - `connection`: thread-safe SQLite access with async wrappers
 * - `schema`: queue table DDL and versioning
 * - `queue`: enqueue / claim / ack / release operations
 * - `worker`: long-lived consumer pool running the shared engine
 */

pub mod connection;
pub mod queue;
pub mod schema;
pub mod worker;

pub use connection::BrokerConnection;
pub use queue::{DeliveredJob, JobQueue, QueueStats};
pub use worker::Worker;
