/*!
 * Broker database connection management.
 *
 * This module handles SQLite connection creation and initialization, and
 * provides async-safe access patterns using tokio's spawn_blocking.
 */

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use rusqlite::Connection;

use crate::errors::BrokerError;

use super::schema;

/// Broker connection wrapper with thread-safe access
#[derive(Clone)]
pub struct BrokerConnection {
    /// Path to the queue database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConnection").field("db_path", &self.db_path).finish()
    }
}

impl BrokerConnection {
    /// Open (or create) the queue database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, BrokerError> {
        let db_path = db_path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BrokerError::Database(format!(
                        "failed to create broker directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        info!("Opening broker queue at: {:?}", db_path);

        let conn = Connection::open(&db_path).map_err(|e| {
            BrokerError::Database(format!("failed to open queue {:?}: {}", db_path, e))
        })?;

        schema::initialize_schema(&conn)?;

        Ok(Self { db_path, connection: Arc::new(Mutex::new(conn)) })
    }

    /// Create an in-memory queue (for testing)
    pub fn new_in_memory() -> Result<Self, BrokerError> {
        debug!("Creating in-memory broker queue");

        let conn = Connection::open_in_memory()
            .map_err(|e| BrokerError::Database(format!("failed to create queue: {}", e)))?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the queue database path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a queue operation with the connection.
    ///
    /// For async contexts, use `execute_async`.
    pub fn execute<F, T>(&self, f: F) -> Result<T, BrokerError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        let mut conn = self
            .connection
            .lock()
            .map_err(|e| BrokerError::Database(format!("failed to acquire queue lock: {}", e)))?;

        f(&mut conn).map_err(|e| BrokerError::Database(e.to_string()))
    }

    /// Execute a queue operation asynchronously using spawn_blocking.
    ///
    /// This is the preferred method for async contexts as it prevents
    /// blocking the async runtime.
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T, BrokerError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = connection
                .lock()
                .map_err(|e| BrokerError::Database(format!("failed to acquire queue lock: {}", e)))?;
            f(&mut conn).map_err(|e| BrokerError::Database(e.to_string()))
        })
        .await
        .map_err(|e| BrokerError::Database(format!("queue task panicked: {}", e)))?
    }
}
