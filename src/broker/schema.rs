/*!
 * Broker queue schema definitions.
 *
 * This module contains the SQL schema for the job queue and handles
 * schema versioning for upgrades.
 */

use log::{debug, info};
use rusqlite::Connection;

use crate::errors::BrokerError;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the queue schema
pub fn initialize_schema(conn: &Connection) -> Result<(), BrokerError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing broker schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        // Single version so far; recreating is the only migration
        info!(
            "Migrating broker schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        debug!("Broker schema is up to date (v{})", current_version);
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, BrokerError> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )
        .map_err(|e| BrokerError::Database(format!("failed to check schema version: {}", e)))?;

    if !table_exists {
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .map_err(|e| BrokerError::Database(format!("failed to read schema version: {}", e)))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), BrokerError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
         DELETE FROM schema_version;
         INSERT INTO schema_version (version) VALUES ({});",
        version
    ))
    .map_err(|e| BrokerError::Database(format!("failed to set schema version: {}", e)))
}

fn create_all_tables(conn: &Connection) -> Result<(), BrokerError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            leased_until INTEGER,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_ready
            ON jobs (leased_until, created_at);
        "#,
    )
    .map_err(|e| BrokerError::Database(format!("failed to create queue tables: {}", e)))
}
