//! SQLite database layer backing the read-cursor store.
//!
//! Uses rusqlite over a single shared connection. All store operations go
//! through `with_conn_async`, which runs the closure on the blocking pool
//! so the worker's RPC loop never blocks on disk I/O. The mutex serialises
//! access, so multi-statement operations observe a consistent row set.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::BridgeError;

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(db_path: &str) -> Result<Self, BridgeError> {
        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .map_err(|e| BridgeError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| BridgeError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, BridgeError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BridgeError::Database(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    /// Automatically handles locking and error conversion.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| BridgeError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| BridgeError::Database(e.to_string()))
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| BridgeError::Database(format!("Task join error: {}", e)))?
    }

    /// Create all tables if they don't exist.
    fn initialize_tables(&self) -> Result<(), BridgeError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS local_group_read_cursor (
                    conversation_id     CHAR(128) NOT NULL,
                    user_id             CHAR(64) NOT NULL,
                    max_read_seq        INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (conversation_id, user_id)
                );

                CREATE TABLE IF NOT EXISTS local_group_read_cursor_state (
                    conversation_id     CHAR(128) PRIMARY KEY,
                    cursor_version      INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS local_group_read_state (
                    conversation_id     CHAR(128) PRIMARY KEY,
                    min_read_seq        INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS local_read_cursor (
                    conversation_id     CHAR(128) NOT NULL,
                    user_id             CHAR(64) NOT NULL,
                    max_read_seq        INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (conversation_id, user_id)
                );

                CREATE TABLE IF NOT EXISTS local_read_state (
                    conversation_id     CHAR(128) PRIMARY KEY,
                    all_read_seq        INTEGER NOT NULL DEFAULT 0
                );
                ",
            )
        })?;
        self.run_migrations()
    }

    /// Apply incremental migrations for schema changes on existing databases.
    fn run_migrations(&self) -> Result<(), BridgeError> {
        self.with_conn(|conn| {
            // Aggregate bookkeeping columns on the group read state; ignore
            // the error when a column is already present.
            let _ = conn.execute(
                "ALTER TABLE local_group_read_state ADD COLUMN member_count INTEGER NOT NULL DEFAULT 0",
                [],
            );
            let _ = conn.execute(
                "ALTER TABLE local_group_read_state ADD COLUMN cursor_count INTEGER NOT NULL DEFAULT 0",
                [],
            );
            let _ = conn.execute(
                "ALTER TABLE local_group_read_state ADD COLUMN last_sync_time INTEGER NOT NULL DEFAULT 0",
                [],
            );
            let _ = conn.execute(
                "ALTER TABLE local_group_read_state ADD COLUMN version INTEGER NOT NULL DEFAULT 0",
                [],
            );
            Ok(())
        })
    }
}
