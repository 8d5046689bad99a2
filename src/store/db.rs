//! SQLite database handle, libsql-backed.
//!
//! Supports local file and in-memory databases. `libsql::Connection` is
//! `Send + Sync` and safe for concurrent async use, so the handle is shared
//! behind an `Arc` by every store.

use std::path::Path;
use std::sync::Arc;

use libsql::{Connection, Database as LibSqlDatabase};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;

/// Shared database handle.
pub struct Database {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl Database {
    /// Open (or create) a local database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        let database = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(database.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(database)
    }

    /// Create an in-memory database (for tests).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        let database = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(database.conn()).await?;
        Ok(database)
    }

    /// Get the connection.
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
