// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` IS the single writer: query modules accept `&Database` and go
//! through [`Database::connection`]. Do NOT create additional Connection
//! instances for writes.

use std::path::Path;

use floodline_core::FloodlineError;
use tracing::{debug, info};

use crate::migrations;

/// Milliseconds SQLite waits on a locked database before returning SQLITE_BUSY.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Handle to the Floodline SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, FloodlineError> {
        Self::open_with_options(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    ///
    /// Parent directories are created when missing. `synchronous = FULL` is
    /// used in both modes so a write is on disk once the call returns.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, FloodlineError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| FloodlineError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| FloodlineError::Storage {
                source: Box::new(e),
            })?;

        let journal_mode = if wal_mode { "WAL" } else { "DELETE" };
        conn.call(move |conn| -> Result<(), FloodlineError> {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal_mode};
                 PRAGMA synchronous = FULL;
                 PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
                 PRAGMA foreign_keys = ON;"
            ))
            .map_err(|e| FloodlineError::Storage {
                source: Box::new(e),
            })?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => FloodlineError::Storage {
                source: other.to_string().into(),
            },
        })?;

        info!(path, journal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Run a WAL checkpoint, truncating the log into the main file.
    pub async fn checkpoint(&self) -> Result<(), FloodlineError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), FloodlineError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(|e| FloodlineError::Storage {
            source: e.to_string().into(),
        })?;
        debug!("database closed");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into FloodlineError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> FloodlineError {
    FloodlineError::Storage {
        source: Box::new(e),
    }
}
