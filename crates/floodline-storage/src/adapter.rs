// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SubmissionStore trait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use floodline_config::model::StorageConfig;
use floodline_core::{
    AdapterType, FailureOutcome, FloodlineError, HealthStatus, PluginAdapter, QueueCounts,
    SosSubmission, SubmissionStatus, SubmissionStore,
};

use crate::database::Database;
use crate::queries::submissions;

/// SQLite-backed submission store.
///
/// Wraps a [`Database`] handle and delegates all query operations to
/// [`queries::submissions`](crate::queries::submissions). The database is
/// lazily opened on the first call to [`SubmissionStore::initialize`] and
/// released by [`SubmissionStore::close`]; a closed store rejects every call.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
    closed: AtomicBool,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](SubmissionStore::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, FloodlineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FloodlineError::Storage {
                source: "storage closed".into(),
            });
        }
        self.db.get().ok_or_else(|| FloodlineError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FloodlineError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FloodlineError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    async fn initialize(&self) -> Result<(), FloodlineError> {
        let db = Database::open_with_options(&self.config.database_path, self.config.wal_mode)
            .await?;

        // A lease still set at open time belongs to a process that died mid-flush.
        let released = submissions::release_leases(&db).await?;
        if released > 0 {
            info!(released, "released delivery leases left by an interrupted flush");
        }

        self.db.set(db).map_err(|_| FloodlineError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite submission store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FloodlineError> {
        let db = self.db()?.clone();
        self.closed.store(true, Ordering::Release);
        db.close().await
    }

    async fn put(&self, submission: &SosSubmission) -> Result<(), FloodlineError> {
        submissions::put(self.db()?, submission).await
    }

    async fn get(&self, id: &str) -> Result<Option<SosSubmission>, FloodlineError> {
        submissions::get(self.db()?, id).await
    }

    async fn list(&self, status: SubmissionStatus) -> Result<Vec<SosSubmission>, FloodlineError> {
        submissions::list(self.db()?, status).await
    }

    async fn counts(&self) -> Result<QueueCounts, FloodlineError> {
        submissions::counts(self.db()?).await
    }

    async fn claim(&self, id: &str, owner: &str, lease: Duration) -> Result<bool, FloodlineError> {
        submissions::claim(self.db()?, id, owner, lease).await
    }

    async fn complete(&self, id: &str, owner: &str) -> Result<bool, FloodlineError> {
        submissions::complete(self.db()?, id, owner).await
    }

    async fn record_failure(
        &self,
        id: &str,
        owner: &str,
        error: &str,
        max_attempts: Option<u32>,
    ) -> Result<FailureOutcome, FloodlineError> {
        submissions::record_failure(self.db()?, id, owner, error, max_attempts).await
    }

    async fn mark_failed(
        &self,
        id: &str,
        owner: &str,
        error: &str,
    ) -> Result<bool, FloodlineError> {
        submissions::mark_failed(self.db()?, id, owner, error).await
    }

    async fn requeue(&self, id: &str) -> Result<(), FloodlineError> {
        submissions::requeue(self.db()?, id).await
    }

    async fn discard(&self, id: &str) -> Result<(), FloodlineError> {
        submissions::discard(self.db()?, id).await
    }
}
