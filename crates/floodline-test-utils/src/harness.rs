// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end queue testing.
//!
//! `TestHarness` assembles a temp SQLite store, a [`MockEndpoint`], and an
//! [`OfflineSubmissionQueue`] over them. [`TestHarness::restart`] drops the
//! queue and store without closing them and reopens the same database file,
//! which is what a killed process looks like to the next run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use floodline_config::model::{QueueConfig, StorageConfig};
use floodline_core::{FloodlineError, SubmissionStore};
use floodline_queue::OfflineSubmissionQueue;
use floodline_storage::SqliteStore;

use crate::mock_endpoint::MockEndpoint;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    queue_config: QueueConfig,
    delivery_timeout: Duration,
    endpoint: Option<Arc<MockEndpoint>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            queue_config: QueueConfig::default(),
            delivery_timeout: Duration::from_secs(2),
            endpoint: None,
        }
    }

    /// Set the retry and flush policy.
    pub fn with_queue_config(mut self, config: QueueConfig) -> Self {
        self.queue_config = config;
        self
    }

    /// Set the per-attempt delivery timeout.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Start with the endpoint unreachable.
    pub fn offline(mut self) -> Self {
        self.endpoint = Some(Arc::new(MockEndpoint::offline()));
        self
    }

    /// Build the test harness, creating the temp database.
    pub async fn build(self) -> Result<TestHarness, FloodlineError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FloodlineError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| Arc::new(MockEndpoint::new()));

        let store = open_store(&db_path).await?;
        let queue = Arc::new(OfflineSubmissionQueue::new(
            store.clone(),
            endpoint.clone(),
            self.queue_config.clone(),
            self.delivery_timeout,
        ));

        Ok(TestHarness {
            queue,
            store,
            endpoint,
            db_path,
            queue_config: self.queue_config,
            delivery_timeout: self.delivery_timeout,
            _temp_dir: temp_dir,
        })
    }
}

/// A queue over a temp SQLite store and a mock endpoint.
pub struct TestHarness {
    /// The queue under test.
    pub queue: Arc<OfflineSubmissionQueue>,
    /// The store behind the queue, for direct inspection.
    pub store: Arc<SqliteStore>,
    /// The scripted endpoint.
    pub endpoint: Arc<MockEndpoint>,
    db_path: PathBuf,
    queue_config: QueueConfig,
    delivery_timeout: Duration,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default policy and an online endpoint.
    pub async fn new() -> Result<Self, FloodlineError> {
        Self::builder().build().await
    }

    /// Path of the SQLite file behind the store.
    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    /// Build a second queue over the same store and endpoint, as a second
    /// process or tab sharing the database would.
    pub fn second_queue(&self) -> OfflineSubmissionQueue {
        OfflineSubmissionQueue::new(
            self.store.clone(),
            self.endpoint.clone(),
            self.queue_config.clone(),
            self.delivery_timeout,
        )
    }

    /// Drop the queue and store without closing them, then reopen the database.
    ///
    /// The mock endpoint (the "server") survives the restart.
    pub async fn restart(&mut self) -> Result<(), FloodlineError> {
        let store = open_store(&self.db_path).await?;
        self.queue = Arc::new(OfflineSubmissionQueue::new(
            store.clone(),
            self.endpoint.clone(),
            self.queue_config.clone(),
            self.delivery_timeout,
        ));
        self.store = store;
        Ok(())
    }
}

async fn open_store(path: &std::path::Path) -> Result<Arc<SqliteStore>, FloodlineError> {
    let store = SqliteStore::new(StorageConfig {
        database_path: path.to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::new().await.unwrap();
        assert!(harness.queue.list_pending().await.unwrap().is_empty());
        assert!(harness.db_path().exists());
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::new().await.unwrap();
        let h2 = TestHarness::new().await.unwrap();

        h1.queue.enqueue(&json!({"n": 1})).await.unwrap();
        assert_eq!(h1.queue.counts().await.unwrap().pending, 1);
        assert_eq!(h2.queue.counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn restart_keeps_queued_entries() {
        let mut harness = TestHarness::builder().offline().build().await.unwrap();
        let id = harness.queue.enqueue(&json!({"n": 1})).await.unwrap();

        harness.restart().await.unwrap();
        let pending = harness.queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }
}
