// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The offline SOS submission queue.
//!
//! The durable store is the single source of truth: the queue keeps no
//! in-memory copy of any entry. A submission leaves the store only after the
//! endpoint acknowledged it. Transport failures leave it pending with a higher
//! attempt count, and rejections (or reaching the attempt cap) park it as
//! failed until an operator retries or discards it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use floodline_config::model::QueueConfig;
use floodline_core::payload::serialize_payload;
use floodline_core::types::new_submission_id;
use floodline_core::{
    DeliveryEndpoint, DeliveryReport, FailureOutcome, FloodlineError, QueueCounts, SosSubmission,
    SubmissionId, SubmissionStatus, SubmissionStore,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::scheduler::{SyncHandle, SyncSignal, SyncTrigger};

/// What happened to one entry during a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOutcome {
    Delivered,
    StillPending,
    Failed,
    /// Leased by another flush, or the lease was lost mid-attempt.
    Skipped,
}

/// Durable client-local queue of SOS submissions awaiting delivery.
pub struct OfflineSubmissionQueue {
    store: Arc<dyn SubmissionStore>,
    endpoint: Arc<dyn DeliveryEndpoint>,
    config: QueueConfig,
    delivery_timeout: Duration,
    signal: Arc<SyncSignal>,
    /// Prefix of the lease owner tag, unique per queue instance.
    instance_id: String,
    flush_seq: AtomicU64,
}

impl OfflineSubmissionQueue {
    /// Create a queue over an initialized store and a delivery endpoint.
    ///
    /// `delivery_timeout` bounds every single delivery attempt. An attempt
    /// must finish inside its lease (`config.lease_secs`), so a timeout that
    /// does not leave room for finalizing is cut to half the lease.
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        endpoint: Arc<dyn DeliveryEndpoint>,
        config: QueueConfig,
        delivery_timeout: Duration,
    ) -> Self {
        let lease = Duration::from_secs(config.lease_secs);
        let delivery_timeout = if delivery_timeout >= lease {
            let clamped = lease / 2;
            warn!(
                requested_ms = delivery_timeout.as_millis() as u64,
                lease_secs = config.lease_secs,
                clamped_ms = clamped.as_millis() as u64,
                "delivery timeout does not fit in the lease, clamping"
            );
            clamped
        } else {
            delivery_timeout
        };
        Self {
            store,
            endpoint,
            config,
            delivery_timeout,
            signal: Arc::new(SyncSignal::default()),
            instance_id: uuid::Uuid::new_v4().simple().to_string(),
            flush_seq: AtomicU64::new(0),
        }
    }

    /// Persist a new submission and signal the scheduler.
    ///
    /// Rejects empty or unserializable payloads with
    /// [`FloodlineError::Validation`] without writing anything. The durable
    /// write has completed when this returns.
    pub async fn enqueue<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<SubmissionId, FloodlineError> {
        let id = new_submission_id();
        self.enqueue_with_id(&id, payload).await?;
        Ok(id)
    }

    /// Like [`enqueue`](Self::enqueue), with a caller-generated id.
    ///
    /// Re-using an id overwrites that entry (back to pending with zero
    /// attempts) instead of creating a duplicate.
    pub async fn enqueue_with_id<T: Serialize + ?Sized>(
        &self,
        id: &str,
        payload: &T,
    ) -> Result<(), FloodlineError> {
        if id.trim().is_empty() {
            return Err(FloodlineError::Validation(
                "submission id must not be empty".into(),
            ));
        }
        let payload = serialize_payload(payload)?;
        let submission = SosSubmission::new(id.to_string(), payload);
        self.store.put(&submission).await?;

        info!(id, "submission queued");
        self.signal.raise(SyncTrigger::Enqueued);
        Ok(())
    }

    /// Attempt delivery of every pending entry once.
    ///
    /// Entries are attempted independently, up to `flush_concurrency` at a
    /// time, each bounded by the delivery timeout. Storage errors are returned
    /// after in-flight attempts settle; delivery errors are recorded on the
    /// entry and never returned.
    pub async fn flush_pending(&self) -> Result<DeliveryReport, FloodlineError> {
        let owner = format!(
            "{}-{}",
            self.instance_id,
            self.flush_seq.fetch_add(1, Ordering::Relaxed)
        );
        let pending = self.store.list(SubmissionStatus::Pending).await?;
        if pending.is_empty() {
            debug!("flush: nothing pending");
            return Ok(DeliveryReport::default());
        }

        debug!(count = pending.len(), owner = %owner, "flush started");

        let outcomes: Vec<Result<AttemptOutcome, FloodlineError>> = stream::iter(pending)
            .map(|entry| self.attempt(entry, &owner))
            .buffer_unordered(self.config.flush_concurrency.max(1))
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(AttemptOutcome::Delivered) => report.delivered += 1,
                Ok(AttemptOutcome::StillPending) => report.pending += 1,
                Ok(AttemptOutcome::Failed) => report.failed += 1,
                Ok(AttemptOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!(error = %e, "flush: storage error");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            delivered = report.delivered,
            pending = report.pending,
            failed = report.failed,
            skipped = report.skipped,
            "flush complete"
        );
        Ok(report)
    }

    /// Claim, deliver, and finalize one entry.
    async fn attempt(
        &self,
        entry: SosSubmission,
        owner: &str,
    ) -> Result<AttemptOutcome, FloodlineError> {
        let id = entry.id.as_str();
        let lease = Duration::from_secs(self.config.lease_secs);
        if !self.store.claim(id, owner, lease).await? {
            debug!(id, "entry held by another flush, skipping");
            return Ok(AttemptOutcome::Skipped);
        }

        let result =
            match tokio::time::timeout(self.delivery_timeout, self.endpoint.deliver(id, &entry.payload))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FloodlineError::Timeout {
                    duration: self.delivery_timeout,
                }),
            };

        match result {
            Ok(ack) => {
                if self.store.complete(id, owner).await? {
                    info!(id, status = ack.status, receipt = ?ack.receipt, "submission delivered");
                    Ok(AttemptOutcome::Delivered)
                } else {
                    warn!(id, "delivered but lease lost; entry stays queued");
                    Ok(AttemptOutcome::Skipped)
                }
            }
            Err(FloodlineError::Rejected { status, message }) => {
                let reason = format!("rejected ({status}): {message}");
                if self.store.mark_failed(id, owner, &reason).await? {
                    warn!(id, status, error = %message, "submission rejected, marked failed");
                    Ok(AttemptOutcome::Failed)
                } else {
                    warn!(id, "rejection not recorded; lease lost");
                    Ok(AttemptOutcome::Skipped)
                }
            }
            Err(e) => {
                if !e.is_retryable() {
                    warn!(id, error = %e, "unexpected delivery error, treating as retryable");
                }
                let reason = e.to_string();
                match self
                    .store
                    .record_failure(id, owner, &reason, self.config.attempt_cap())
                    .await?
                {
                    FailureOutcome::Retrying { attempt_count } => {
                        debug!(id, attempt_count, error = %reason, "delivery failed, will retry");
                        Ok(AttemptOutcome::StillPending)
                    }
                    FailureOutcome::Exhausted { attempt_count } => {
                        warn!(id, attempt_count, error = %reason, "attempt cap reached, marked failed");
                        Ok(AttemptOutcome::Failed)
                    }
                    FailureOutcome::LeaseLost => {
                        warn!(id, "failure not recorded; lease lost");
                        Ok(AttemptOutcome::Skipped)
                    }
                }
            }
        }
    }

    /// Snapshot of pending entries, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<SosSubmission>, FloodlineError> {
        self.store.list(SubmissionStatus::Pending).await
    }

    /// Snapshot of permanently failed entries, oldest first.
    pub async fn list_failed(&self) -> Result<Vec<SosSubmission>, FloodlineError> {
        self.store.list(SubmissionStatus::Failed).await
    }

    /// Look up one entry in either state.
    pub async fn get(&self, id: &str) -> Result<Option<SosSubmission>, FloodlineError> {
        self.store.get(id).await
    }

    /// Move a failed entry back to pending with a fresh attempt budget.
    ///
    /// `last_error` is kept for reference until the next attempt overwrites it.
    pub async fn retry_failed(&self, id: &str) -> Result<(), FloodlineError> {
        self.store.requeue(id).await?;
        info!(id, "failed submission requeued");
        self.signal.raise(SyncTrigger::Manual);
        Ok(())
    }

    /// Delete a failed entry on operator request. Pending entries cannot be discarded.
    pub async fn discard(&self, id: &str) -> Result<(), FloodlineError> {
        self.store.discard(id).await?;
        warn!(id, "failed submission discarded");
        Ok(())
    }

    /// Upper bound applied to each delivery attempt.
    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    /// Number of pending and failed entries.
    pub async fn counts(&self) -> Result<QueueCounts, FloodlineError> {
        self.store.counts().await
    }

    /// Handle for raising sync requests (connectivity restored, manual flush).
    pub fn sync_handle(&self) -> SyncHandle {
        SyncHandle::new(self.signal.clone())
    }

    pub(crate) fn signal(&self) -> Arc<SyncSignal> {
        self.signal.clone()
    }
}
