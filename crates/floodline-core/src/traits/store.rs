// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable submission store trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FloodlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{QueueCounts, SosSubmission, SubmissionStatus};

/// Result of recording a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Attempt counted; entry stays pending.
    Retrying { attempt_count: u32 },
    /// Attempt counted and the cap reached; entry is now failed.
    Exhausted { attempt_count: u32 },
    /// The caller no longer holds the lease; nothing was written.
    LeaseLost,
}

/// Durable key-value store of SOS submissions keyed by id.
///
/// The store is the only owner of queue state. Every per-entry transition is
/// atomic, and transitions made after a delivery attempt are conditional on
/// the lease taken by [`claim`](SubmissionStore::claim), which makes the
/// store the serialization point between concurrent flushes.
#[async_trait]
pub trait SubmissionStore: PluginAdapter {
    /// Opens the backing store (migrations, connection, etc.).
    ///
    /// Delivery leases still present at open time were left by a process that
    /// died mid-flush and are released, so those entries are retried at once.
    async fn initialize(&self) -> Result<(), FloodlineError>;

    /// Flushes pending writes and releases the connection.
    ///
    /// Every later call on the store fails with [`FloodlineError::Storage`].
    async fn close(&self) -> Result<(), FloodlineError>;

    /// Inserts a submission, or overwrites the one with the same id.
    ///
    /// An overwrite replaces payload and state and drops any lease, but keeps
    /// the original `created_at`.
    async fn put(&self, submission: &SosSubmission) -> Result<(), FloodlineError>;

    /// Looks up one submission.
    async fn get(&self, id: &str) -> Result<Option<SosSubmission>, FloodlineError>;

    /// Lists submissions in the given status, oldest first.
    async fn list(&self, status: SubmissionStatus) -> Result<Vec<SosSubmission>, FloodlineError>;

    /// Counts submissions per status.
    async fn counts(&self) -> Result<QueueCounts, FloodlineError>;

    /// Takes the delivery lease on a pending entry for `owner`.
    ///
    /// Returns `false` when the entry is gone, not pending, or leased by
    /// someone else whose lease has not yet expired.
    async fn claim(&self, id: &str, owner: &str, lease: Duration) -> Result<bool, FloodlineError>;

    /// Deletes an acknowledged entry. Returns `false` if `owner` lost the lease.
    async fn complete(&self, id: &str, owner: &str) -> Result<bool, FloodlineError>;

    /// Counts a failed attempt, stores `error`, and releases the lease.
    ///
    /// With `max_attempts = Some(n)` the entry turns failed once its attempt
    /// count reaches `n`.
    async fn record_failure(
        &self,
        id: &str,
        owner: &str,
        error: &str,
        max_attempts: Option<u32>,
    ) -> Result<FailureOutcome, FloodlineError>;

    /// Counts the attempt and marks the entry permanently failed.
    /// Returns `false` if `owner` lost the lease.
    async fn mark_failed(&self, id: &str, owner: &str, error: &str)
    -> Result<bool, FloodlineError>;

    /// Moves a failed entry back to pending with a zero attempt count.
    async fn requeue(&self, id: &str) -> Result<(), FloodlineError>;

    /// Deletes a failed entry on operator request.
    async fn discard(&self, id: &str) -> Result<(), FloodlineError>;
}
