// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline SOS submission queue with background-sync retry.
//!
//! [`OfflineSubmissionQueue`] persists every submission before returning and
//! removes it only once the delivery endpoint acknowledges receipt.
//! [`SyncScheduler`] plays the host's background-sync role: it flushes when a
//! submission is enqueued, when connectivity returns, and on a fixed period.

pub mod queue;
pub mod scheduler;

pub use queue::OfflineSubmissionQueue;
pub use scheduler::{SyncHandle, SyncScheduler, SyncTrigger};
