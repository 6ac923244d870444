// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background-sync scheduling.
//!
//! The [`SyncScheduler`] waits on three sources and runs one
//! [`flush_pending`](OfflineSubmissionQueue::flush_pending) per wake-up:
//! - the shared sync signal, raised by `enqueue`, by
//!   [`SyncHandle::connectivity_restored`], and by [`SyncHandle::flush_now`]
//! - a periodic interval
//! - a [`CancellationToken`] that stops the loop
//!
//! Raising the signal while a flush is running stores a single permit, so the
//! loop runs exactly one more flush afterwards instead of one per raise.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use floodline_core::DeliveryReport;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::queue::OfflineSubmissionQueue;

/// Why a flush was started. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncTrigger {
    /// A submission was just enqueued.
    Enqueued = 0,
    /// The host reported that the network is back.
    ConnectivityRestored = 1,
    /// The periodic sync interval elapsed.
    Periodic = 2,
    /// An operator asked for an immediate flush.
    Manual = 3,
}

impl SyncTrigger {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::ConnectivityRestored,
            2 => Self::Periodic,
            3 => Self::Manual,
            _ => Self::Enqueued,
        }
    }

    /// Stable lowercase name for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::ConnectivityRestored => "connectivity_restored",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wake-up signal shared by the queue, its handles, and the scheduler.
#[derive(Debug, Default)]
pub(crate) struct SyncSignal {
    notify: Notify,
    last: AtomicU8,
}

impl SyncSignal {
    /// Records why a sync is wanted and wakes the scheduler (non-blocking).
    pub(crate) fn raise(&self, trigger: SyncTrigger) {
        self.last.store(trigger as u8, Ordering::Release);
        self.notify.notify_one();
    }

    async fn wait(&self) -> SyncTrigger {
        self.notify.notified().await;
        SyncTrigger::from_u8(self.last.load(Ordering::Acquire))
    }
}

/// Cloneable handle the host uses to request a sync.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    signal: Arc<SyncSignal>,
}

impl SyncHandle {
    pub(crate) fn new(signal: Arc<SyncSignal>) -> Self {
        Self { signal }
    }

    /// Report that connectivity returned; triggers a flush as soon as the scheduler runs.
    pub fn connectivity_restored(&self) {
        self.signal.raise(SyncTrigger::ConnectivityRestored);
    }

    /// Request an immediate flush.
    pub fn flush_now(&self) {
        self.signal.raise(SyncTrigger::Manual);
    }
}

/// Runs flushes in response to sync signals and a periodic timer.
pub struct SyncScheduler {
    queue: Arc<OfflineSubmissionQueue>,
    interval: Duration,
}

impl SyncScheduler {
    /// Create a scheduler flushing `queue` at least every `interval`.
    pub fn new(queue: Arc<OfflineSubmissionQueue>, interval: Duration) -> Self {
        Self { queue, interval }
    }

    /// Handle for raising sync requests from other tasks.
    pub fn handle(&self) -> SyncHandle {
        self.queue.sync_handle()
    }

    /// Run one flush and log its outcome.
    ///
    /// Storage errors are logged and swallowed so the loop keeps going; the
    /// entries stay in the store for the next trigger.
    pub async fn flush_once(&self, trigger: SyncTrigger) -> Option<DeliveryReport> {
        debug!(trigger = %trigger, "sync triggered");
        match self.queue.flush_pending().await {
            Ok(report) => {
                if report.total() > 0 {
                    info!(
                        trigger = %trigger,
                        delivered = report.delivered,
                        pending = report.pending,
                        failed = report.failed,
                        skipped = report.skipped,
                        "sync finished"
                    );
                }
                Some(report)
            }
            Err(e) => {
                error!(trigger = %trigger, error = %e, "sync failed");
                None
            }
        }
    }

    /// Loop until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let signal = self.queue.signal();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        interval.tick().await;

        info!(interval_secs = self.interval.as_secs(), "sync scheduler started");

        loop {
            let trigger = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("sync scheduler shutting down");
                    break;
                }
                trigger = signal.wait() => trigger,
                _ = interval.tick() => SyncTrigger::Periodic,
            };
            self.flush_once(trigger).await;
        }
    }
}
