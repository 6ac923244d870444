// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `floodline serve` command implementation.
//!
//! Opens the queue, optionally flushes the backlog once, then runs the
//! [`SyncScheduler`] until SIGINT or SIGTERM. On unix, SIGUSR1 tells the
//! scheduler that connectivity came back, which is how a network manager
//! hook reports it. Heap statistics from jemalloc are logged while serving.

use std::time::Duration;

use floodline_config::model::FloodlineConfig;
use floodline_core::FloodlineError;
use floodline_queue::{SyncHandle, SyncScheduler, SyncTrigger};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::QueueRuntime;

/// Runs the `floodline serve` command.
pub async fn run_serve(config: FloodlineConfig) -> Result<(), FloodlineError> {
    info!(endpoint = %config.endpoint.url, "starting floodline serve");

    let runtime = QueueRuntime::open(&config).await?;
    let counts = runtime.queue.counts().await?;
    info!(pending = counts.pending, failed = counts.failed, "queue opened");

    let cancel = install_signal_handler();
    let scheduler = SyncScheduler::new(
        runtime.queue.clone(),
        Duration::from_secs(config.sync.interval_secs),
    );
    spawn_connectivity_listener(scheduler.handle(), cancel.clone());
    tokio::spawn(memory_monitor(cancel.clone()));

    if config.sync.flush_on_start {
        scheduler.flush_once(SyncTrigger::Manual).await;
    }

    scheduler.run(cancel).await;

    runtime.close().await?;
    if let Some(stats) = memory_stats() {
        info!(
            allocated_kb = stats.allocated / 1024,
            resident_kb = stats.resident / 1024,
            "floodline serve stopped"
        );
    } else {
        info!("floodline serve stopped");
    }
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, only Ctrl+C will stop serve");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Forwards SIGUSR1 to [`SyncHandle::connectivity_restored`] until `cancel` fires.
#[cfg(unix)]
fn spawn_connectivity_listener(handle: SyncHandle, cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to install SIGUSR1 handler, connectivity hooks disabled");
            return;
        }
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = usr1.recv() => {
                    if received.is_none() {
                        break;
                    }
                    info!("connectivity restored (SIGUSR1)");
                    handle.connectivity_restored();
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_connectivity_listener(_handle: SyncHandle, _cancel: CancellationToken) {}

/// Seconds between heap statistics log lines.
const MEMORY_LOG_INTERVAL_SECS: u64 = 60;

/// Heap usage reported by jemalloc, in bytes.
#[derive(Debug, Clone, Copy)]
struct MemoryStats {
    allocated: usize,
    resident: usize,
}

/// Reads fresh jemalloc statistics. `None` when they are unavailable.
#[cfg(not(target_env = "msvc"))]
fn memory_stats() -> Option<MemoryStats> {
    // Stats are cached until the epoch advances.
    tikv_jemalloc_ctl::epoch::advance().ok()?;
    Some(MemoryStats {
        allocated: tikv_jemalloc_ctl::stats::allocated::read().ok()?,
        resident: tikv_jemalloc_ctl::stats::resident::read().ok()?,
    })
}

#[cfg(target_env = "msvc")]
fn memory_stats() -> Option<MemoryStats> {
    None
}

/// Logs heap usage periodically until `cancel` fires.
async fn memory_monitor(cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(MEMORY_LOG_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(stats) = memory_stats() {
                    debug!(
                        allocated_kb = stats.allocated / 1024,
                        resident_kb = stats.resident / 1024,
                        "heap usage"
                    );
                }
            }
            _ = cancel.cancelled() => {
                debug!("memory monitor shutting down");
                break;
            }
        }
    }
}
