// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Floodline - offline-first SOS submission queue.
//!
//! This is the binary entry point. One-shot subcommands operate on the local
//! queue and exit; `serve` runs the background sync loop until signalled.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::EnqueueArgs;

/// Floodline - queue SOS reports while offline, deliver them when the network returns.
#[derive(Parser, Debug)]
#[command(name = "floodline", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the default lookup paths.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue an SOS report and try to deliver it.
    Enqueue(EnqueueArgs),
    /// List reports waiting for delivery.
    Pending {
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List reports that failed permanently.
    Failed {
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Attempt delivery of every pending report once.
    Flush,
    /// Move a failed report back to pending.
    Retry {
        /// Submission id.
        id: String,
    },
    /// Delete a failed report.
    Discard {
        /// Submission id.
        id: String,
    },
    /// Run the background sync loop until SIGINT/SIGTERM.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => floodline_config::load_and_validate_path(path),
        None => floodline_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            floodline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.daemon.log_level);

    let result = match cli.command {
        Commands::Enqueue(args) => commands::run_enqueue(&config, args).await,
        Commands::Pending { json } => commands::run_list(&config, false, json).await,
        Commands::Failed { json } => commands::run_list(&config, true, json).await,
        Commands::Flush => commands::run_flush(&config).await,
        Commands::Retry { id } => commands::run_retry(&config, &id).await,
        Commands::Discard { id } => commands::run_discard(&config, &id).await,
        Commands::Serve => serve::run_serve(config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("floodline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    #[serial_test::serial]
    fn binary_loads_config_defaults() {
        let config = floodline_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.daemon.log_level, "info");
        assert!(config.sync.flush_on_start);
    }

    #[test]
    fn cli_parses_global_config_flag() {
        let cli = Cli::try_parse_from(["floodline", "flush", "--config", "/tmp/f.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/f.toml")));
        assert!(matches!(cli.command, Commands::Flush));
    }

    #[test]
    fn cli_parses_retry_and_listing() {
        let cli = Cli::try_parse_from(["floodline", "retry", "sos-1"]).unwrap();
        assert!(matches!(cli.command, Commands::Retry { ref id } if id == "sos-1"));

        let cli = Cli::try_parse_from(["floodline", "pending", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Pending { json: true }));
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["floodline"]).is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
