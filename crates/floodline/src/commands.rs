// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot queue commands: `enqueue`, `pending`, `failed`, `flush`, `retry`, `discard`.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use floodline_config::model::FloodlineConfig;
use floodline_core::{
    EmergencyKind, FloodlineError, Location, Severity, SosPayload, SosSubmission, SubmissionStore,
};
use floodline_delivery::HttpEndpoint;
use floodline_queue::OfflineSubmissionQueue;
use floodline_storage::SqliteStore;
use tracing::debug;

/// Arguments for `floodline enqueue`.
///
/// Either pass a raw JSON payload with `--json`, or build a typed SOS report
/// from the individual fields.
#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Raw JSON payload, stored and delivered as-is.
    #[arg(long, value_name = "JSON", conflicts_with = "reporter")]
    pub json: Option<String>,

    /// Use this submission id instead of a generated one.
    #[arg(long)]
    pub id: Option<String>,

    /// Reporter identifier.
    #[arg(long, required_unless_present = "json")]
    pub reporter: Option<String>,

    /// Latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true, required_unless_present = "json")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true, required_unless_present = "json")]
    pub lng: Option<f64>,

    /// Emergency kind (trapped, medical, missing_person, structural_damage, other).
    #[arg(long, default_value = "other")]
    pub kind: EmergencyKind,

    /// Severity (low, medium, high, critical).
    #[arg(long, default_value = "high")]
    pub severity: Severity,

    /// Free-text description.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Media reference; repeat for several attachments.
    #[arg(long = "media", value_name = "REF")]
    pub media: Vec<String>,

    /// State jurisdiction code.
    #[arg(long)]
    pub state: Option<String>,

    /// District jurisdiction code.
    #[arg(long)]
    pub district: Option<String>,

    /// Only queue the report; do not attempt delivery now.
    #[arg(long)]
    pub no_flush: bool,
}

impl EnqueueArgs {
    /// Build the payload to enqueue from the arguments.
    pub fn payload(&self) -> Result<serde_json::Value, FloodlineError> {
        if let Some(raw) = &self.json {
            return serde_json::from_str(raw)
                .map_err(|e| FloodlineError::Validation(format!("--json is not valid JSON: {e}")));
        }

        let (Some(reporter), Some(lat), Some(lng)) = (&self.reporter, self.lat, self.lng) else {
            return Err(FloodlineError::Validation(
                "--reporter, --lat and --lng are required without --json".into(),
            ));
        };
        let payload = SosPayload {
            reporter_id: reporter.clone(),
            location: Location { lat, lng },
            kind: self.kind,
            severity: self.severity,
            description: self.description.clone(),
            media: self.media.clone(),
            state: self.state.clone(),
            district: self.district.clone(),
        };
        payload.validate()?;
        serde_json::to_value(&payload)
            .map_err(|e| FloodlineError::Internal(format!("failed to encode payload: {e}")))
    }
}

/// The queue wired to the configured store and HTTP endpoint.
pub struct QueueRuntime {
    pub queue: Arc<OfflineSubmissionQueue>,
    store: Arc<SqliteStore>,
}

impl QueueRuntime {
    /// Open the store and build the queue from configuration.
    pub async fn open(config: &FloodlineConfig) -> Result<Self, FloodlineError> {
        let store = Arc::new(SqliteStore::new(config.storage.clone()));
        store.initialize().await?;
        let endpoint = Arc::new(HttpEndpoint::new(&config.endpoint)?);
        let queue = Arc::new(OfflineSubmissionQueue::new(
            store.clone(),
            endpoint,
            config.queue.clone(),
            Duration::from_secs(config.endpoint.timeout_secs),
        ));
        debug!(path = %config.storage.database_path, "queue runtime ready");
        Ok(Self { queue, store })
    }

    /// Checkpoint and close the store.
    pub async fn close(self) -> Result<(), FloodlineError> {
        self.store.close().await
    }
}

/// Run `floodline enqueue`.
pub async fn run_enqueue(config: &FloodlineConfig, args: EnqueueArgs) -> Result<(), FloodlineError> {
    let payload = args.payload()?;
    let runtime = QueueRuntime::open(config).await?;

    let id = match &args.id {
        Some(id) => {
            runtime.queue.enqueue_with_id(id, &payload).await?;
            id.clone()
        }
        None => runtime.queue.enqueue(&payload).await?,
    };
    println!("queued {id}");

    if !args.no_flush {
        let report = runtime.queue.flush_pending().await?;
        match runtime.queue.get(&id).await? {
            None => println!("delivered {id}"),
            Some(entry) => println!("{}", describe_undelivered(&entry)),
        }
        debug!(?report, "flush after enqueue");
    }

    runtime.close().await
}

/// Run `floodline pending` (`failed == false`) or `floodline failed`.
pub async fn run_list(config: &FloodlineConfig, failed: bool, json: bool) -> Result<(), FloodlineError> {
    let runtime = QueueRuntime::open(config).await?;
    let entries = if failed {
        runtime.queue.list_failed().await?
    } else {
        runtime.queue.list_pending().await?
    };

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| FloodlineError::Internal(format!("failed to encode entries: {e}")))?;
        println!("{out}");
    } else if entries.is_empty() {
        println!("no {} submissions", if failed { "failed" } else { "pending" });
    } else {
        for entry in &entries {
            println!("{}", format_entry(entry));
        }
    }

    runtime.close().await
}

/// Run `floodline flush`.
pub async fn run_flush(config: &FloodlineConfig) -> Result<(), FloodlineError> {
    let runtime = QueueRuntime::open(config).await?;
    let report = runtime.queue.flush_pending().await?;
    println!(
        "delivered {}, pending {}, failed {}, skipped {}",
        report.delivered, report.pending, report.failed, report.skipped
    );
    runtime.close().await
}

/// Run `floodline retry <id>`.
pub async fn run_retry(config: &FloodlineConfig, id: &str) -> Result<(), FloodlineError> {
    let runtime = QueueRuntime::open(config).await?;
    runtime.queue.retry_failed(id).await?;
    println!("requeued {id}");
    runtime.close().await
}

/// Run `floodline discard <id>`.
pub async fn run_discard(config: &FloodlineConfig, id: &str) -> Result<(), FloodlineError> {
    let runtime = QueueRuntime::open(config).await?;
    runtime.queue.discard(id).await?;
    println!("discarded {id}");
    runtime.close().await
}

/// One listing line: id, attempts, age and last error.
fn format_entry(entry: &SosSubmission) -> String {
    let mut line = format!(
        "{}  attempts={}  created={}",
        entry.id, entry.attempt_count, entry.created_at
    );
    if let Some(err) = &entry.last_error {
        line.push_str(&format!("  last_error={err}"));
    }
    line
}

fn describe_undelivered(entry: &SosSubmission) -> String {
    let reason = entry.last_error.as_deref().unwrap_or("not attempted");
    format!("{} is {} ({reason})", entry.id, entry.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: EnqueueArgs,
    }

    fn parse(argv: &[&str]) -> Result<EnqueueArgs, clap::Error> {
        let mut full = vec!["enqueue"];
        full.extend_from_slice(argv);
        Wrapper::try_parse_from(full).map(|w| w.args)
    }

    #[test]
    fn typed_fields_build_sos_payload() {
        let args = parse(&[
            "--reporter",
            "user123",
            "--lat",
            "22.5726",
            "--lng",
            "88.3639",
            "--kind",
            "trapped",
            "--severity",
            "critical",
            "--media",
            "photo_001.jpg",
            "--district",
            "WB-KOL",
        ])
        .unwrap();

        let value = args.payload().unwrap();
        assert_eq!(value["reporter_id"], "user123");
        assert_eq!(value["kind"], "trapped");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["media"][0], "photo_001.jpg");
        assert_eq!(value["district"], "WB-KOL");
        assert!(value.get("state").is_none());
    }

    #[test]
    fn negative_coordinates_parse() {
        let args = parse(&["--reporter", "u", "--lat", "-33.9", "--lng", "-70.6"]).unwrap();
        let value = args.payload().unwrap();
        assert_eq!(value["location"]["lat"], -33.9);
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let args = parse(&["--reporter", "u", "--lat", "91", "--lng", "0"]).unwrap();
        assert!(matches!(args.payload(), Err(FloodlineError::Validation(_))));
    }

    #[test]
    fn raw_json_is_passed_through() {
        let args = parse(&["--json", r#"{"type":"trapped","note":"roof"}"#]).unwrap();
        let value = args.payload().unwrap();
        assert_eq!(value["note"], "roof");
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let args = parse(&["--json", "{not json"]).unwrap();
        assert!(matches!(args.payload(), Err(FloodlineError::Validation(_))));
    }

    #[test]
    fn typed_fields_required_without_json() {
        assert!(parse(&["--lat", "1", "--lng", "2"]).is_err());
        assert!(parse(&["--json", "{}", "--reporter", "u"]).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected_by_parser() {
        assert!(parse(&["--reporter", "u", "--lat", "1", "--lng", "2", "--kind", "flood"]).is_err());
    }

    #[test]
    fn entry_line_includes_last_error() {
        let mut entry = SosSubmission::new("sos-1".into(), "{}".into());
        entry.attempt_count = 2;
        entry.last_error = Some("transport error: offline".into());
        let line = format_entry(&entry);
        assert!(line.starts_with("sos-1  attempts=2"));
        assert!(line.ends_with("last_error=transport error: offline"));
    }

    #[tokio::test]
    async fn runtime_round_trip_over_temp_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FloodlineConfig::default();
        config.storage.database_path = dir.path().join("cli.db").to_string_lossy().to_string();
        // Nothing listens on the discard port; delivery fails fast as a transport error.
        config.endpoint.url = "http://127.0.0.1:9/api/sos".into();
        config.endpoint.timeout_secs = 2;

        let runtime = QueueRuntime::open(&config).await.unwrap();
        runtime
            .queue
            .enqueue_with_id("sos-1", &serde_json::json!({"kind": "medical"}))
            .await
            .unwrap();
        let report = runtime.queue.flush_pending().await.unwrap();
        assert_eq!(report.pending, 1);
        runtime.close().await.unwrap();

        let runtime = QueueRuntime::open(&config).await.unwrap();
        let pending = runtime.queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempt_count, 1);
        assert!(describe_undelivered(&pending[0]).starts_with("sos-1 is pending ("));
        runtime.close().await.unwrap();
    }
}
