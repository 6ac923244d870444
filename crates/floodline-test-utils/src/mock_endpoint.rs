// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery endpoint for deterministic testing.
//!
//! `MockEndpoint` implements `DeliveryEndpoint` with an online/offline switch,
//! per-submission scripted outcomes, and a record of what the "server"
//! accepted. Acceptance is de-duplicated by idempotency token the way a real
//! intake server would.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use floodline_core::traits::adapter::PluginAdapter;
use floodline_core::traits::endpoint::DeliveryEndpoint;
use floodline_core::types::{Ack, AdapterType, HealthStatus};
use floodline_core::FloodlineError;

/// One scripted response to a delivery attempt.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Accept and acknowledge.
    Ack,
    /// Fail before reaching the server.
    Offline,
    /// Server accepts the record but the acknowledgement never arrives.
    AckLost,
    /// Server refuses the record permanently.
    Reject { status: u16, message: String },
    /// Wait this long, then acknowledge.
    Hang(Duration),
}

/// A scripted intake server for testing.
///
/// Attempts for an id consume its scripted outcomes in order; once the script
/// is exhausted (or for ids without a script) the endpoint acknowledges while
/// online and fails with a transport error while offline.
pub struct MockEndpoint {
    online: AtomicBool,
    scripts: Arc<Mutex<HashMap<String, VecDeque<MockOutcome>>>>,
    /// Every attempt's idempotency token, in call order.
    calls: Arc<Mutex<Vec<String>>>,
    /// Server-side records keyed by idempotency token.
    accepted: Arc<Mutex<HashMap<String, String>>>,
    /// Acceptances that arrived with an already-known token.
    duplicates: Arc<Mutex<usize>>,
}

impl MockEndpoint {
    /// Create an online endpoint that acknowledges everything.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            scripts: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            accepted: Arc::new(Mutex::new(HashMap::new())),
            duplicates: Arc::new(Mutex::new(0)),
        }
    }

    /// Create an endpoint that starts offline.
    pub fn offline() -> Self {
        let endpoint = Self::new();
        endpoint.set_online(false);
        endpoint
    }

    /// Flip network reachability.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Queue outcomes for the next attempts on `id`.
    pub async fn script(&self, id: &str, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.scripts
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// Total delivery attempts seen.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Delivery attempts seen for one id.
    pub async fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| *c == id).count()
    }

    /// Ids the server has recorded, sorted.
    pub async fn accepted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.accepted.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Payload the server recorded for `id`.
    pub async fn accepted_payload(&self, id: &str) -> Option<String> {
        self.accepted.lock().await.get(id).cloned()
    }

    /// Number of repeat deliveries the server de-duplicated.
    pub async fn duplicate_count(&self) -> usize {
        *self.duplicates.lock().await
    }

    async fn next_outcome(&self, id: &str) -> MockOutcome {
        let scripted = self
            .scripts
            .lock()
            .await
            .get_mut(id)
            .and_then(|outcomes| outcomes.pop_front());
        match scripted {
            Some(outcome) => outcome,
            None if self.online.load(Ordering::SeqCst) => MockOutcome::Ack,
            None => MockOutcome::Offline,
        }
    }

    /// Record the submission server-side, ignoring repeats of a known token.
    async fn accept(&self, id: &str, payload: &str) {
        let mut accepted = self.accepted.lock().await;
        if accepted.contains_key(id) {
            *self.duplicates.lock().await += 1;
        } else {
            accepted.insert(id.to_string(), payload.to_string());
        }
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEndpoint {
    fn name(&self) -> &str {
        "mock-endpoint"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, FloodlineError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("offline".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), FloodlineError> {
        Ok(())
    }
}

#[async_trait]
impl DeliveryEndpoint for MockEndpoint {
    async fn deliver(&self, id: &str, payload: &str) -> Result<Ack, FloodlineError> {
        self.calls.lock().await.push(id.to_string());

        match self.next_outcome(id).await {
            MockOutcome::Ack => {
                self.accept(id, payload).await;
                Ok(Ack {
                    status: 200,
                    receipt: Some(format!("mock-{id}")),
                })
            }
            MockOutcome::Offline => Err(FloodlineError::transport("network unreachable")),
            MockOutcome::AckLost => {
                self.accept(id, payload).await;
                Err(FloodlineError::transport("connection reset before response"))
            }
            MockOutcome::Reject { status, message } => {
                Err(FloodlineError::Rejected { status, message })
            }
            MockOutcome::Hang(delay) => {
                tokio::time::sleep(delay).await;
                self.accept(id, payload).await;
                Ok(Ack {
                    status: 200,
                    receipt: None,
                })
            }
        }
    }
}
