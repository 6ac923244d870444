// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP delivery endpoint for the Floodline SOS queue.
//!
//! This crate implements [`DeliveryEndpoint`] over a JSON POST to the intake
//! API. The submission id travels in the `Idempotency-Key` header so a
//! redelivery after a lost acknowledgement is deduplicated server-side.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use floodline_config::model::EndpointConfig;
use floodline_core::error::FloodlineError;
use floodline_core::traits::{DeliveryEndpoint, PluginAdapter};
use floodline_core::types::{Ack, AdapterType, HealthStatus};
use tracing::{debug, info};

use crate::client::DeliveryClient;

/// HTTP intake endpoint implementing [`DeliveryEndpoint`].
pub struct HttpEndpoint {
    client: DeliveryClient,
    timeout: Duration,
}

impl HttpEndpoint {
    /// Creates an endpoint from the `[endpoint]` configuration section.
    pub fn new(config: &EndpointConfig) -> Result<Self, FloodlineError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = DeliveryClient::new(config.url.clone(), timeout, config.auth_token.as_deref())?;

        info!(url = %config.url, timeout_secs = config.timeout_secs, "HTTP endpoint initialized");

        Ok(Self { client, timeout })
    }

    /// Request timeout applied to every delivery attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl PluginAdapter for HttpEndpoint {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    /// Reachability is only known by attempting a delivery.
    async fn health_check(&self) -> Result<HealthStatus, FloodlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FloodlineError> {
        Ok(())
    }
}

#[async_trait]
impl DeliveryEndpoint for HttpEndpoint {
    async fn deliver(&self, id: &str, payload: &str) -> Result<Ack, FloodlineError> {
        debug!(id, url = self.client.url(), "delivering submission");
        self.client.post(id, payload).await
    }
}
