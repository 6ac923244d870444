// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery endpoint trait for the rescue-coordination backend.

use async_trait::async_trait;

use crate::error::FloodlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Ack;

/// Remote "submit emergency record" call.
///
/// Implementations must send `id` as an idempotency token so the receiver can
/// discard a repeat of an attempt whose acknowledgment was lost.
///
/// Errors are classified by variant: [`FloodlineError::Transport`] and
/// [`FloodlineError::Timeout`] are retryable, [`FloodlineError::Rejected`] is
/// permanent.
#[async_trait]
pub trait DeliveryEndpoint: PluginAdapter {
    /// Delivers one serialized payload.
    async fn deliver(&self, id: &str, payload: &str) -> Result<Ack, FloodlineError>;
}
