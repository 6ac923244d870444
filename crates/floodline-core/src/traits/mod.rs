// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Floodline queue.
//!
//! Both adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod endpoint;
pub mod store;

pub use adapter::PluginAdapter;
pub use endpoint::DeliveryEndpoint;
pub use store::{FailureOutcome, SubmissionStore};
