// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Floodline integration tests.
//!
//! Provides a scripted delivery endpoint and a test harness for fast,
//! deterministic, CI-runnable tests without a real intake server.
//!
//! # Components
//!
//! - [`MockEndpoint`] - Scripted endpoint with an online switch and server-side de-duplication
//! - [`TestHarness`] - Temp SQLite store, mock endpoint, and queue wired together

pub mod harness;
pub mod mock_endpoint;

pub use harness::TestHarness;
pub use mock_endpoint::{MockEndpoint, MockOutcome};
