// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Floodline submission queue.

use thiserror::Error;

/// The primary error type used across the Floodline adapter traits and queue operations.
#[derive(Debug, Error)]
pub enum FloodlineError {
    /// Configuration errors (invalid TOML, bad endpoint URL, inconsistent timeouts).
    #[error("configuration error: {0}")]
    Config(String),

    /// Payload rejected before any durable write.
    #[error("validation error: {0}")]
    Validation(String),

    /// Durable store errors (open, query, migration, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The delivery endpoint could not be reached or gave no definitive answer.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The delivery endpoint definitively refused the submission.
    #[error("submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No submission with the given id exists in the store.
    #[error("submission not found: {id}")]
    NotFound { id: String },

    /// The submission exists but is not in a state that allows the operation.
    #[error("submission {id} {message}")]
    InvalidState { id: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FloodlineError {
    /// Whether a delivery attempt that failed with this error may be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Shorthand for a [`FloodlineError::Transport`] without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }
}
