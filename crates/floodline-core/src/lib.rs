// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Floodline offline SOS queue.
//!
//! This crate provides the trait definitions, error types, and submission
//! types shared by the store, the delivery endpoint, and the queue itself.

pub mod error;
pub mod payload;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FloodlineError;
pub use payload::{EmergencyKind, Location, Severity, SosPayload};
pub use types::{
    Ack, AdapterType, DeliveryReport, HealthStatus, QueueCounts, SosSubmission, SubmissionId,
    SubmissionStatus,
};

pub use traits::{DeliveryEndpoint, FailureOutcome, PluginAdapter, SubmissionStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floodline_error_has_all_variants() {
        let _config = FloodlineError::Config("test".into());
        let _validation = FloodlineError::Validation("test".into());
        let _storage = FloodlineError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _transport = FloodlineError::Transport {
            message: "test".into(),
            source: None,
        };
        let _rejected = FloodlineError::Rejected {
            status: 400,
            message: "test".into(),
        };
        let _not_found = FloodlineError::NotFound { id: "sos-1".into() };
        let _state = FloodlineError::InvalidState {
            id: "sos-1".into(),
            message: "is not failed".into(),
        };
        let _timeout = FloodlineError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = FloodlineError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [AdapterType::Storage, AdapterType::Delivery] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), variant);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_store<T: SubmissionStore>() {}
        fn _assert_endpoint<T: DeliveryEndpoint>() {}
    }
}
