// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload validation and the typed SOS payload built by the reporting UI.
//!
//! The queue treats payloads as opaque JSON. [`validate_payload`] only
//! rejects values that carry nothing to deliver; [`SosPayload`] is a
//! convenience for callers that build the emergency record themselves.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FloodlineError;

/// Serialize and check a payload before it is accepted for enqueue.
///
/// Returns the JSON text that will be stored and delivered unchanged.
pub fn serialize_payload<T: Serialize + ?Sized>(payload: &T) -> Result<String, FloodlineError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| FloodlineError::Validation(format!("payload is not serializable: {e}")))?;
    validate_payload(&value)?;
    serde_json::to_string(&value)
        .map_err(|e| FloodlineError::Validation(format!("payload is not serializable: {e}")))
}

/// Reject empty payloads: `null`, `{}`, `[]` and blank strings.
pub fn validate_payload(value: &serde_json::Value) -> Result<(), FloodlineError> {
    use serde_json::Value;

    let reason = match value {
        Value::Null => Some("payload is null"),
        Value::Object(map) if map.is_empty() => Some("payload object is empty"),
        Value::Array(items) if items.is_empty() => Some("payload array is empty"),
        Value::String(s) if s.trim().is_empty() => Some("payload string is blank"),
        _ => None,
    };
    match reason {
        Some(reason) => Err(FloodlineError::Validation(reason.to_string())),
        None => Ok(()),
    }
}

/// What kind of emergency the reporter is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    Trapped,
    Medical,
    MissingPerson,
    StructuralDamage,
    Other,
}

/// Severity classification chosen by the reporter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// The emergency record a citizen submits with an SOS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosPayload {
    pub reporter_id: String,
    pub location: Location,
    pub kind: EmergencyKind,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    /// References to attached photos or audio recordings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

impl SosPayload {
    /// Check reporter identity and coordinate ranges.
    pub fn validate(&self) -> Result<(), FloodlineError> {
        if self.reporter_id.trim().is_empty() {
            return Err(FloodlineError::Validation(
                "reporter_id must not be empty".into(),
            ));
        }
        let Location { lat, lng } = self.location;
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(FloodlineError::Validation(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(FloodlineError::Validation(format!(
                "longitude {lng} is outside [-180, 180]"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kolkata_payload() -> SosPayload {
        SosPayload {
            reporter_id: "user123".into(),
            location: Location {
                lat: 22.5726,
                lng: 88.3639,
            },
            kind: EmergencyKind::Trapped,
            severity: Severity::Critical,
            description: "Family trapped on rooftop, water level rising rapidly".into(),
            media: vec!["audio_001.mp3".into(), "photo_001.jpg".into()],
            state: Some("WB".into()),
            district: Some("WB-KOL".into()),
        }
    }

    #[test]
    fn empty_payloads_are_rejected() {
        for value in [json!(null), json!({}), json!([]), json!("  ")] {
            let err = validate_payload(&value).unwrap_err();
            assert!(matches!(err, FloodlineError::Validation(_)), "{value}");
        }
    }

    #[test]
    fn non_empty_payloads_are_accepted() {
        validate_payload(&json!({"type": "trapped", "lat": 22.57, "lng": 88.36})).unwrap();
        validate_payload(&json!([1])).unwrap();
        validate_payload(&json!(42)).unwrap();
    }

    #[test]
    fn serialize_payload_preserves_content() {
        let text = serialize_payload(&json!({"type": "trapped", "lat": 22.57})).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["type"], "trapped");
        assert_eq!(back["lat"], 22.57);
    }

    #[test]
    fn serialize_payload_rejects_none() {
        let none: Option<u32> = None;
        assert!(matches!(
            serialize_payload(&none),
            Err(FloodlineError::Validation(_))
        ));
    }

    #[test]
    fn sos_payload_validates_coordinates() {
        kolkata_payload().validate().unwrap();

        let mut bad = kolkata_payload();
        bad.location.lat = 91.0;
        assert!(bad.validate().is_err());

        let mut bad = kolkata_payload();
        bad.location.lng = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = kolkata_payload();
        bad.reporter_id = " ".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn sos_payload_wire_names() {
        let value = serde_json::to_value(kolkata_payload()).unwrap();
        assert_eq!(value["kind"], "trapped");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["location"]["lng"], 88.3639);

        let mut minimal = kolkata_payload();
        minimal.media.clear();
        minimal.state = None;
        let value = serde_json::to_value(minimal).unwrap();
        assert!(value.get("media").is_none());
        assert!(value.get("state").is_none());
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
        assert_eq!(
            "missing_person".parse::<EmergencyKind>().unwrap(),
            EmergencyKind::MissingPerson
        );
    }
}
