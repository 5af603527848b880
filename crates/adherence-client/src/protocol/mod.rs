// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire format of the verification backend.
//!
//! The backend exposes three endpoints: a JSON status document, a reset
//! trigger and an MJPEG video stream. This module decodes the status
//! document and normalizes its loosely typed phase field; the MJPEG framing
//! lives in [`mjpeg`].

pub mod mjpeg;

pub use mjpeg::MjpegParser;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Number of phases in one verification session.
pub const PHASE_TOTAL: u8 = 6;

/// Status shown when a snapshot carries no usable `result_status`.
pub const DEFAULT_RUNNING_STATUS: &str = "RUNNING";

/// Phase label shown when a snapshot carries no usable `current_phase`.
pub const MONITORING_LABEL: &str = "Monitoring...";

lazy_static! {
    static ref PHASE_LABEL: Regex = Regex::new(r"Phase (\d+)").expect("phase label pattern is valid");
}

/// Errors that can occur while decoding backend responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed status document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One `/status_update` response.
///
/// Both fields are optional on the wire. `current_phase` is kept as a raw
/// JSON value because the backend reports it either as a number or as a
/// descriptive string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub result_status: Option<String>,
    #[serde(default)]
    pub current_phase: Option<serde_json::Value>,
}

impl StatusSnapshot {
    /// Decode a snapshot from a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Status string to display, falling back to `RUNNING`.
    #[must_use]
    pub fn status(&self) -> &str {
        match self.result_status.as_deref() {
            Some(status) if !status.is_empty() => status,
            _ => DEFAULT_RUNNING_STATUS,
        }
    }

    /// Interpret the phase field.
    #[must_use]
    pub fn phase(&self) -> PhaseReport {
        match &self.current_phase {
            Some(serde_json::Value::Number(number)) => {
                let value = number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
                    .unwrap_or_default();
                PhaseReport {
                    label: format!("Phase {number}"),
                    count: Some(clamp_phase(value)),
                }
            }
            Some(serde_json::Value::String(text)) => PhaseReport {
                label: text.clone(),
                count: parse_phase_label(text),
            },
            _ => PhaseReport {
                label: MONITORING_LABEL.to_string(),
                count: None,
            },
        }
    }
}

/// Normalized phase information from one snapshot.
///
/// `count` is `None` when the snapshot does not say which phase is active,
/// in which case the previously displayed count must be kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub label: String,
    pub count: Option<u8>,
}

/// Extract the phase number from labels such as `"Phase 3 (Awaiting Action)"`.
#[must_use]
pub fn parse_phase_label(label: &str) -> Option<u8> {
    let digits = PHASE_LABEL.captures(label)?.get(1)?.as_str();
    // Digits that overflow are still a phase report, just an absurd one.
    Some(digits.parse::<i64>().map_or(PHASE_TOTAL, clamp_phase))
}

/// Clamp a reported phase into `0..=PHASE_TOTAL`.
#[must_use]
pub fn clamp_phase(value: i64) -> u8 {
    u8::try_from(value.clamp(0, i64::from(PHASE_TOTAL))).unwrap_or(PHASE_TOTAL)
}

/// Endpoint URLs derived from a backend base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn status(&self) -> String {
        format!("{}/status_update", self.base)
    }

    #[must_use]
    pub fn reset(&self) -> String {
        format!("{}/reset", self.base)
    }

    #[must_use]
    pub fn video_feed(&self) -> String {
        format!("{}/video_feed", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_phase() {
        let snapshot = StatusSnapshot::from_slice(br#"{"result_status":"RUNNING","current_phase":3}"#).unwrap();
        assert_eq!(snapshot.status(), "RUNNING");
        assert_eq!(
            snapshot.phase(),
            PhaseReport { label: "Phase 3".to_string(), count: Some(3) }
        );
    }

    #[test]
    fn test_numeric_phase_is_clamped() {
        let snapshot = StatusSnapshot::from_slice(br#"{"current_phase":9}"#).unwrap();
        assert_eq!(snapshot.phase().count, Some(6));

        let snapshot = StatusSnapshot::from_slice(br#"{"current_phase":-2}"#).unwrap();
        assert_eq!(snapshot.phase().count, Some(0));
    }

    #[test]
    fn test_string_phase_with_number() {
        let snapshot = StatusSnapshot::from_slice(br#"{"current_phase":"Phase 4 (Awaiting Action)"}"#).unwrap();
        let phase = snapshot.phase();
        assert_eq!(phase.label, "Phase 4 (Awaiting Action)");
        assert_eq!(phase.count, Some(4));
    }

    #[test]
    fn test_string_phase_without_number_keeps_count() {
        let snapshot = StatusSnapshot::from_slice(br#"{"current_phase":"Calibrating"}"#).unwrap();
        assert_eq!(snapshot.phase().count, None);
        assert_eq!(snapshot.phase().label, "Calibrating");
    }

    #[test]
    fn test_missing_fields() {
        let snapshot = StatusSnapshot::from_slice(b"{}").unwrap();
        assert_eq!(snapshot.status(), DEFAULT_RUNNING_STATUS);
        assert_eq!(snapshot.phase().label, MONITORING_LABEL);
        assert_eq!(snapshot.phase().count, None);

        let snapshot = StatusSnapshot::from_slice(br#"{"result_status":"","current_phase":true}"#).unwrap();
        assert_eq!(snapshot.status(), DEFAULT_RUNNING_STATUS);
        assert_eq!(snapshot.phase().label, MONITORING_LABEL);
    }

    #[test]
    fn test_malformed_body() {
        assert!(StatusSnapshot::from_slice(b"<html>").is_err());
    }

    #[test]
    fn test_parse_phase_label_overflow() {
        assert_eq!(parse_phase_label("Phase 99999999999999999999999"), Some(PHASE_TOTAL));
        assert_eq!(parse_phase_label("phase 2"), None);
    }

    #[test]
    fn test_endpoints_trim_trailing_slash() {
        let endpoints = Endpoints::new("http://localhost:5000/");
        assert_eq!(endpoints.status(), "http://localhost:5000/status_update");
        assert_eq!(endpoints.reset(), "http://localhost:5000/reset");
        assert_eq!(endpoints.video_feed(), "http://localhost:5000/video_feed");
    }
}
