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

//! Application configuration management.
//!
//! Settings are persisted as TOML through `confy`. Every field has a serde
//! default so older or hand-edited files keep loading as fields are added.
//! Camera and detection values are kept for the operator's reference only;
//! the backend has no endpoint that accepts them.

use std::path::PathBuf;
use std::time::Duration;

use adherence_client::{PollTarget, DEFAULT_BACKEND_URL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_NAME: &str = "medadhere-desktop";
const CONFIG_NAME: &str = "config";

/// Shortest poll interval the settings form accepts.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Reasons a settings draft cannot be saved.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("backend URL is not valid: {0}")]
    InvalidBackendUrl(String),

    #[error("backend URL must use http or https, not {0}")]
    UnsupportedScheme(String),

    #[error("poll interval must be at least {MIN_POLL_INTERVAL_MS} ms")]
    PollIntervalTooShort,

    #[error("resolution must look like 640x480, got '{0}'")]
    InvalidResolution(String),

    #[error("frame rate must be greater than zero")]
    ZeroFrameRate,

    #[error("confidence threshold must be between 0 and 1, got {0}")]
    ConfidenceOutOfRange(f32),
}

/// Camera parameters shown on the settings page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CameraSettings {
    #[serde(default = "default_resolution")]
    pub resolution: String,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl CameraSettings {
    /// Parse `resolution` into width and height.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let (width, height) = self.resolution.trim().split_once(['x', 'X'])?;
        let width = width.trim().parse().ok().filter(|w| *w > 0)?;
        let height = height.trim().parse().ok().filter(|h| *h > 0)?;
        Some((width, height))
    }
}

/// Detection parameters shown on the settings page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetectionSettings {
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f32,

    #[serde(default = "default_stability_frames")]
    pub stability_frames: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence(),
            stability_frames: default_stability_frames(),
        }
    }
}

/// Which notifications reach the toast stack.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Toast when a session ends in a pass
    #[serde(default = "default_true")]
    pub session_alerts: bool,

    /// Toast when a session ends in a failure
    #[serde(default = "default_true")]
    pub failure_alerts: bool,

    #[serde(default = "default_true")]
    pub reminder_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            session_alerts: true,
            failure_alerts: true,
            reminder_alerts: true,
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Backend base URL
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Delay between status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub camera: CameraSettings,

    #[serde(default)]
    pub detection: DetectionSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Directory holding the backend's `adherence_log_*.json` reports
    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    /// Show the floating status pane
    #[serde(default = "default_true")]
    pub show_status_pane: bool,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_resolution() -> String {
    "640x480".to_string()
}

fn default_frame_rate() -> u32 {
    30
}

fn default_confidence() -> f32 {
    0.75
}

fn default_stability_frames() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            backend_url: default_backend_url(),
            poll_interval_ms: default_poll_interval_ms(),
            camera: CameraSettings::default(),
            detection: DetectionSettings::default(),
            notifications: NotificationSettings::default(),
            report_dir: None,
            show_status_pane: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn poll_target(&self) -> PollTarget {
        PollTarget {
            backend_url: self.backend_url.trim().to_string(),
            interval: self.poll_interval(),
        }
    }

    /// Check a draft before it is saved or applied.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let url = reqwest::Url::parse(self.backend_url.trim())
            .map_err(|e| SettingsError::InvalidBackendUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::UnsupportedScheme(url.scheme().to_string()));
        }

        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(SettingsError::PollIntervalTooShort);
        }

        if self.camera.dimensions().is_none() {
            return Err(SettingsError::InvalidResolution(self.camera.resolution.clone()));
        }

        if self.camera.frame_rate == 0 {
            return Err(SettingsError::ZeroFrameRate);
        }

        let confidence = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SettingsError::ConfidenceOutOfRange(confidence));
        }

        Ok(())
    }
}
