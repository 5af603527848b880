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

//! Connection debouncing.
//!
//! A single dropped poll must not flap the connection badge. The stabilizer
//! only reports connected after a run of successes and only reports
//! disconnected after a longer run of failures.

/// Thresholds for flipping the displayed connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizerConfig {
    /// Consecutive successful polls required to report connected.
    pub connect_after: u32,
    /// Consecutive failed polls required to report disconnected.
    pub disconnect_after: u32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            connect_after: 2,
            disconnect_after: 3,
        }
    }
}

/// A flip of the displayed connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTransition {
    /// New connection state.
    pub connected: bool,
    /// Whether this flip should be announced to the user.
    pub notify: bool,
}

/// Hysteresis over poll outcomes.
#[derive(Debug, Clone)]
pub struct ConnectionStabilizer {
    config: StabilizerConfig,
    success_streak: u32,
    failure_streak: u32,
    connected: bool,
    connected_notified: bool,
    disconnected_notified: bool,
}

impl Default for ConnectionStabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}

impl ConnectionStabilizer {
    #[must_use]
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            success_streak: 0,
            failure_streak: 0,
            connected: false,
            connected_notified: false,
            disconnected_notified: false,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn success_streak(&self) -> u32 {
        self.success_streak
    }

    #[must_use]
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Record a successful poll.
    pub fn record_success(&mut self) -> Option<LinkTransition> {
        self.success_streak = self.success_streak.saturating_add(1);
        self.failure_streak = 0;

        if self.connected || self.success_streak < self.config.connect_after {
            return None;
        }

        self.connected = true;
        let notify = !self.connected_notified;
        if notify {
            self.connected_notified = true;
            self.disconnected_notified = false;
        }
        Some(LinkTransition { connected: true, notify })
    }

    /// Record a failed poll.
    pub fn record_failure(&mut self) -> Option<LinkTransition> {
        self.failure_streak = self.failure_streak.saturating_add(1);
        self.success_streak = 0;

        if !self.connected || self.failure_streak < self.config.disconnect_after {
            return None;
        }

        self.connected = false;
        let notify = !self.disconnected_notified;
        if notify {
            self.disconnected_notified = true;
            self.connected_notified = false;
        }
        Some(LinkTransition { connected: false, notify })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connects_after_two_successes() {
        let mut stabilizer = ConnectionStabilizer::default();
        assert_eq!(stabilizer.record_success(), None);
        assert!(!stabilizer.is_connected());

        assert_eq!(
            stabilizer.record_success(),
            Some(LinkTransition { connected: true, notify: true })
        );
        assert!(stabilizer.is_connected());

        // Further successes are quiet
        assert_eq!(stabilizer.record_success(), None);
    }

    #[test]
    fn test_single_failure_resets_success_streak() {
        let mut stabilizer = ConnectionStabilizer::default();
        stabilizer.record_success();
        stabilizer.record_failure();
        assert_eq!(stabilizer.record_success(), None);
        assert!(!stabilizer.is_connected());
    }

    #[test]
    fn test_disconnects_after_three_failures() {
        let mut stabilizer = ConnectionStabilizer::default();
        stabilizer.record_success();
        stabilizer.record_success();

        assert_eq!(stabilizer.record_failure(), None);
        assert_eq!(stabilizer.record_failure(), None);
        assert_eq!(
            stabilizer.record_failure(),
            Some(LinkTransition { connected: false, notify: true })
        );
        assert!(!stabilizer.is_connected());
        assert_eq!(stabilizer.record_failure(), None);
    }

    #[test]
    fn test_failures_while_disconnected_are_quiet() {
        let mut stabilizer = ConnectionStabilizer::default();
        for _ in 0..10 {
            assert_eq!(stabilizer.record_failure(), None);
        }
        assert_eq!(stabilizer.failure_streak(), 10);
    }

    #[test]
    fn test_reconnect_announces_again() {
        let mut stabilizer = ConnectionStabilizer::default();
        stabilizer.record_success();
        stabilizer.record_success();
        for _ in 0..3 {
            stabilizer.record_failure();
        }

        stabilizer.record_success();
        assert_eq!(
            stabilizer.record_success(),
            Some(LinkTransition { connected: true, notify: true })
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let mut stabilizer = ConnectionStabilizer::new(StabilizerConfig {
            connect_after: 1,
            disconnect_after: 1,
        });
        assert!(stabilizer.record_success().is_some());
        assert!(stabilizer.record_failure().is_some());
    }
}
