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

//! Monitor layer: the displayed protocol state and how poll outcomes change it.
//!
//! [`MonitorSession`] is a synchronous state machine fed by the HTTP layer.
//! Every input returns the [`MonitorEvent`]s it produced so callers can
//! forward them without holding the session lock.

mod presenter;
mod stabilizer;

pub use presenter::{is_terminated, present, Presentation, StatusIcon, StatusTone, DISCONNECTED_STATUS};
pub use stabilizer::{ConnectionStabilizer, LinkTransition, StabilizerConfig};

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::protocol::StatusSnapshot;

/// Status shown before the first successful poll.
pub const INITIAL_STATUS: &str = "CONNECTING";

/// Phase label shown before the first poll and after a reset.
pub const WAITING_LABEL: &str = "Waiting for connection...";

/// Phase label shown once the connection has been declared lost.
pub const NOT_CONNECTED_LABEL: &str = "Backend not connected";

/// Number of latency samples kept for plotting.
pub const LATENCY_HISTORY: usize = 120;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// A one-shot message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
        }
    }

    #[must_use]
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: NotificationVariant::Destructive,
            ..Self::new(title, description)
        }
    }

    #[must_use]
    pub fn connected() -> Self {
        Self::new("Connected to backend", "Live monitoring active")
    }

    #[must_use]
    pub fn connection_lost() -> Self {
        Self::destructive("Connection Lost", "Reconnecting to backend...")
    }

    #[must_use]
    pub fn reset_started() -> Self {
        Self::new("Protocol Reset", "Starting new session...")
    }

    #[must_use]
    pub fn reset_failed() -> Self {
        Self::destructive(
            "Reset Failed",
            "Could not reset protocol. Check the backend and try again.",
        )
    }
}

/// Events emitted by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The debounced connection state flipped.
    ConnectionChanged { connected: bool },
    /// Something the user should see.
    Notify(Notification),
    /// A poll moved the protocol into a terminal status.
    SessionEnded { status: String, passed: bool },
    /// Result of an explicit connection test against `url`.
    ConnectionTest { url: String, outcome: Result<String, String> },
}

/// Poll bookkeeping for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    pub total: u64,
    pub failed: u64,
    pub last_latency: Option<Duration>,
    /// Latencies of recent successful polls, in milliseconds.
    pub latency_history: VecDeque<f64>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl PollStats {
    fn record_success(&mut self, latency: Duration) {
        self.total += 1;
        self.last_latency = Some(latency);
        self.last_success_at = Some(Utc::now());
        self.last_error = None;

        self.latency_history.push_back(latency.as_secs_f64() * 1000.0);
        while self.latency_history.len() > LATENCY_HISTORY {
            self.latency_history.pop_front();
        }
    }

    fn record_failure(&mut self, error: &str) {
        self.total += 1;
        self.failed += 1;
        self.last_error = Some(error.to_string());
    }
}

/// What the monitor page displays.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub protocol_status: String,
    pub phase_label: String,
    pub phase_count: u8,
    pub connected: bool,
    pub resetting: bool,
    pub stats: PollStats,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            protocol_status: INITIAL_STATUS.to_string(),
            phase_label: WAITING_LABEL.to_string(),
            phase_count: 0,
            connected: false,
            resetting: false,
            stats: PollStats::default(),
        }
    }
}

impl MonitorState {
    #[must_use]
    pub fn presentation(&self) -> Presentation {
        present(&self.protocol_status)
    }

    /// Whether the reset action should be enabled.
    #[must_use]
    pub fn can_reset(&self) -> bool {
        self.presentation().terminated && self.connected && !self.resetting
    }

    fn apply_snapshot(&mut self, snapshot: &StatusSnapshot) {
        self.protocol_status = snapshot.status().to_string();

        let phase = snapshot.phase();
        self.phase_label = phase.label;
        if let Some(count) = phase.count {
            self.phase_count = count;
        }
    }

    fn mark_disconnected(&mut self) {
        self.protocol_status = DISCONNECTED_STATUS.to_string();
        self.phase_label = NOT_CONNECTED_LABEL.to_string();
    }

    fn clear_phase(&mut self) {
        self.phase_count = 0;
        self.phase_label = WAITING_LABEL.to_string();
    }
}

/// Displayed state plus the debouncer that owns its connection flag.
#[derive(Debug, Clone, Default)]
pub struct MonitorSession {
    stabilizer: ConnectionStabilizer,
    state: MonitorState,
    /// Terminal backend status already reported, until the backend moves on
    ended_status: Option<String>,
}

impl MonitorSession {
    #[must_use]
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            stabilizer: ConnectionStabilizer::new(config),
            state: MonitorState::default(),
            ended_status: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Apply a decoded `/status_update` response.
    pub fn on_poll_success(&mut self, snapshot: &StatusSnapshot, latency: Duration) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        self.state.stats.record_success(latency);

        if let Some(transition) = self.stabilizer.record_success() {
            self.apply_transition(transition, &mut events);
        }

        self.state.apply_snapshot(snapshot);

        // Only backend statuses count here; DISCONNECTED is set locally
        let presentation = self.state.presentation();
        if !presentation.terminated {
            self.ended_status = None;
        } else if self.ended_status.as_ref() != Some(&self.state.protocol_status) {
            self.ended_status = Some(self.state.protocol_status.clone());
            events.push(MonitorEvent::SessionEnded {
                status: self.state.protocol_status.clone(),
                passed: presentation.passed(),
            });
        }

        events
    }

    /// Record a poll that failed for any reason.
    pub fn on_poll_failure(&mut self, error: &str) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        self.state.stats.record_failure(error);

        if let Some(transition) = self.stabilizer.record_failure() {
            self.apply_transition(transition, &mut events);
        }

        events
    }

    /// Mark a reset as in flight. Returns `false` if one already is.
    pub fn begin_reset(&mut self) -> bool {
        if self.state.resetting {
            return false;
        }
        self.state.resetting = true;
        true
    }

    /// Conclude a reset started with [`begin_reset`](Self::begin_reset).
    pub fn finish_reset(&mut self, result: Result<(), String>) -> Vec<MonitorEvent> {
        self.state.resetting = false;
        match result {
            Ok(()) => {
                self.state.clear_phase();
                vec![MonitorEvent::Notify(Notification::reset_started())]
            }
            Err(_) => vec![MonitorEvent::Notify(Notification::reset_failed())],
        }
    }

    fn apply_transition(&mut self, transition: LinkTransition, events: &mut Vec<MonitorEvent>) {
        self.state.connected = transition.connected;
        if !transition.connected {
            self.state.mark_disconnected();
        }

        events.push(MonitorEvent::ConnectionChanged {
            connected: transition.connected,
        });
        if transition.notify {
            let notification = if transition.connected {
                Notification::connected()
            } else {
                Notification::connection_lost()
            };
            events.push(MonitorEvent::Notify(notification));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(body: &str) -> StatusSnapshot {
        StatusSnapshot::from_slice(body.as_bytes()).unwrap()
    }

    fn notifications(events: &[MonitorEvent]) -> Vec<&Notification> {
        events
            .iter()
            .filter_map(|event| match event {
                MonitorEvent::Notify(notification) => Some(notification),
                _ => None,
            })
            .collect()
    }

    fn connected_session() -> MonitorSession {
        let mut session = MonitorSession::default();
        let running = snapshot(r#"{"result_status":"RUNNING","current_phase":2}"#);
        session.on_poll_success(&running, Duration::from_millis(5));
        session.on_poll_success(&running, Duration::from_millis(5));
        session
    }

    #[test]
    fn test_initial_state() {
        let session = MonitorSession::default();
        assert_eq!(session.state().protocol_status, INITIAL_STATUS);
        assert_eq!(session.state().phase_label, WAITING_LABEL);
        assert!(!session.state().connected);
    }

    #[test]
    fn test_two_successes_connect_with_single_notification() {
        let mut session = MonitorSession::default();
        let running = snapshot(r#"{"result_status":"RUNNING","current_phase":1}"#);

        let first = session.on_poll_success(&running, Duration::from_millis(3));
        assert!(notifications(&first).is_empty());
        assert!(!session.state().connected);
        // Status is shown even before the connection is considered stable
        assert_eq!(session.state().protocol_status, "RUNNING");

        let second = session.on_poll_success(&running, Duration::from_millis(3));
        assert!(session.state().connected);
        assert_eq!(notifications(&second), vec![&Notification::connected()]);

        let third = session.on_poll_success(&running, Duration::from_millis(3));
        assert!(notifications(&third).is_empty());
    }

    #[test]
    fn test_three_failures_disconnect() {
        let mut session = connected_session();

        assert!(session.on_poll_failure("timeout").is_empty());
        assert!(session.on_poll_failure("timeout").is_empty());
        assert_eq!(session.state().protocol_status, "RUNNING");

        let events = session.on_poll_failure("timeout");
        assert!(!session.state().connected);
        assert_eq!(session.state().protocol_status, DISCONNECTED_STATUS);
        assert_eq!(session.state().phase_label, NOT_CONNECTED_LABEL);
        assert_eq!(notifications(&events), vec![&Notification::connection_lost()]);
        assert_eq!(events[0], MonitorEvent::ConnectionChanged { connected: false });

        assert!(session.on_poll_failure("timeout").is_empty());
        assert_eq!(session.state().stats.failed, 4);
    }

    #[test]
    fn test_phase_label_without_number_keeps_count() {
        let mut session = connected_session();
        assert_eq!(session.state().phase_count, 2);

        session.on_poll_success(&snapshot(r#"{"current_phase":"Phase 5 (Awaiting Action)"}"#), Duration::ZERO);
        assert_eq!(session.state().phase_count, 5);

        session.on_poll_success(&snapshot(r#"{"current_phase":"Checking swallow"}"#), Duration::ZERO);
        assert_eq!(session.state().phase_count, 5);
        assert_eq!(session.state().phase_label, "Checking swallow");
    }

    #[test]
    fn test_session_ended_emitted_once() {
        let mut session = connected_session();
        let passed = snapshot(r#"{"result_status":"VERIFIED (PASS)","current_phase":6}"#);

        let events = session.on_poll_success(&passed, Duration::ZERO);
        assert!(events.contains(&MonitorEvent::SessionEnded {
            status: "VERIFIED (PASS)".to_string(),
            passed: true,
        }));
        assert!(session.state().can_reset());

        let events = session.on_poll_success(&passed, Duration::ZERO);
        assert!(events.is_empty());
    }

    #[test]
    fn test_session_ended_not_repeated_after_reconnect() {
        let mut session = MonitorSession::default();
        let passed = snapshot(r#"{"result_status":"VERIFIED (PASS)","current_phase":6}"#);
        let ended = |events: &[MonitorEvent]| {
            events
                .iter()
                .filter(|event| matches!(event, MonitorEvent::SessionEnded { .. }))
                .count()
        };

        let mut count = 0;
        count += ended(&session.on_poll_success(&passed, Duration::ZERO));
        count += ended(&session.on_poll_success(&passed, Duration::ZERO));
        for _ in 0..3 {
            count += ended(&session.on_poll_failure("connection refused"));
        }
        assert_eq!(session.state().protocol_status, DISCONNECTED_STATUS);

        // Backend is back and still reports the same finished session
        count += ended(&session.on_poll_success(&passed, Duration::ZERO));
        count += ended(&session.on_poll_success(&passed, Duration::ZERO));
        assert_eq!(count, 1);
        assert!(session.state().connected);

        // A new session that ends again is reported
        let running = snapshot(r#"{"result_status":"RUNNING","current_phase":1}"#);
        assert_eq!(ended(&session.on_poll_success(&running, Duration::ZERO)), 0);
        assert_eq!(ended(&session.on_poll_success(&passed, Duration::ZERO)), 1);
    }

    #[test]
    fn test_reset_clears_phase_on_success_only() {
        let mut session = connected_session();
        assert!(session.begin_reset());
        assert!(!session.begin_reset());
        assert!(!session.state().can_reset());

        let events = session.finish_reset(Err("500".to_string()));
        assert_eq!(notifications(&events), vec![&Notification::reset_failed()]);
        assert_eq!(session.state().phase_count, 2);
        assert!(!session.state().resetting);

        assert!(session.begin_reset());
        let events = session.finish_reset(Ok(()));
        assert_eq!(notifications(&events), vec![&Notification::reset_started()]);
        assert_eq!(session.state().phase_count, 0);
        assert_eq!(session.state().phase_label, WAITING_LABEL);
    }

    #[test]
    fn test_latency_history_is_bounded() {
        let mut session = MonitorSession::default();
        let running = snapshot("{}");
        for _ in 0..(LATENCY_HISTORY + 10) {
            session.on_poll_success(&running, Duration::from_millis(1));
        }
        assert_eq!(session.state().stats.latency_history.len(), LATENCY_HISTORY);
        assert_eq!(session.state().stats.total, (LATENCY_HISTORY + 10) as u64);
    }
}
