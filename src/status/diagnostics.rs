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

use std::collections::VecDeque;

use adherence_client::{MonitorEvent, NotificationVariant};
use chrono::{DateTime, Utc};

/// Entries kept before the oldest is dropped.
pub const MAX_DIAGNOSTICS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Bounded log of recent diagnostics, oldest first.
#[derive(Debug)]
pub struct DiagnosticsLog {
    entries: VecDeque<DiagnosticMessage>,
    max_entries: usize,
}

impl Default for DiagnosticsLog {
    fn default() -> Self {
        Self::new(MAX_DIAGNOSTICS)
    }
}

impl DiagnosticsLog {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Add a diagnostic message
    pub fn push(&mut self, level: DiagnosticLevel, message: impl Into<String>) {
        self.entries.push_back(DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        });

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(DiagnosticLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(DiagnosticLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(DiagnosticLevel::Error, message);
    }

    /// Record a client event.
    pub fn record_event(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::ConnectionChanged { connected: true } => self.info("Backend connected"),
            MonitorEvent::ConnectionChanged { connected: false } => self.warning("Backend disconnected"),
            MonitorEvent::Notify(notification) => {
                let message = format!("{}: {}", notification.title, notification.description);
                match notification.variant {
                    NotificationVariant::Default => self.info(message),
                    NotificationVariant::Destructive => self.error(message),
                }
            }
            MonitorEvent::SessionEnded { status, passed: true } => {
                self.info(format!("Session ended: {status}"));
            }
            MonitorEvent::SessionEnded { status, passed: false } => {
                self.warning(format!("Session ended: {status}"));
            }
            MonitorEvent::ConnectionTest { url, outcome: Ok(detail) } => {
                self.info(format!("Connection test {url}: {detail}"));
            }
            MonitorEvent::ConnectionTest { url, outcome: Err(e) } => {
                self.error(format!("Connection test {url}: {e}"));
            }
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DiagnosticMessage> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
