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

//! Classification of free-form protocol status strings.

/// Status shown after the connection has been declared lost.
pub const DISCONNECTED_STATUS: &str = "DISCONNECTED";

const SUCCESS_KEYWORDS: [&str; 2] = ["PASS", "VERIFIED"];
const FAILURE_KEYWORDS: [&str; 2] = ["FAIL", "FATAL"];
const TERMINAL_KEYWORDS: [&str; 3] = ["PASS", "FAIL", "QUIT"];

/// Color class of the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTone {
    Success,
    Destructive,
    Muted,
    Warning,
}

/// Icon shown next to the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusIcon {
    Check,
    Alert,
    Offline,
    Spinner,
}

/// How a status string should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub tone: StatusTone,
    pub icon: StatusIcon,
    /// The session has ended and may be reset.
    pub terminated: bool,
}

impl Presentation {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.tone == StatusTone::Success
    }
}

/// Classify a status string by keyword containment.
#[must_use]
pub fn present(status: &str) -> Presentation {
    let (tone, icon) = if contains_any(status, &SUCCESS_KEYWORDS) {
        (StatusTone::Success, StatusIcon::Check)
    } else if contains_any(status, &FAILURE_KEYWORDS) {
        (StatusTone::Destructive, StatusIcon::Alert)
    } else if status.contains(DISCONNECTED_STATUS) {
        (StatusTone::Muted, StatusIcon::Offline)
    } else {
        (StatusTone::Warning, StatusIcon::Spinner)
    };

    Presentation {
        tone,
        icon,
        terminated: is_terminated(status),
    }
}

/// Whether the status marks the end of a session.
#[must_use]
pub fn is_terminated(status: &str) -> bool {
    contains_any(status, &TERMINAL_KEYWORDS)
}

fn contains_any(status: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| status.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_and_verified() {
        let presentation = present("VERIFIED (PASS)");
        assert_eq!(presentation.tone, StatusTone::Success);
        assert_eq!(presentation.icon, StatusIcon::Check);
        assert!(presentation.terminated);

        let presentation = present("PASS");
        assert_eq!(presentation.tone, StatusTone::Success);
        assert!(presentation.terminated);
    }

    #[test]
    fn test_verified_alone_is_not_terminal() {
        let presentation = present("VERIFIED");
        assert_eq!(presentation.tone, StatusTone::Success);
        assert!(!presentation.terminated);
    }

    #[test]
    fn test_failures() {
        let presentation = present("FATAL FAILURE (MOUTH COVERED)");
        assert_eq!(presentation.tone, StatusTone::Destructive);
        assert_eq!(presentation.icon, StatusIcon::Alert);
        assert!(presentation.terminated);

        let presentation = present("FAIL");
        assert_eq!(presentation.tone, StatusTone::Destructive);
        assert!(presentation.terminated);

        // FATAL alone colors the banner but only FAIL ends the session
        let presentation = present("FATAL");
        assert_eq!(presentation.tone, StatusTone::Destructive);
        assert_eq!(presentation.icon, StatusIcon::Alert);
        assert!(!presentation.terminated);
    }

    #[test]
    fn test_disconnected_is_muted() {
        let presentation = present(DISCONNECTED_STATUS);
        assert_eq!(presentation.tone, StatusTone::Muted);
        assert_eq!(presentation.icon, StatusIcon::Offline);
        assert!(!presentation.terminated);
    }

    #[test]
    fn test_in_progress_defaults() {
        for status in ["RUNNING", "CONNECTING", "INITIALIZING"] {
            let presentation = present(status);
            assert_eq!(presentation.tone, StatusTone::Warning);
            assert_eq!(presentation.icon, StatusIcon::Spinner);
            assert!(!presentation.terminated);
        }
    }

    #[test]
    fn test_user_quit_terminates_without_verdict() {
        let presentation = present("USER QUIT");
        assert_eq!(presentation.tone, StatusTone::Warning);
        assert!(presentation.terminated);
        assert!(!presentation.passed());
    }
}
