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

//! Session history.
//!
//! Sessions come from the backend's `adherence_log_*.json` reports when a
//! report directory is configured, or from a built-in sample list otherwise.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use adherence_client::monitor::present;
use adherence_client::StatusSnapshot;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REPORT_PREFIX: &str = "adherence_log_";
const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid report timestamp '{0}'")]
    Timestamp(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One completed verification session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: u32,
    /// When the backend wrote the report, i.e. when the session ended
    pub recorded_at: NaiveDateTime,
    pub status: String,
    pub duration_secs: f64,
    /// Phases reached, 0..=6
    pub phases: u8,
}

impl SessionRecord {
    #[must_use]
    pub fn passed(&self) -> bool {
        present(&self.status).passed()
    }

    #[must_use]
    pub fn date_label(&self) -> String {
        self.recorded_at.format("%Y-%m-%d").to_string()
    }

    #[must_use]
    pub fn time_label(&self) -> String {
        self.recorded_at.format("%I:%M %p").to_string()
    }

    #[must_use]
    pub fn duration_label(&self) -> String {
        format!("{:.0}s", self.duration_secs)
    }
}

/// Report file as written by the backend at the end of a session.
#[derive(Debug, Deserialize)]
struct ReportFile {
    timestamp: String,
    #[serde(default)]
    final_status: Option<String>,
    #[serde(default)]
    current_phase_at_end: Option<serde_json::Value>,
    #[serde(default)]
    protocol_duration_approx_seconds: f64,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    session: u32,
    date: String,
    time: String,
    status: &'a str,
    duration_seconds: f64,
    phases: u8,
}

/// Sessions shown when no report directory is configured.
#[must_use]
pub fn sample_sessions() -> Vec<SessionRecord> {
    const SAMPLES: [(u32, (i32, u32, u32), (u32, u32), &str, f64, u8); 8] = [
        (1, (2024, 1, 15), (8, 30), "PASS", 45.0, 6),
        (2, (2024, 1, 15), (14, 0), "PASS", 38.0, 6),
        (3, (2024, 1, 14), (8, 30), "PASS", 42.0, 6),
        (4, (2024, 1, 14), (14, 0), "PASS", 51.0, 6),
        (5, (2024, 1, 13), (8, 30), "FAIL", 23.0, 3),
        (6, (2024, 1, 13), (14, 0), "PASS", 44.0, 6),
        (7, (2024, 1, 12), (8, 30), "PASS", 39.0, 6),
        (8, (2024, 1, 12), (14, 0), "PASS", 46.0, 6),
    ];

    SAMPLES
        .iter()
        .filter_map(|&(id, (year, month, day), (hour, minute), status, duration_secs, phases)| {
            let recorded_at = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
            Some(SessionRecord {
                id,
                recorded_at,
                status: status.to_string(),
                duration_secs,
                phases,
            })
        })
        .collect()
}

fn parse_report(path: &Path) -> Result<SessionRecord, HistoryError> {
    let reader = BufReader::new(File::open(path)?);
    let report: ReportFile = serde_json::from_reader(reader)?;

    let recorded_at = NaiveDateTime::parse_from_str(&report.timestamp, REPORT_TIMESTAMP_FORMAT)
        .map_err(|_| HistoryError::Timestamp(report.timestamp.clone()))?;

    let snapshot = StatusSnapshot {
        result_status: report.final_status,
        current_phase: report.current_phase_at_end,
    };

    Ok(SessionRecord {
        id: 0,
        recorded_at,
        status: snapshot.status().to_string(),
        duration_secs: report.protocol_duration_approx_seconds.max(0.0),
        phases: snapshot.phase().count.unwrap_or(0),
    })
}

fn is_report_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(REPORT_PREFIX) && path.extension().is_some_and(|ext| ext == "json")
}

/// Load every report in `dir`, newest first.
///
/// Files that fail to parse are skipped with a warning. Ids are assigned in
/// display order starting at 1.
pub fn load_reports(dir: &Path) -> Result<Vec<SessionRecord>, HistoryError> {
    let mut sessions = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_report_file(&path) {
            continue;
        }

        match parse_report(&path) {
            Ok(session) => sessions.push(session),
            Err(e) => warn!("Skipping report {}: {}", path.display(), e),
        }
    }

    sessions.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    for (index, session) in sessions.iter_mut().enumerate() {
        session.id = u32::try_from(index + 1).unwrap_or(u32::MAX);
    }

    info!("Loaded {} session reports from {}", sessions.len(), dir.display());
    Ok(sessions)
}

/// Write sessions as CSV with a header row.
pub fn write_csv<W: Write>(sessions: &[SessionRecord], writer: W) -> Result<(), HistoryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for session in sessions {
        csv_writer.serialize(CsvRow {
            session: session.id,
            date: session.date_label(),
            time: session.recorded_at.format("%H:%M:%S").to_string(),
            status: &session.status,
            duration_seconds: session.duration_secs,
            phases: session.phases,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Export sessions to a CSV file at `path`.
pub fn export_csv(sessions: &[SessionRecord], path: &Path) -> Result<(), HistoryError> {
    write_csv(sessions, File::create(path)?)?;
    debug!("Exported {} sessions to {}", sessions.len(), path.display());
    Ok(())
}

/// Figures for the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of passed sessions, `None` when there are none.
    pub adherence_rate: Option<f64>,
}

impl DashboardStats {
    #[must_use]
    pub fn from_sessions(sessions: &[SessionRecord]) -> Self {
        let total = sessions.len();
        let successful = sessions.iter().filter(|s| s.passed()).count();
        let adherence_rate = (total > 0).then(|| successful as f64 * 100.0 / total as f64);
        Self {
            total,
            successful,
            failed: total - successful,
            adherence_rate,
        }
    }

    #[must_use]
    pub fn adherence_label(&self) -> String {
        self.adherence_rate
            .map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.0}%"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_report(dir: &Path, timestamp: &str, body: &str) {
        fs::write(dir.join(format!("{REPORT_PREFIX}{timestamp}.json")), body).unwrap();
    }

    #[test]
    fn test_sample_sessions() {
        let sessions = sample_sessions();
        assert_eq!(sessions.len(), 8);
        assert_eq!(sessions[0].date_label(), "2024-01-15");
        assert_eq!(sessions[0].time_label(), "08:30 AM");
        assert_eq!(sessions[1].time_label(), "02:00 PM");
        assert!(!sessions[4].passed());
        assert_eq!(sessions[4].phases, 3);
    }

    #[test]
    fn test_stats() {
        let stats = DashboardStats::from_sessions(&sample_sessions());
        assert_eq!(stats.total, 8);
        assert_eq!(stats.successful, 7);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.adherence_label(), "88%");

        let empty = DashboardStats::from_sessions(&[]);
        assert_eq!(empty.adherence_rate, None);
        assert_eq!(empty.adherence_label(), "n/a");
    }

    #[test]
    fn test_load_reports_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_report(
            dir.path(),
            "20240110_080000",
            r#"{"timestamp":"20240110_080000","final_status":"FAIL: Pill not detected","current_phase_at_end":"Phase 3 (Pill on Tongue)","protocol_duration_approx_seconds":21.6}"#,
        );
        write_report(
            dir.path(),
            "20240111_080000",
            r#"{"timestamp":"20240111_080000","final_status":"PASS","current_phase_at_end":"Phase 6 (Completed)","protocol_duration_approx_seconds":44.1,"yolo_model_path":"best.pt"}"#,
        );

        let sessions = load_reports(dir.path()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, 1);
        assert_eq!(sessions[0].status, "PASS");
        // Report timestamps mark when the session ended
        assert_eq!(
            sessions[0].recorded_at,
            NaiveDate::from_ymd_opt(2024, 1, 11).unwrap().and_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(sessions[0].phases, 6);
        assert!(sessions[0].passed());
        assert_eq!(sessions[1].phases, 3);
        assert!(!sessions[1].passed());
        assert_eq!(sessions[1].duration_label(), "22s");
    }

    #[test]
    fn test_load_reports_skips_malformed_and_unrelated() {
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), "20240110_080000", "{ not json");
        write_report(
            dir.path(),
            "20240111_080000",
            r#"{"timestamp":"yesterday","final_status":"PASS"}"#,
        );
        write_report(
            dir.path(),
            "20240112_080000",
            r#"{"timestamp":"20240112_080000","final_status":"PASS","current_phase_at_end":6}"#,
        );
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let sessions = load_reports(dir.path()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].phases, 6);
    }

    #[test]
    fn test_load_reports_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_reports(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, HistoryError::Io(_)));
    }

    #[test]
    fn test_write_csv() {
        let sessions = &sample_sessions()[..2];
        let mut out = Vec::new();
        write_csv(sessions, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("session,date,time,status,duration_seconds,phases"));
        assert_eq!(lines.next(), Some("1,2024-01-15,08:30:00,PASS,45.0,6"));
        assert_eq!(lines.next(), Some("2,2024-01-15,14:00:00,PASS,38.0,6"));
    }

    #[test]
    fn test_export_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.csv");
        export_csv(&sample_sessions(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 9);
    }
}
