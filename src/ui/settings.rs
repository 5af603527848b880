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

//! Settings form.
//!
//! Edits happen on a draft copy of the configuration. Nothing is applied
//! until "Save Changes" passes validation.

use std::path::PathBuf;

use super::theme;
use crate::config::{AppConfig, MIN_POLL_INTERVAL_MS};

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    Save(AppConfig),
    TestConnection(String),
}

#[derive(Debug)]
enum TestState {
    Idle,
    Running(String),
    Finished(Result<String, String>),
}

#[derive(Debug)]
pub struct SettingsView {
    draft: AppConfig,
    report_dir_input: String,
    error: Option<String>,
    test: TestState,
}

impl SettingsView {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            draft: config.clone(),
            report_dir_input: report_dir_text(config.report_dir.as_ref()),
            error: None,
            test: TestState::Idle,
        }
    }

    /// Replace the draft with `config`, dropping unsaved edits.
    pub fn reload(&mut self, config: &AppConfig) {
        *self = Self {
            test: std::mem::replace(&mut self.test, TestState::Idle),
            ..Self::new(config)
        };
    }

    /// Record the outcome of a connection test started from this form.
    pub fn connection_tested(&mut self, url: &str, outcome: Result<String, String>) {
        if matches!(&self.test, TestState::Running(pending) if pending == url) {
            self.test = TestState::Finished(outcome);
        }
    }

    /// Validate the draft and produce the config to save.
    pub fn submit(&mut self) -> Option<AppConfig> {
        let mut candidate = self.draft.clone();
        candidate.backend_url = candidate.backend_url.trim().to_string();
        let dir = self.report_dir_input.trim();
        candidate.report_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));

        match candidate.validate() {
            Ok(()) => {
                self.error = None;
                self.draft = candidate.clone();
                Some(candidate)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }

    pub fn reset_to_defaults(&mut self) {
        let defaults = AppConfig {
            show_status_pane: self.draft.show_status_pane,
            ..AppConfig::default()
        };
        self.report_dir_input.clear();
        self.draft = defaults;
        self.error = None;
    }

    pub fn render(&mut self, ui: &mut egui::Ui) -> Option<SettingsAction> {
        let mut action = None;

        ui.heading(egui::RichText::new("Settings").size(26.0).strong());
        ui.label(egui::RichText::new("Configure your medication adherence protocol").color(theme::TEXT_DIM));
        ui.add_space(12.0);

        ui.columns(2, |columns| {
            section(&mut columns[0], "📷 Camera Settings", "Configure video feed parameters", |ui| {
                egui::Grid::new("camera_settings").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                    ui.label("Resolution");
                    ui.text_edit_singleline(&mut self.draft.camera.resolution);
                    ui.end_row();

                    ui.label("Frame Rate");
                    ui.add(
                        egui::DragValue::new(&mut self.draft.camera.frame_rate)
                            .range(1..=120)
                            .suffix(" FPS"),
                    );
                    ui.end_row();
                });
            });

            section(&mut columns[1], "🎯 Detection Settings", "Adjust protocol parameters", |ui| {
                egui::Grid::new("detection_settings").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                    ui.label("Confidence Threshold");
                    ui.add(egui::Slider::new(&mut self.draft.detection.confidence_threshold, 0.0..=1.0).step_by(0.05));
                    ui.end_row();

                    ui.label("Stability Frames");
                    ui.add(egui::DragValue::new(&mut self.draft.detection.stability_frames).range(1..=600));
                    ui.end_row();
                });
            });
        });

        ui.add_space(10.0);

        ui.columns(2, |columns| {
            section(&mut columns[0], "🔔 Notifications", "Manage alert preferences", |ui| {
                let notifications = &mut self.draft.notifications;
                ui.checkbox(&mut notifications.session_alerts, "Session Completion Alerts");
                ui.checkbox(&mut notifications.failure_alerts, "Failure Alerts");
                ui.checkbox(&mut notifications.reminder_alerts, "Schedule Reminders");
            });

            section(&mut columns[1], "🔌 Backend Connection", "Configure the verification backend", |ui| {
                egui::Grid::new("backend_settings").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                    ui.label("Backend URL");
                    ui.text_edit_singleline(&mut self.draft.backend_url);
                    ui.end_row();

                    ui.label("Poll Interval");
                    ui.add(
                        egui::DragValue::new(&mut self.draft.poll_interval_ms)
                            .range(MIN_POLL_INTERVAL_MS..=10_000)
                            .speed(10)
                            .suffix(" ms"),
                    );
                    ui.end_row();

                    ui.label("Report Folder");
                    ui.horizontal(|ui| {
                        ui.add(egui::TextEdit::singleline(&mut self.report_dir_input).hint_text("sample data"));
                        if ui.button("Browse...").clicked() {
                            if let Some(path) = rfd::FileDialog::new().pick_folder() {
                                self.report_dir_input = path.display().to_string();
                            }
                        }
                    });
                    ui.end_row();
                });

                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    let running = matches!(self.test, TestState::Running(_));
                    if ui.add_enabled(!running, egui::Button::new("Test Connection")).clicked() {
                        let url = self.draft.backend_url.trim().to_string();
                        self.test = TestState::Running(url.clone());
                        action = Some(SettingsAction::TestConnection(url));
                    }
                    match &self.test {
                        TestState::Idle => {}
                        TestState::Running(_) => {
                            ui.add(egui::Spinner::new());
                        }
                        TestState::Finished(Ok(detail)) => {
                            ui.label(egui::RichText::new(format!("✔ {detail}")).color(theme::SUCCESS));
                        }
                        TestState::Finished(Err(e)) => {
                            ui.label(egui::RichText::new(format!("✖ {e}")).color(theme::DESTRUCTIVE));
                        }
                    }
                });
            });
        });

        ui.add_space(12.0);

        if let Some(error) = &self.error {
            ui.label(egui::RichText::new(error).color(theme::DESTRUCTIVE));
            ui.add_space(6.0);
        }

        ui.horizontal(|ui| {
            if ui.button("Reset to Defaults").clicked() {
                self.reset_to_defaults();
            }
            if ui.button(egui::RichText::new("💾 Save Changes").strong()).clicked() {
                if let Some(config) = self.submit() {
                    action = Some(SettingsAction::Save(config));
                }
            }
        });

        if let Ok(path) = AppConfig::get_config_path() {
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(format!("Stored in {}", path.display()))
                    .size(10.0)
                    .color(theme::MUTED),
            );
        }

        action
    }
}

fn report_dir_text(dir: Option<&PathBuf>) -> String {
    dir.map(|dir| dir.display().to_string()).unwrap_or_default()
}

fn section(ui: &mut egui::Ui, title: &str, subtitle: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    theme::card(ui).show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        ui.label(egui::RichText::new(title).size(16.0).strong());
        ui.label(egui::RichText::new(subtitle).size(11.0).color(theme::TEXT_DIM));
        ui.add_space(8.0);
        add_contents(ui);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_validates_draft() {
        let mut view = SettingsView::new(&AppConfig::default());
        view.draft.backend_url = "not a url".to_string();
        assert!(view.submit().is_none());
        assert!(view.error.is_some());

        view.draft.backend_url = " http://192.168.1.20:5000 ".to_string();
        let saved = view.submit().unwrap();
        assert_eq!(saved.backend_url, "http://192.168.1.20:5000");
        assert!(view.error.is_none());
    }

    #[test]
    fn test_submit_maps_report_dir() {
        let mut view = SettingsView::new(&AppConfig::default());
        view.report_dir_input = "  /var/lib/medadhere/reports ".to_string();
        let saved = view.submit().unwrap();
        assert_eq!(saved.report_dir, Some(PathBuf::from("/var/lib/medadhere/reports")));

        view.report_dir_input = "   ".to_string();
        assert_eq!(view.submit().unwrap().report_dir, None);
    }

    #[test]
    fn test_reset_to_defaults_keeps_pane_preference() {
        let config = AppConfig {
            backend_url: "http://10.0.0.2:5000".to_string(),
            show_status_pane: false,
            ..AppConfig::default()
        };
        let mut view = SettingsView::new(&config);
        view.reset_to_defaults();
        assert_eq!(view.draft.backend_url, "http://localhost:5000");
        assert!(!view.draft.show_status_pane);
    }

    #[test]
    fn test_connection_result_matches_pending_url() {
        let mut view = SettingsView::new(&AppConfig::default());
        view.test = TestState::Running("http://a:5000".to_string());

        view.connection_tested("http://b:5000", Ok("ok".to_string()));
        assert!(matches!(view.test, TestState::Running(_)));

        view.connection_tested("http://a:5000", Err("refused".to_string()));
        assert!(matches!(view.test, TestState::Finished(Err(_))));
    }
}
