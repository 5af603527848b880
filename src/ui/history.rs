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

use std::path::PathBuf;

use adherence_client::PHASE_TOTAL;
use egui_extras::{Column, TableBuilder};

use super::theme;
use crate::history::SessionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    Reload,
    Export(PathBuf),
}

/// Default file offered by the export dialog.
#[must_use]
pub fn default_export_name() -> String {
    format!("medadhere_sessions_{}.csv", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

pub fn render(ui: &mut egui::Ui, sessions: &[SessionRecord], source: &str) -> Option<HistoryAction> {
    let mut action = None;

    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.heading(egui::RichText::new("Session History").size(26.0).strong());
            ui.label(
                egui::RichText::new("Review your medication adherence protocol sessions").color(theme::TEXT_DIM),
            );
            ui.label(egui::RichText::new(source).size(11.0).color(theme::MUTED));
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let export = ui.add_enabled(!sessions.is_empty(), egui::Button::new("⬇ Export CSV"));
            if export.clicked() {
                let mut dialog = rfd::FileDialog::new()
                    .add_filter("CSV Files", &["csv"])
                    .set_file_name(default_export_name());
                if let Some(documents) = dirs::document_dir() {
                    dialog = dialog.set_directory(documents);
                }
                if let Some(path) = dialog.save_file() {
                    action = Some(HistoryAction::Export(path));
                }
            }
            if ui.button("⟳ Reload").clicked() {
                action = Some(HistoryAction::Reload);
            }
        });
    });

    ui.add_space(12.0);

    if sessions.is_empty() {
        theme::card(ui).show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new("No sessions found").italics().color(theme::TEXT_DIM));
        });
        return action;
    }

    theme::card(ui).show(ui, |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .resizable(false)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(40.0))
            .column(Column::auto().at_least(70.0))
            .column(Column::remainder().at_least(110.0))
            .column(Column::remainder().at_least(90.0))
            .column(Column::auto().at_least(70.0))
            .column(Column::auto().at_least(60.0))
            .column(Column::remainder().at_least(120.0))
            .header(22.0, |mut header| {
                for title in ["", "Session", "Date", "Time", "Duration", "Phases", "Status"] {
                    header.col(|ui| {
                        ui.label(egui::RichText::new(title).strong().color(theme::TEXT_DIM));
                    });
                }
            })
            .body(|body| {
                body.rows(30.0, sessions.len(), |mut row| {
                    let session = &sessions[row.index()];
                    row.col(|ui| {
                        ui.label(egui::RichText::new("💊").size(18.0));
                    });
                    row.col(|ui| {
                        ui.label(egui::RichText::new(format!("#{}", session.id)).strong());
                    });
                    row.col(|ui| {
                        ui.label(format!("📅 {}", session.date_label()));
                    });
                    row.col(|ui| {
                        ui.label(format!("🕐 {}", session.time_label()));
                    });
                    row.col(|ui| {
                        ui.label(session.duration_label());
                    });
                    row.col(|ui| {
                        ui.label(format!("{}/{}", session.phases, PHASE_TOTAL));
                    });
                    row.col(|ui| {
                        status_badge(ui, session);
                    });
                });
            });
    });

    action
}

fn status_badge(ui: &mut egui::Ui, session: &SessionRecord) {
    let (glyph, color) = if session.passed() {
        ("✔", theme::SUCCESS)
    } else {
        ("✖", theme::DESTRUCTIVE)
    };

    egui::Frame::NONE
        .fill(color)
        .corner_radius(10.0)
        .inner_margin(egui::Margin::symmetric(8, 2))
        .show(ui, |ui| {
            ui.label(
                egui::RichText::new(format!("{glyph} {}", session.status))
                    .size(12.0)
                    .color(egui::Color32::WHITE),
            );
        });
}
