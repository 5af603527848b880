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

use super::navigation::Page;
use super::theme;
use crate::history::{DashboardStats, SessionRecord};

const RECENT_SESSIONS: usize = 3;

/// Draw the dashboard. Returns a page to switch to when a quick action is used.
pub fn render(ui: &mut egui::Ui, sessions: &[SessionRecord]) -> Option<Page> {
    let stats = DashboardStats::from_sessions(sessions);
    let mut navigate = None;

    ui.heading(egui::RichText::new("Welcome back!").size(26.0).strong());
    ui.label(egui::RichText::new("Monitor your medication adherence protocol").color(theme::TEXT_DIM));
    ui.add_space(16.0);

    let cards = [
        ("📈", "Adherence Rate", stats.adherence_label(), theme::SUCCESS),
        ("✔", "Successful Sessions", stats.successful.to_string(), theme::SUCCESS),
        ("✖", "Failed Sessions", stats.failed.to_string(), theme::DESTRUCTIVE),
        ("📋", "Total Sessions", stats.total.to_string(), theme::MUTED),
    ];

    ui.columns(cards.len(), |columns| {
        for (column, (icon, label, value, color)) in columns.iter_mut().zip(cards) {
            theme::card(column).show(column, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(egui::RichText::new(icon).size(22.0).color(color));
                ui.add_space(6.0);
                ui.label(egui::RichText::new(value).size(28.0).strong().color(theme::TEXT));
                ui.label(egui::RichText::new(label).size(12.0).color(theme::TEXT_DIM));
            });
        }
    });

    ui.add_space(16.0);

    ui.columns(2, |columns| {
        theme::card(&columns[0]).show(&mut columns[0], |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new("Quick Actions").size(18.0).strong());
            ui.add_space(8.0);
            let full_width = egui::vec2(ui.available_width(), 32.0);
            if ui.add_sized(full_width, egui::Button::new("📹 Start New Session")).clicked() {
                navigate = Some(Page::Monitor);
            }
            if ui.add_sized(full_width, egui::Button::new("🕘 View Session History")).clicked() {
                navigate = Some(Page::History);
            }
        });

        theme::card(&columns[1]).show(&mut columns[1], |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new("Recent Sessions").size(18.0).strong());
            ui.add_space(8.0);

            if sessions.is_empty() {
                ui.label(egui::RichText::new("No sessions recorded yet").italics().color(theme::TEXT_DIM));
            }

            for session in sessions.iter().take(RECENT_SESSIONS) {
                render_recent(ui, session);
            }
        });
    });

    navigate
}

fn render_recent(ui: &mut egui::Ui, session: &SessionRecord) {
    let status_color = if session.passed() { theme::SUCCESS } else { theme::DESTRUCTIVE };
    let phase = if session.phases >= adherence_client::PHASE_TOTAL {
        "Completed".to_string()
    } else {
        format!("Phase {}", session.phases)
    };

    egui::Frame::NONE
        .fill(egui::Color32::from_rgb(40, 46, 54))
        .corner_radius(6.0)
        .inner_margin(egui::Margin::same(8))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(session.date_label()).strong().color(theme::TEXT));
                    ui.label(egui::RichText::new(session.time_label()).size(11.0).color(theme::TEXT_DIM));
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new(phase).size(11.0).color(theme::TEXT_DIM));
                        ui.label(egui::RichText::new(&session.status).strong().color(status_color));
                    });
                });
            });
        });
    ui.add_space(4.0);
}
