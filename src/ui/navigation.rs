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

use adherence_client::MonitorState;

use super::theme;

pub const BRAND: &str = "💊 MedAdhere";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Page {
    #[default]
    Dashboard,
    Monitor,
    History,
    Settings,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Dashboard, Page::Monitor, Page::History, Page::Settings];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Monitor => "Monitor",
            Page::History => "History",
            Page::Settings => "Settings",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Page::Dashboard => "🏠",
            Page::Monitor => "📹",
            Page::History => "🕘",
            Page::Settings => "⚙",
        }
    }
}

/// Top bar with the brand, page tabs and a compact connection indicator.
pub fn render(ctx: &egui::Context, current: &mut Page, state: &MonitorState) {
    egui::TopBottomPanel::top("navigation")
        .exact_height(44.0)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(egui::RichText::new(BRAND).size(18.0).strong().color(theme::PRIMARY));
                ui.add_space(24.0);

                for page in Page::ALL {
                    let text = egui::RichText::new(format!("{} {}", page.icon(), page.title())).size(14.0);
                    if ui.selectable_label(*current == page, text).clicked() {
                        *current = page;
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let (dot, label, color) = if state.connected {
                        ("●", "Live", theme::SUCCESS)
                    } else {
                        ("○", "Offline", theme::MUTED)
                    };
                    ui.label(egui::RichText::new(label).color(color).size(12.0));
                    ui.label(egui::RichText::new(dot).color(color).size(12.0));
                });
            });
        });
}
