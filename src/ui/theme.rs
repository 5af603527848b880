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

//! Colors and glyphs shared by the pages.

use adherence_client::{StatusIcon, StatusTone};
use egui::Color32;

pub const SUCCESS: Color32 = Color32::from_rgb(34, 139, 34);
pub const DESTRUCTIVE: Color32 = Color32::from_rgb(220, 53, 69);
pub const WARNING: Color32 = Color32::from_rgb(255, 193, 7);
pub const MUTED: Color32 = Color32::from_rgb(130, 130, 130);
pub const PRIMARY: Color32 = Color32::from_rgb(100, 180, 220);

pub const CARD_FILL: Color32 = Color32::from_rgb(32, 37, 43);
pub const CARD_STROKE: Color32 = Color32::from_rgb(60, 80, 100);
pub const TEXT: Color32 = Color32::from_rgb(220, 220, 220);
pub const TEXT_DIM: Color32 = Color32::from_rgb(150, 150, 150);

#[must_use]
pub fn tone_color(tone: StatusTone) -> Color32 {
    match tone {
        StatusTone::Success => SUCCESS,
        StatusTone::Destructive => DESTRUCTIVE,
        StatusTone::Muted => MUTED,
        StatusTone::Warning => WARNING,
    }
}

/// Glyph for a status icon. `Spinner` is drawn with `egui::Spinner` instead.
#[must_use]
pub fn icon_glyph(icon: StatusIcon) -> Option<&'static str> {
    match icon {
        StatusIcon::Check => Some("✔"),
        StatusIcon::Alert => Some("⚠"),
        StatusIcon::Offline => Some("⛔"),
        StatusIcon::Spinner => None,
    }
}

/// Rounded card frame used by every page.
#[must_use]
pub fn card(ui: &egui::Ui) -> egui::Frame {
    egui::Frame::group(ui.style())
        .fill(CARD_FILL)
        .stroke(egui::Stroke::new(1.0, CARD_STROKE))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::same(14))
}

/// Small uppercase heading in the status pane style.
pub fn section_label(ui: &mut egui::Ui, text: &str) {
    ui.label(egui::RichText::new(text).color(TEXT_DIM).size(10.0).strong());
}
