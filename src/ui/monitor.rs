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

//! Live protocol monitor: camera, status banner, phase progress.

use std::time::Duration;

use adherence_client::{MonitorState, StatusIcon, PHASE_TOTAL};

use super::theme;
use crate::video::LiveFeed;

const INSTRUCTIONS: [&str; 4] = [
    "Keep your face visible in the camera frame",
    "Follow each phase as instructed",
    "Allow time for detection and verification",
    "The process completes automatically upon success",
];

/// Frames older than this get an age caption under the video.
const STALE_FRAME_AFTER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    Reset,
    OpenFeedInBrowser,
}

/// Segments of the phase bar that are lit for `count`.
#[must_use]
pub fn filled_segments(count: u8) -> [bool; PHASE_TOTAL as usize] {
    let mut segments = [false; PHASE_TOTAL as usize];
    for (index, segment) in segments.iter_mut().enumerate() {
        *segment = index < usize::from(count);
    }
    segments
}

/// Caption under the video for a stalled or undecodable feed.
#[must_use]
pub fn feed_caption(frame_age: Option<Duration>, decode_error: Option<&str>) -> Option<String> {
    if let Some(error) = decode_error {
        return Some(format!("⚠ Frame could not be decoded: {error}"));
    }
    let age = frame_age.filter(|age| *age >= STALE_FRAME_AFTER)?;
    Some(format!("⏸ Last frame {:.0}s ago", age.as_secs_f32()))
}

/// Text of the reset button.
#[must_use]
pub fn reset_label(state: &MonitorState) -> &'static str {
    if state.resetting {
        "Resetting..."
    } else {
        "Start New Session"
    }
}

pub fn render(
    ui: &mut egui::Ui,
    state: &MonitorState,
    backend_url: &str,
    feed: Option<&mut LiveFeed>,
) -> Option<MonitorAction> {
    let mut action = None;

    ui.vertical_centered(|ui| {
        ui.heading(egui::RichText::new("💊 Medication Adherence Protocol").size(26.0).strong());
        ui.label(
            egui::RichText::new(
                "Follow the visual instructions on the screen. The process is being monitored in real-time.",
            )
            .color(theme::TEXT_DIM),
        );
    });
    ui.add_space(12.0);

    theme::card(ui).show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        if render_video(ui, state, backend_url, feed) {
            action = Some(MonitorAction::OpenFeedInBrowser);
        }
    });
    ui.add_space(10.0);

    theme::card(ui).show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        render_status_banner(ui, state);

        if state.presentation().terminated {
            ui.add_space(10.0);
            ui.vertical_centered(|ui| {
                let button = egui::Button::new(egui::RichText::new(reset_label(state)).size(15.0))
                    .min_size(egui::vec2(200.0, 34.0));
                if ui.add_enabled(state.can_reset(), button).clicked() {
                    action = Some(MonitorAction::Reset);
                }
            });
        }
    });
    ui.add_space(10.0);

    theme::card(ui).show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        render_phase(ui, state);
    });
    ui.add_space(10.0);

    egui::Frame::NONE
        .fill(egui::Color32::from_rgb(40, 46, 54))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::same(12))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(egui::RichText::new("Protocol Instructions:").strong());
            for line in INSTRUCTIONS {
                ui.label(egui::RichText::new(format!("• {line}")).color(theme::TEXT_DIM));
            }
        });

    action
}

/// Returns true when the user asked to open the feed externally.
fn render_video(ui: &mut egui::Ui, state: &MonitorState, backend_url: &str, feed: Option<&mut LiveFeed>) -> bool {
    let width = ui.available_width();
    let size = egui::vec2(width, width * 9.0 / 16.0);
    let mut open_external = false;

    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    ui.painter().rect_filled(rect, 6.0, egui::Color32::from_rgb(20, 22, 26));

    let caption = feed
        .as_deref()
        .and_then(|feed| feed_caption(feed.frame_age(), feed.last_error().as_deref()));

    let texture = match feed {
        Some(feed) if state.connected => feed.texture(ui.ctx()).cloned(),
        _ => None,
    };

    if let Some(texture) = texture {
        let image_size = texture.size_vec2();
        let scale = (rect.width() / image_size.x).min(rect.height() / image_size.y);
        let image_rect = egui::Rect::from_center_size(rect.center(), image_size * scale);
        egui::Image::new(&texture).paint_at(ui, image_rect);
    } else {
        let (headline, detail) = if state.connected {
            ("Loading video feed...", String::new())
        } else {
            ("Waiting for backend", format!("Backend URL: {backend_url}"))
        };
        let center = rect.center();
        ui.painter().text(
            center - egui::vec2(0.0, 12.0),
            egui::Align2::CENTER_CENTER,
            headline,
            egui::FontId::proportional(16.0),
            theme::TEXT_DIM,
        );
        ui.painter().text(
            center + egui::vec2(0.0, 12.0),
            egui::Align2::CENTER_CENTER,
            detail,
            egui::FontId::monospace(11.0),
            theme::MUTED,
        );

        let button_rect = egui::Rect::from_center_size(center + egui::vec2(0.0, 48.0), egui::vec2(180.0, 26.0));
        if ui
            .put(button_rect, egui::Button::new("Open feed in browser"))
            .clicked()
        {
            open_external = true;
        }
    }

    let (badge, color) = if state.connected {
        ("📶 Connected", theme::SUCCESS)
    } else {
        ("📴 Offline", theme::MUTED)
    };
    let badge_pos = rect.right_top() + egui::vec2(-12.0, 12.0);
    let galley = ui.painter().layout_no_wrap(badge.to_string(), egui::FontId::proportional(12.0), egui::Color32::WHITE);
    let badge_rect = egui::Rect::from_min_size(
        badge_pos - egui::vec2(galley.size().x + 12.0, 0.0),
        galley.size() + egui::vec2(12.0, 6.0),
    );
    ui.painter().rect_filled(badge_rect, 10.0, color);
    ui.painter().galley(badge_rect.min + egui::vec2(6.0, 3.0), galley, egui::Color32::WHITE);

    if let Some(caption) = caption.filter(|_| state.connected) {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(caption).size(11.0).color(theme::WARNING));
    }

    open_external
}

fn render_status_banner(ui: &mut egui::Ui, state: &MonitorState) {
    let presentation = state.presentation();
    let color = theme::tone_color(presentation.tone);

    egui::Frame::NONE
        .fill(color)
        .corner_radius(8.0)
        .inner_margin(egui::Margin::same(16))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                match theme::icon_glyph(presentation.icon) {
                    Some(glyph) => {
                        ui.label(egui::RichText::new(glyph).size(18.0).color(egui::Color32::WHITE));
                    }
                    None => {
                        debug_assert_eq!(presentation.icon, StatusIcon::Spinner);
                        ui.add(egui::Spinner::new().size(18.0).color(egui::Color32::WHITE));
                    }
                }
                ui.label(
                    egui::RichText::new(format!("Protocol Status: {}", state.protocol_status))
                        .size(17.0)
                        .strong()
                        .color(egui::Color32::WHITE),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    egui::Frame::NONE
                        .fill(egui::Color32::from_white_alpha(50))
                        .corner_radius(10.0)
                        .inner_margin(egui::Margin::symmetric(8, 2))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new("Live").size(11.0).color(egui::Color32::WHITE));
                        });
                });
            });
        });
}

fn render_phase(ui: &mut egui::Ui, state: &MonitorState) {
    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.label(egui::RichText::new("Current Phase").size(12.0).color(theme::TEXT_DIM));
            ui.label(egui::RichText::new(&state.phase_label).size(17.0).strong());
        });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.vertical(|ui| {
                ui.label(
                    egui::RichText::new(format!("{}/{}", state.phase_count, PHASE_TOTAL))
                        .size(28.0)
                        .strong()
                        .color(theme::PRIMARY),
                );
                ui.label(egui::RichText::new("Phases").size(11.0).color(theme::TEXT_DIM));
            });
        });
    });

    ui.add_space(12.0);

    let segments = filled_segments(state.phase_count);
    let gap = 4.0;
    let width = ui.available_width();
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 8.0), egui::Sense::hover());
    let segment_width = (width - gap * (segments.len() as f32 - 1.0)) / segments.len() as f32;

    for (index, filled) in segments.iter().enumerate() {
        let x = rect.min.x + index as f32 * (segment_width + gap);
        let segment = egui::Rect::from_min_size(egui::pos2(x, rect.min.y), egui::vec2(segment_width, rect.height()));
        let color = if *filled { theme::PRIMARY } else { egui::Color32::from_rgb(60, 66, 74) };
        ui.painter().rect_filled(segment, 4.0, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_segments() {
        assert_eq!(filled_segments(0), [false; 6]);
        assert_eq!(filled_segments(2), [true, true, false, false, false, false]);
        assert_eq!(filled_segments(6), [true; 6]);
        assert_eq!(filled_segments(9), [true; 6]);
    }

    #[test]
    fn test_feed_caption() {
        assert_eq!(feed_caption(None, None), None);
        assert_eq!(feed_caption(Some(Duration::from_millis(300)), None), None);
        assert_eq!(
            feed_caption(Some(Duration::from_secs(5)), None),
            Some("⏸ Last frame 5s ago".to_string())
        );
        // A decode error wins over the age
        assert_eq!(
            feed_caption(Some(Duration::from_secs(5)), Some("bad huffman table")),
            Some("⚠ Frame could not be decoded: bad huffman table".to_string())
        );
    }

    #[test]
    fn test_reset_label() {
        let mut state = MonitorState::default();
        assert_eq!(reset_label(&state), "Start New Session");
        state.resetting = true;
        assert_eq!(reset_label(&state), "Resetting...");
    }
}
