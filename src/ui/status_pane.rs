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
use chrono::Utc;
use egui_plot::{Line, Plot, PlotPoints};

use super::theme;
use crate::status::{DiagnosticLevel, DiagnosticsLog};

const LABEL: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);
const VALUE: egui::Color32 = egui::Color32::from_rgb(200, 200, 200);
const MAX_MESSAGE_CHARS: usize = 34;

#[derive(Debug)]
pub struct StatusPane {
    pub visible: bool,
    pub collapsed: bool,
}

impl Default for StatusPane {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StatusPane {
    #[must_use]
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            collapsed: false,
        }
    }

    /// Render the status pane as a floating window
    pub fn render(&mut self, ctx: &egui::Context, state: &MonitorState, backend_url: &str, diagnostics: &DiagnosticsLog) {
        if !self.visible {
            // Small button to re-open the pane when hidden
            egui::Window::new("show_status")
                .title_bar(false)
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
                .fixed_size(egui::vec2(140.0, 35.0))
                .resizable(false)
                .frame(pane_frame(ctx, 200))
                .show(ctx, |ui| {
                    let text = egui::RichText::new("📊 Show Status").color(theme::PRIMARY).size(11.0);
                    if ui.button(text).clicked() {
                        self.visible = true;
                    }
                });
            return;
        }

        let screen_height = ctx.screen_rect().height();

        egui::Window::new("Poll Status")
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
            .fixed_size(egui::vec2(304.0, if self.collapsed { 40.0 } else { screen_height.min(520.0) }))
            .resizable(false)
            .collapsible(false)
            .title_bar(false)
            .frame(pane_frame(ctx, 230))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("◈ STATUS").color(theme::PRIMARY).size(12.0).strong());

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let hide = egui::RichText::new("✕").size(12.0).color(egui::Color32::from_rgb(200, 100, 100));
                        if ui.button(hide).on_hover_text("Hide status pane").clicked() {
                            self.visible = false;
                        }

                        ui.add_space(4.0);

                        let collapse_icon = if self.collapsed { "▼" } else { "▲" };
                        if ui
                            .button(egui::RichText::new(collapse_icon).size(10.0))
                            .on_hover_text(if self.collapsed { "Expand" } else { "Collapse" })
                            .clicked()
                        {
                            self.collapsed = !self.collapsed;
                        }
                    });
                });

                if self.collapsed {
                    return;
                }

                ui.separator();

                egui::ScrollArea::vertical()
                    .max_height(screen_height.min(470.0))
                    .show(ui, |ui| {
                        render_connection_section(ui, state, backend_url);
                        ui.add_space(6.0);
                        render_polling_section(ui, state);
                        ui.add_space(6.0);
                        render_diagnostics_section(ui, diagnostics);
                    });
            });
    }
}

fn pane_frame(ctx: &egui::Context, alpha: u8) -> egui::Frame {
    egui::Frame::window(&ctx.style())
        .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, alpha))
        .stroke(egui::Stroke::new(1.0, theme::CARD_STROKE))
        .corner_radius(6.0)
}

fn key_value(ui: &mut egui::Ui, key: &str, value: impl Into<String>, color: egui::Color32) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(key).color(LABEL).size(9.0));
        ui.label(egui::RichText::new(value.into()).color(color).size(9.0).monospace());
    });
}

fn render_connection_section(ui: &mut egui::Ui, state: &MonitorState, backend_url: &str) {
    theme::section_label(ui, "CONN");
    ui.add_space(2.0);

    ui.horizontal(|ui| {
        let (icon, text, color) = match (state.connected, state.stats.total) {
            (true, _) => ("●", "CONNECTED", egui::Color32::from_rgb(100, 255, 100)),
            (false, 0) => ("◐", "CONNECTING", egui::Color32::from_rgb(255, 200, 100)),
            (false, _) => ("○", "DISCONNECTED", LABEL),
        };
        ui.label(egui::RichText::new(icon).color(color).size(10.0));
        ui.label(egui::RichText::new(text).color(color).size(10.0).monospace().strong());
    });

    ui.label(egui::RichText::new(backend_url).color(VALUE).size(8.0).monospace());

    if let Some(last) = state.stats.last_success_at {
        let ago = (Utc::now() - last).num_seconds().max(0).unsigned_abs();
        key_value(ui, "Last reply:", format!("{} ago", format_duration(ago)), VALUE);
    }

    if state.resetting {
        key_value(ui, "Reset:", "in progress", egui::Color32::from_rgb(255, 200, 100));
    }
}

fn render_polling_section(ui: &mut egui::Ui, state: &MonitorState) {
    let stats = &state.stats;
    theme::section_label(ui, "POLLING");
    ui.add_space(3.0);

    key_value(ui, "Polls:", format!("{} total / {} failed", stats.total, stats.failed), VALUE);

    if let Some(latency) = stats.last_latency {
        let ms = latency.as_secs_f64() * 1000.0;
        let color = if ms < 100.0 {
            egui::Color32::from_rgb(100, 255, 100)
        } else if ms < 500.0 {
            egui::Color32::from_rgb(255, 200, 100)
        } else {
            egui::Color32::from_rgb(255, 100, 100)
        };
        key_value(ui, "Latency:", format!("{ms:.1} ms"), color);
    }

    if let Some(error) = &stats.last_error {
        key_value(ui, "Last error:", truncate(error, MAX_MESSAGE_CHARS), egui::Color32::from_rgb(255, 100, 100));
    }

    if stats.latency_history.len() >= 2 {
        let points: PlotPoints = stats
            .latency_history
            .iter()
            .enumerate()
            .map(|(i, ms)| [i as f64, *ms])
            .collect();

        Plot::new("poll_latency")
            .height(60.0)
            .show_axes([false, true])
            .show_grid(false)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .include_y(0.0)
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new("latency ms", points).color(egui::Color32::from_rgb(100, 220, 220)));
            });
    }
}

fn render_diagnostics_section(ui: &mut egui::Ui, diagnostics: &DiagnosticsLog) {
    theme::section_label(ui, &format!("DIAGNOSTICS ({})", diagnostics.len()));
    ui.add_space(3.0);

    if diagnostics.is_empty() {
        ui.label(egui::RichText::new("No messages").color(egui::Color32::from_rgb(100, 100, 100)).size(8.0).italics());
        return;
    }

    // Roughly 14px per line, six lines visible
    egui::ScrollArea::vertical()
        .id_salt("diagnostics_scroll")
        .max_height(14.0 * 6.0)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for diagnostic in diagnostics.iter().rev() {
                ui.horizontal(|ui| {
                    let (icon, color) = match diagnostic.level {
                        DiagnosticLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 180, 255)),
                        DiagnosticLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 200, 100)),
                        DiagnosticLevel::Error => ("✕", egui::Color32::from_rgb(255, 100, 100)),
                    };
                    ui.label(egui::RichText::new(icon).color(color).size(9.0));

                    let time_str = diagnostic.timestamp.format("%H:%M:%S").to_string();
                    ui.label(egui::RichText::new(time_str).color(egui::Color32::from_rgb(100, 100, 100)).size(8.0).monospace());

                    ui.label(egui::RichText::new(truncate(&diagnostic.message, MAX_MESSAGE_CHARS)).color(VALUE).size(8.0))
                        .on_hover_text(&diagnostic.message);
                });
            }
        });
}

/// Shorten to `max_chars` characters, respecting char boundaries.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(61), "1m 1s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
