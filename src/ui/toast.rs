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

//! Transient notifications stacked in the bottom-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use adherence_client::{Notification, NotificationVariant};
use uuid::Uuid;

use super::theme;

pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);
pub const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: Uuid,
    pub notification: Notification,
    pub shown_at: Instant,
}

#[derive(Debug)]
pub struct Toasts {
    queue: VecDeque<Toast>,
    lifetime: Duration,
    max_visible: usize,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(TOAST_LIFETIME, MAX_TOASTS)
    }
}

impl Toasts {
    #[must_use]
    pub fn new(lifetime: Duration, max_visible: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_visible),
            lifetime,
            max_visible,
        }
    }

    /// Show a notification, evicting the oldest when the stack is full.
    pub fn push(&mut self, notification: Notification) -> Uuid {
        let id = Uuid::new_v4();
        self.queue.push_back(Toast {
            id,
            notification,
            shown_at: Instant::now(),
        });
        while self.queue.len() > self.max_visible {
            self.queue.pop_front();
        }
        id
    }

    pub fn dismiss(&mut self, id: Uuid) {
        self.queue.retain(|toast| toast.id != id);
    }

    /// Drop toasts older than their lifetime as of `now`.
    pub fn expire(&mut self, now: Instant) {
        let lifetime = self.lifetime;
        self.queue
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < lifetime);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Draw the stack and schedule a repaint for the next expiry.
    pub fn render(&mut self, ctx: &egui::Context) {
        self.expire(Instant::now());
        if self.queue.is_empty() {
            return;
        }

        let mut dismissed = None;

        egui::Area::new(egui::Id::new("toast_stack"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.set_width(300.0);
                for toast in &self.queue {
                    let accent = match toast.notification.variant {
                        NotificationVariant::Default => theme::PRIMARY,
                        NotificationVariant::Destructive => theme::DESTRUCTIVE,
                    };

                    egui::Frame::window(ui.style())
                        .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, 240))
                        .stroke(egui::Stroke::new(1.0, accent))
                        .corner_radius(6.0)
                        .show(ui, |ui| {
                            ui.set_width(280.0);
                            ui.horizontal(|ui| {
                                ui.label(
                                    egui::RichText::new(&toast.notification.title)
                                        .color(accent)
                                        .strong(),
                                );
                                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                    if ui.small_button("✕").clicked() {
                                        dismissed = Some(toast.id);
                                    }
                                });
                            });
                            ui.label(
                                egui::RichText::new(&toast.notification.description)
                                    .color(theme::TEXT)
                                    .size(12.0),
                            );
                        });
                    ui.add_space(6.0);
                }
            });

        if let Some(id) = dismissed {
            self.dismiss(id);
        }

        if let Some(oldest) = self.queue.front() {
            let remaining = self.lifetime.saturating_sub(oldest.shown_at.elapsed());
            ctx.request_repaint_after(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_is_bounded() {
        let mut toasts = Toasts::default();
        for i in 0..7 {
            toasts.push(Notification::new(format!("t{i}"), ""));
        }
        assert_eq!(toasts.len(), MAX_TOASTS);
        let titles: Vec<_> = toasts.iter().map(|t| t.notification.title.as_str()).collect();
        assert_eq!(titles, ["t2", "t3", "t4", "t5", "t6"]);
    }

    #[test]
    fn test_toasts_expire() {
        let mut toasts = Toasts::default();
        toasts.push(Notification::connected());
        let shown_at = toasts.iter().next().unwrap().shown_at;

        toasts.expire(shown_at + Duration::from_secs(4));
        assert_eq!(toasts.len(), 1);

        toasts.expire(shown_at + TOAST_LIFETIME);
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_dismiss() {
        let mut toasts = Toasts::default();
        let keep = toasts.push(Notification::connected());
        let drop = toasts.push(Notification::connection_lost());
        toasts.dismiss(drop);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts.iter().next().unwrap().id, keep);
    }
}
