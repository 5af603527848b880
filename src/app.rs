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

use std::path::Path;

use adherence_client::{Client, MonitorEvent, MonitorState, Notification};
use log::{error, info, warn};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::config::AppConfig;
use crate::history::{self, SessionRecord};
use crate::status::DiagnosticsLog;
use crate::ui::{
    dashboard, monitor, navigation, HistoryAction, MonitorAction, Page, SettingsAction, SettingsView, StatusPane,
    Toasts,
};
use crate::video::LiveFeed;

const PAGE_MAX_WIDTH: f32 = 1100.0;

/// Where the history page's sessions came from.
fn sample_source_label() -> String {
    "Sample data (no report folder configured)".to_string()
}

pub struct MedAdhereApp {
    config: AppConfig,
    client: Client,
    events: broadcast::Receiver<MonitorEvent>,
    page: Page,
    toasts: Toasts,
    diagnostics: DiagnosticsLog,
    status_pane: StatusPane,
    settings: SettingsView,
    sessions: Vec<SessionRecord>,
    history_source: String,
    /// Open only while the monitor page is visible and the backend is up
    live_feed: Option<LiveFeed>,
}

impl std::fmt::Debug for MedAdhereApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedAdhereApp")
            .field("page", &self.page)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl MedAdhereApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig, client: Client, page: Page) -> Self {
        let events = client.subscribe();
        let mut diagnostics = DiagnosticsLog::default();
        diagnostics.info(format!("Polling {}", client.endpoints().status()));

        let mut app = Self {
            status_pane: StatusPane::new(config.show_status_pane),
            settings: SettingsView::new(&config),
            config,
            client,
            events,
            page,
            toasts: Toasts::default(),
            diagnostics,
            sessions: Vec::new(),
            history_source: String::new(),
            live_feed: None,
        };
        app.reload_history();
        app
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("UI fell behind, {} monitor events dropped", skipped);
                    self.diagnostics.warning(format!("{skipped} events dropped"));
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn handle_event(&mut self, event: MonitorEvent) {
        self.diagnostics.record_event(&event);

        match event {
            MonitorEvent::Notify(notification) => {
                self.toasts.push(notification);
            }
            MonitorEvent::SessionEnded { status, passed } => {
                let alerts = &self.config.notifications;
                if passed && alerts.session_alerts {
                    self.toasts.push(Notification::new("Session Complete", format!("Protocol finished: {status}")));
                } else if !passed && alerts.failure_alerts {
                    self.toasts
                        .push(Notification::destructive("Session Failed", format!("Protocol ended: {status}")));
                }
                // The backend writes a report when a session ends
                if self.config.report_dir.is_some() {
                    self.reload_history();
                }
            }
            MonitorEvent::ConnectionTest { url, outcome } => {
                self.settings.connection_tested(&url, outcome);
            }
            MonitorEvent::ConnectionChanged { .. } => {}
        }
    }

    fn reload_history(&mut self) {
        let Some(dir) = self.config.report_dir.clone() else {
            self.sessions = history::sample_sessions();
            self.history_source = sample_source_label();
            return;
        };

        match history::load_reports(&dir) {
            Ok(sessions) => {
                self.history_source = format!("Reports from {}", dir.display());
                self.sessions = sessions;
            }
            Err(e) => {
                warn!("Failed to load reports from {}: {}", dir.display(), e);
                self.diagnostics.error(format!("Reports unavailable: {e}"));
                self.toasts.push(Notification::destructive(
                    "History Unavailable",
                    format!("Could not read {}", dir.display()),
                ));
                self.sessions = history::sample_sessions();
                self.history_source = sample_source_label();
            }
        }
    }

    fn export_history(&mut self, path: &Path) {
        match history::export_csv(&self.sessions, path) {
            Ok(()) => {
                info!("Exported session history to {}", path.display());
                self.toasts.push(Notification::new("Export Complete", path.display().to_string()));
            }
            Err(e) => {
                error!("Failed to export session history: {}", e);
                self.toasts.push(Notification::destructive("Export Failed", e.to_string()));
            }
        }
    }

    fn apply_settings(&mut self, config: AppConfig) {
        let target_changed = config.poll_target() != self.config.poll_target();
        self.config = config;

        match self.config.save() {
            Ok(()) => {
                info!("Settings saved");
                self.toasts.push(Notification::new("Settings Saved", "Your preferences have been updated"));
            }
            Err(e) => {
                error!("Failed to save settings: {}", e);
                self.toasts.push(Notification::destructive("Settings Not Saved", e.to_string()));
            }
        }

        if target_changed {
            self.client.set_target(self.config.poll_target());
            self.live_feed = None;
            self.diagnostics.info(format!("Polling {}", self.client.endpoints().status()));
        }

        self.settings.reload(&self.config);
        self.reload_history();
    }

    fn handle_monitor_action(&mut self, action: MonitorAction) {
        match action {
            MonitorAction::Reset => self.client.request_reset(),
            MonitorAction::OpenFeedInBrowser => {
                let url = self.client.endpoints().video_feed();
                if let Err(e) = webbrowser::open(&url) {
                    warn!("Failed to open {} in browser: {}", url, e);
                    self.diagnostics.error(format!("Could not open browser: {e}"));
                }
            }
        }
    }

    fn handle_settings_action(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::Save(config) => self.apply_settings(config),
            SettingsAction::TestConnection(url) => {
                self.diagnostics.info(format!("Testing connection to {url}"));
                self.client.test_connection(url);
            }
        }
    }

    fn handle_history_action(&mut self, action: HistoryAction) {
        match action {
            HistoryAction::Reload => self.reload_history(),
            HistoryAction::Export(path) => self.export_history(&path),
        }
    }

    /// Open or close the video feed to match the page and connection.
    fn sync_live_feed(&mut self, ctx: &egui::Context, state: &MonitorState) {
        let wanted = self.page == Page::Monitor && state.connected;
        match (wanted, self.live_feed.is_some()) {
            (true, false) => {
                let feed = LiveFeed::start(&self.client, ctx.clone());
                info!("Showing video feed from {}", feed.url());
                self.live_feed = Some(feed);
            }
            (false, true) => self.live_feed = None,
            _ => {}
        }
    }

    fn sync_status_pane_preference(&mut self) {
        if self.status_pane.visible == self.config.show_status_pane {
            return;
        }
        self.config.show_status_pane = self.status_pane.visible;
        if let Err(e) = self.config.save() {
            warn!("Failed to persist status pane visibility: {}", e);
        }
    }
}

impl eframe::App for MedAdhereApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        let state = self.client.state();
        navigation::render(ctx, &mut self.page, &state);
        self.sync_live_feed(ctx, &state);

        let mut navigate = None;
        let mut monitor_action = None;
        let mut history_action = None;
        let mut settings_action = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                ui.set_max_width(PAGE_MAX_WIDTH);
                ui.add_space(12.0);
                match self.page {
                    Page::Dashboard => navigate = dashboard::render(ui, &self.sessions),
                    Page::Monitor => {
                        monitor_action =
                            monitor::render(ui, &state, &self.config.backend_url, self.live_feed.as_mut());
                    }
                    Page::History => {
                        history_action = crate::ui::history::render(ui, &self.sessions, &self.history_source);
                    }
                    Page::Settings => settings_action = self.settings.render(ui),
                }
                ui.add_space(24.0);
            });
        });

        if let Some(page) = navigate {
            self.page = page;
        }
        if let Some(action) = monitor_action {
            self.handle_monitor_action(action);
        }
        if let Some(action) = history_action {
            self.handle_history_action(action);
        }
        if let Some(action) = settings_action {
            self.handle_settings_action(action);
        }

        self.status_pane
            .render(ctx, &state, &self.config.backend_url, &self.diagnostics);
        self.sync_status_pane_preference();

        self.toasts.render(ctx);

        // Poll results land off the UI thread; wake up to show them
        ctx.request_repaint_after(self.config.poll_interval());
    }
}
