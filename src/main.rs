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

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod app;
mod config;
mod history;
mod status;
mod ui;
mod video;

use std::path::PathBuf;

use adherence_client::{Client, ClientConfig};
use clap::Parser;
use eframe::egui;
use log::{info, warn};

use app::MedAdhereApp;
use config::AppConfig;
use ui::Page;

const APP_TITLE: &str = "MedAdhere Desktop";

/// Desktop dashboard for the MedAdhere verification backend.
///
/// Flags override the saved settings for this run only.
#[derive(Parser, Debug)]
#[command(name = "medadhere-desktop", version, about)]
struct Args {
    /// Backend base URL, e.g. http://localhost:5000
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Delay between status polls in milliseconds
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Page to open at startup
    #[arg(long, value_enum)]
    page: Option<Page>,

    /// Folder holding the backend's adherence_log_*.json reports
    #[arg(long, value_name = "DIR")]
    reports: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.backend_url {
            config.backend_url.clone_from(url);
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(dir) = &self.reports {
            config.report_dir = Some(dir.clone());
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Ok(path) = AppConfig::get_config_path() {
        info!("Using config file {}", path.display());
    }
    args.apply(&mut config);
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("medadhere-worker")
        .build()?;
    let _guard = runtime.enter();

    let client = Client::spawn(ClientConfig {
        backend_url: config.backend_url.trim().to_string(),
        poll_interval: config.poll_interval(),
        ..ClientConfig::default()
    })?;

    info!("Starting {} against {}", APP_TITLE, config.backend_url);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 880.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title(APP_TITLE),
        ..Default::default()
    };

    let page = args.page.unwrap_or_default();
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(MedAdhereApp::new(cc, config, client, page)))),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "medadhere-desktop",
            "--backend-url",
            "http://10.0.0.9:5000",
            "--poll-interval-ms",
            "250",
            "--page",
            "monitor",
            "--reports",
            "/tmp/reports",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.backend_url, "http://10.0.0.9:5000");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.report_dir, Some(PathBuf::from("/tmp/reports")));
        assert_eq!(args.page, Some(Page::Monitor));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["medadhere-desktop"]).unwrap();
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config, AppConfig::default());
        assert_eq!(args.page, None);
    }

    #[test]
    fn test_rejects_unknown_page() {
        assert!(Args::try_parse_from(["medadhere-desktop", "--page", "map"]).is_err());
    }
}
