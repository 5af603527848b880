//! UI components for MedAdhere Desktop.
//!
//! One module per page plus the shared chrome: navigation bar, toasts and
//! the floating status pane.

pub mod dashboard;
pub mod history;
pub mod monitor;
pub mod navigation;
pub mod settings;
pub mod status_pane;
pub mod theme;
pub mod toast;

pub use history::HistoryAction;
pub use monitor::MonitorAction;
pub use navigation::Page;
pub use settings::{SettingsAction, SettingsView};
pub use status_pane::StatusPane;
pub use toast::Toasts;
