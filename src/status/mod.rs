//! Diagnostics shown in the status pane.
//!
//! Client events are turned into timestamped log lines here so the pane can
//! show what happened without reading the process log.

pub mod diagnostics;

pub use diagnostics::{DiagnosticLevel, DiagnosticMessage, DiagnosticsLog};
