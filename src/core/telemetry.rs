//! Local-only run telemetry.
//!
//! Appends one JSON line per run to `<workspace>/telemetry/metrics.jsonl`.
//! Events carry counts and timestamps only, never decision text.

use crate::core::error::ResolveError;
use crate::core::output::{new_event_id, now_epoch_z};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TELEMETRY_DIR: &str = "telemetry";
pub const METRICS_FILE: &str = "metrics.jsonl";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub decisions: usize,
    pub active: usize,
    pub issues: usize,
    pub safe_actions: usize,
    pub gated: usize,
    pub applied: usize,
    pub misses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub ts: String,
    pub event_id: String,
    pub event: String,
    pub crate_version: String,
    pub data: RunCounts,
}

impl TelemetryEvent {
    pub fn new(event: &str, data: RunCounts) -> Self {
        Self {
            ts: now_epoch_z(),
            event_id: new_event_id(),
            event: event.to_string(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            data,
        }
    }
}

pub fn metrics_path(workspace: &Path) -> PathBuf {
    workspace.join(TELEMETRY_DIR).join(METRICS_FILE)
}

pub fn append_event(workspace: &Path, event: &TelemetryEvent) -> Result<PathBuf, ResolveError> {
    let path = metrics_path(workspace);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ResolveError::IoError)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(ResolveError::IoError)?;

    let json = serde_json::to_string(event)?;
    writeln!(file, "{}", json).map_err(ResolveError::IoError)?;
    Ok(path)
}
