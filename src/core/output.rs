//! Output helpers shared by the CLI surfaces.
//!
//! Bounded single-line previews for Markdown reports, the JSON command
//! envelope used by `--format json`, and colored operator status lines.

use colored::Colorize;
use serde::Serialize;
use ulid::Ulid;

pub const ENVELOPE_VERSION: &str = "1.0.0";

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Collapse newlines/extra whitespace and bound length for display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Standard response envelope; `result` fields are flattened next to the
/// envelope header.
#[derive(Debug, Serialize)]
pub struct CommandEnvelope<'a, T: Serialize> {
    pub envelope_version: &'static str,
    pub ts: String,
    pub event_id: String,
    pub cmd: &'a str,
    pub status: &'a str,
    #[serde(flatten)]
    pub result: T,
}

pub fn command_envelope<'a, T: Serialize>(
    cmd: &'a str,
    status: &'a str,
    result: T,
) -> CommandEnvelope<'a, T> {
    CommandEnvelope {
        envelope_version: ENVELOPE_VERSION,
        ts: now_epoch_z(),
        event_id: new_event_id(),
        cmd,
        status,
        result,
    }
}

pub fn print_ok(message: &str) {
    println!("{} {}", "✓".bright_green(), message);
}

pub fn print_warn(message: &str) {
    println!("{} {}", "⚠".bright_yellow(), message);
}

pub fn print_note(message: &str) {
    println!("{} {}", "▸".bright_cyan(), message);
}

pub fn print_fail(message: &str) {
    println!("{} {}", "✗".bright_red(), message);
}
