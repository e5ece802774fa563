//! Advisory decision linter.
//!
//! Checks any number of ledger-grammar files for blocks missing mandatory
//! fields and for ACTIVE decision lines repeated verbatim across or within
//! files. Read-only; the binary exits non-zero when findings exist.

use crate::core::config::{DEFAULT_CANONICAL_NAME, MEMORY_FILE_NAME};
use crate::core::error::ResolveError;
use crate::core::output::{self, OutputFormat};
use crate::core::record::{REQUIRED_FIELDS, decision_key, parse_ledger};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct LintCli {
    /// Files to lint (defaults to MEMORY.md and GLOBAL-STATE.yaml in the current directory).
    pub paths: Vec<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LintFinding {
    MissingFields {
        path: String,
        key: String,
        missing: Vec<String>,
        lines: [usize; 2],
    },
    RepeatedActive {
        decision: String,
        first_seen: String,
        path: String,
    },
}

impl LintFinding {
    pub fn message(&self) -> String {
        match self {
            LintFinding::MissingFields {
                path,
                missing,
                lines,
                ..
            } => format!(
                "{}: DECISION block at lines {}-{} missing fields: {}",
                path,
                lines[0],
                lines[1],
                missing.join(", ")
            ),
            LintFinding::RepeatedActive {
                decision,
                first_seen,
                path,
            } => format!(
                "ACTIVE decision appears multiple times: '{}' in {} and {}",
                output::compact_line(decision, 120),
                first_seen,
                path
            ),
        }
    }
}

/// Lints `paths` in order; paths that do not exist are skipped.
///
/// Field-less `[DECISION]` fragments count as blocks missing every mandatory
/// field. Findings within a file follow document order.
pub fn lint_paths(paths: &[PathBuf]) -> Result<Vec<LintFinding>, ResolveError> {
    let mut findings = Vec::new();
    let mut seen_active: FxHashMap<String, String> = FxHashMap::default();
    let (empty_key, _) = decision_key("");

    for path in paths {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(ResolveError::IoError(err)),
        };
        let label = path.to_string_lossy().into_owned();
        let parsed = parse_ledger(&text, &label);

        let mut file_findings: Vec<(usize, LintFinding)> = Vec::new();
        for fragment in &parsed.skipped {
            file_findings.push((
                fragment.line_start,
                LintFinding::MissingFields {
                    path: label.clone(),
                    key: empty_key.clone(),
                    missing: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
                    lines: [fragment.line_start, fragment.line_end],
                },
            ));
        }

        for record in &parsed.records {
            let missing = record.missing_fields();
            if !missing.is_empty() {
                file_findings.push((
                    record.span.line_start,
                    LintFinding::MissingFields {
                        path: label.clone(),
                        key: record.key.clone(),
                        missing: missing.into_iter().map(str::to_string).collect(),
                        lines: [record.span.line_start, record.span.line_end],
                    },
                ));
            }

            if record.status.is_active() && !record.decision.is_empty() {
                match seen_active.get(&record.decision) {
                    Some(first_seen) => file_findings.push((
                        record.span.line_start,
                        LintFinding::RepeatedActive {
                            decision: record.decision.clone(),
                            first_seen: first_seen.clone(),
                            path: label.clone(),
                        },
                    )),
                    None => {
                        seen_active.insert(record.decision.clone(), label.clone());
                    }
                }
            }
        }

        file_findings.sort_by_key(|(line, _)| *line);
        findings.extend(file_findings.into_iter().map(|(_, finding)| finding));
    }

    Ok(findings)
}

/// Returns the process exit code: 0 when clean, 1 when findings exist.
pub fn run_lint_cli(cli: LintCli) -> Result<i32, ResolveError> {
    let paths = if cli.paths.is_empty() {
        vec![
            PathBuf::from(MEMORY_FILE_NAME),
            PathBuf::from(DEFAULT_CANONICAL_NAME),
        ]
    } else {
        cli.paths
    };

    let findings = lint_paths(&paths)?;
    let code = if findings.is_empty() { 0 } else { 1 };

    match cli.format {
        OutputFormat::Json => {
            let status = if findings.is_empty() { "ok" } else { "issues" };
            let envelope = output::command_envelope(
                "lint",
                status,
                serde_json::json!({ "findings": findings }),
            );
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => {
            for finding in &findings {
                output::print_warn(&finding.message());
            }
            if findings.is_empty() {
                output::print_ok("Lint complete: no issues found.");
            } else {
                output::print_fail(&format!(
                    "Lint complete: {} issue(s) found.",
                    findings.len()
                ));
            }
        }
    }

    Ok(code)
}
