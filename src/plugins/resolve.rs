//! `scan` / `apply` command surface for the decision collision resolver.
//!
//! Translates CLI flags into an explicit [`ResolveConfig`], runs the engine,
//! and reports the outcome as colored status lines or a JSON envelope.

use crate::core::apply::{self, APPROVAL_PHRASE, ApprovalOutcome, Mode, RunReport};
use crate::core::config::{DEFAULT_CONFIG_NAME, ResolveConfig, load_config_file};
use crate::core::draft::{DRAFT_MD_NAME, DRAFT_YAML_NAME, PATCH_NAME};
use crate::core::error::ResolveError;
use crate::core::output::{self, OutputFormat};
use std::path::PathBuf;

#[derive(clap::Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Workspace root where drafts, patch and telemetry are written.
    #[clap(long)]
    pub workspace: PathBuf,
    /// Kit directory containing GLOBAL-STATE.yaml and optional resolver.toml.
    #[clap(long, default_value = ".")]
    pub kit_dir: PathBuf,
    /// Path to the canonical ledger (defaults to <kit-dir>/GLOBAL-STATE.yaml).
    #[clap(long)]
    pub global_state: Option<PathBuf>,
    /// Additional read-only advisory document (repeatable).
    #[clap(long = "advisory")]
    pub advisory: Vec<PathBuf>,
    /// Also scan MEMORY.md and memory/*.md under the kit directory as advisory.
    #[clap(long)]
    pub include_memory: bool,
    /// Jaccard similarity threshold for near-duplicate proposals.
    #[clap(long)]
    pub similarity: Option<f64>,
    /// Config file (defaults to <kit-dir>/resolver.toml when present).
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Append a counts-only event to <workspace>/telemetry/metrics.jsonl.
    #[clap(long)]
    pub telemetry: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ApplyArgs {
    #[clap(flatten)]
    pub common: ResolveArgs,
    /// Approval token for gated proposals.
    #[clap(long)]
    pub approve: Option<String>,
}

/// Defaults, then config file, then flags.
pub fn build_config(args: &ResolveArgs) -> Result<ResolveConfig, ResolveError> {
    let mut config = ResolveConfig::new(&args.kit_dir, &args.workspace);

    let (config_path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (args.kit_dir.join(DEFAULT_CONFIG_NAME), false),
    };
    if let Some(file) = load_config_file(&config_path, required)? {
        tracing::debug!(path = %config_path.display(), "loaded resolver config");
        config = config.merge_file(file);
    }

    if let Some(path) = &args.global_state {
        config.global_state = path.clone();
    }
    config.advisory.extend(args.advisory.iter().cloned());
    if args.include_memory {
        config.include_memory = true;
    }
    if let Some(similarity) = args.similarity {
        config.similarity_threshold = similarity;
    }
    if args.telemetry {
        config.telemetry = true;
    }

    config.validate()?;
    Ok(config)
}

fn print_text_report(report: &RunReport) {
    let summary = &report.draft.summary;
    output::print_ok(&format!(
        "Wrote {} and {}",
        report.artifacts.draft_yaml.display(),
        report.artifacts.draft_md.display()
    ));
    if let Some(patch) = &report.artifacts.patch {
        output::print_ok(&format!("Wrote {} (safe auto fixes)", patch.display()));
    }
    output::print_note(&format!(
        "{} decisions ({} ACTIVE), {} issues, {} safe actions, {} gated proposals",
        summary.global_decisions,
        summary.global_active,
        summary.issues,
        summary.safe_actions,
        summary.gated
    ));

    if report.mode == Mode::Scan {
        return;
    }

    if report.wrote_canonical {
        output::print_ok(&format!(
            "Applied {} safe duplicate ACTIVE supersede edit(s) to {}",
            report.applied, report.draft.meta.global_state_path
        ));
    } else if summary.safe_actions == 0 {
        output::print_ok("No safe duplicate ACTIVE collisions found.");
    }
    for miss in &report.draft.replacement_misses {
        output::print_warn(&format!(
            "Block for {} no longer found; replacement skipped",
            miss.loser_key
        ));
    }

    match report.approval {
        ApprovalOutcome::Rejected => {
            output::print_warn("Approval token not recognized; gated changes not applied.")
        }
        ApprovalOutcome::Acknowledged => output::print_note(&format!(
            "Approval recognized. No gated actions selected in this version; proposals remain in {}.",
            DRAFT_MD_NAME
        )),
        ApprovalOutcome::NotSupplied => {}
    }
}

pub fn run_resolve_cli(
    mode: Mode,
    args: &ResolveArgs,
    approve: Option<&str>,
) -> Result<i32, ResolveError> {
    let config = build_config(args)?;
    let report = apply::run(&config, mode, approve)?;

    match args.format {
        OutputFormat::Json => {
            let status = match report.approval {
                ApprovalOutcome::Rejected => "approval_rejected",
                _ => "ok",
            };
            let envelope = output::command_envelope(mode.as_str(), status, &report);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => print_text_report(&report),
    }

    Ok(0)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "decision-ledger",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Decision collision resolver for a canonical decision ledger",
        "commands": [
            { "name": "scan", "description": "Detect collisions and write drafts; never mutates" },
            { "name": "apply", "description": "Apply safe exact-duplicate supersede edits to the canonical ledger" },
            { "name": "lint", "description": "Advisory lint over ledger-grammar files" },
            { "name": "schema", "description": "Print this schema" },
            { "name": "version", "description": "Print version" }
        ],
        "artifacts": [DRAFT_YAML_NAME, DRAFT_MD_NAME, PATCH_NAME],
        "approval_phrase": APPROVAL_PHRASE,
    })
}
