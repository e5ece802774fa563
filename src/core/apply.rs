//! Scan and apply orchestration.
//!
//! Both modes read the canonical document once at the start of the run and
//! derive everything from that snapshot. `scan` never mutates; `apply`
//! substitutes safe-action blocks into the same snapshot and writes the
//! canonical document back only when at least one replacement landed.
//! No locking is performed: concurrent runs against one document can race
//! on the final write.

use crate::core::collision::{AdvisoryOverlap, detect_advisory_overlaps, detect_collisions};
use crate::core::config::ResolveConfig;
use crate::core::draft::{
    DraftMeta, DraftSummary, ResolutionDraft, WrittenArtifacts, render_markdown, write_artifacts,
};
use crate::core::error::ResolveError;
use crate::core::patch::{Patch, build_patch};
use crate::core::plan::{ResolutionPlan, plan_resolution};
use crate::core::record::{DecisionRecord, SkippedFragment, parse_decisions, parse_ledger};
use crate::core::telemetry::{RunCounts, TelemetryEvent, append_event};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Token that must be supplied verbatim to act on gated proposals.
pub const APPROVAL_PHRASE: &str = "APPROVE STRUCTURAL CHANGE: DECISION-RESOLVE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Scan,
    Apply,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Scan => "scan",
            Mode::Apply => "apply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    NotSupplied,
    /// Token supplied but not equal to [`APPROVAL_PHRASE`]; nothing gated runs.
    Rejected,
    /// Token matched. No gated actions are selectable yet, so nothing merges.
    Acknowledged,
}

/// Surrounding whitespace is ignored; an all-whitespace token counts as absent.
pub fn check_approval(token: Option<&str>) -> ApprovalOutcome {
    match token.map(str::trim) {
        None => ApprovalOutcome::NotSupplied,
        Some(t) if t.is_empty() => ApprovalOutcome::NotSupplied,
        Some(t) if t == APPROVAL_PHRASE => ApprovalOutcome::Acknowledged,
        Some(_) => ApprovalOutcome::Rejected,
    }
}

/// Read-only advisory text with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub label: String,
    pub text: String,
}

/// Everything derived from one canonical snapshot.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub records: Vec<DecisionRecord>,
    pub skipped: Vec<SkippedFragment>,
    pub plan: ResolutionPlan,
    pub advisory_decisions: usize,
    pub advisory_overlaps: Vec<AdvisoryOverlap>,
}

impl Analysis {
    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_active()).count()
    }
}

pub fn analyze(
    canonical_text: &str,
    canonical_label: &str,
    advisory: &[SourceText],
    threshold: f64,
) -> Analysis {
    let parsed = parse_ledger(canonical_text, canonical_label);
    let findings = detect_collisions(&parsed.records, threshold);
    let plan = plan_resolution(&parsed.records, &findings);

    let advisory_records: Vec<DecisionRecord> = advisory
        .iter()
        .flat_map(|src| parse_decisions(&src.text, &src.label))
        .collect();
    let advisory_overlaps = detect_advisory_overlaps(&parsed.records, &advisory_records, threshold);

    Analysis {
        records: parsed.records,
        skipped: parsed.skipped,
        plan,
        advisory_decisions: advisory_records.len(),
        advisory_overlaps,
    }
}

fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn build_draft(
    analysis: &Analysis,
    canonical_label: &str,
    canonical_text: &str,
    advisory: &[SourceText],
    threshold: f64,
    patch: &Patch,
) -> ResolutionDraft {
    let plan = &analysis.plan;
    ResolutionDraft {
        meta: DraftMeta {
            global_state_path: canonical_label.to_string(),
            global_state_digest: digest(canonical_text),
            advisory_sources: advisory.iter().map(|s| s.label.clone()).collect(),
            similarity_threshold: threshold,
        },
        summary: DraftSummary {
            global_decisions: analysis.records.len(),
            global_active: analysis.active_count(),
            issues: plan.issues.len(),
            safe_actions: plan.safe_actions.len(),
            gated: plan.gated.len(),
            advisory_decisions: analysis.advisory_decisions,
            advisory_overlaps: analysis.advisory_overlaps.len(),
            skipped_fragments: analysis.skipped.len(),
        },
        issues: plan.issues.clone(),
        safe_auto_actions: plan.safe_actions.clone(),
        gated: plan.gated.clone(),
        advisory_overlaps: analysis.advisory_overlaps.clone(),
        skipped_fragments: analysis.skipped.clone(),
        replacement_misses: patch.substitution.misses.clone(),
    }
}

/// Reads the canonical document. Missing and unreadable are distinct errors.
pub fn read_canonical(path: &Path) -> Result<String, ResolveError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(ResolveError::CanonicalNotFound(path.to_path_buf()))
        }
        Err(source) => Err(ResolveError::CanonicalUnreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads advisory documents; files that do not exist are skipped.
pub fn load_advisory(config: &ResolveConfig) -> Result<Vec<SourceText>, ResolveError> {
    let mut sources = Vec::new();
    for path in config.advisory_paths()? {
        match fs::read_to_string(&path) {
            Ok(text) => sources.push(SourceText {
                label: config.label_for(&path),
                text,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "advisory document missing; skipped");
            }
            Err(err) => return Err(ResolveError::IoError(err)),
        }
    }
    Ok(sources)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub draft: ResolutionDraft,
    pub artifacts: WrittenArtifacts,
    /// Replacements that landed in the canonical document (apply only).
    pub applied: usize,
    pub wrote_canonical: bool,
    pub approval: ApprovalOutcome,
}

impl RunReport {
    fn counts(&self) -> RunCounts {
        RunCounts {
            decisions: self.draft.summary.global_decisions,
            active: self.draft.summary.global_active,
            issues: self.draft.summary.issues,
            safe_actions: self.draft.summary.safe_actions,
            gated: self.draft.summary.gated,
            applied: self.applied,
            misses: self.draft.replacement_misses.len(),
        }
    }
}

/// Runs one scan or apply pass over the configured canonical document.
///
/// Only a missing/unreadable canonical document, bad configuration, or an
/// artifact write failure aborts the run. Validation issues, replacement
/// misses and approval mismatches are reported in the draft and the report.
pub fn run(
    config: &ResolveConfig,
    mode: Mode,
    approval_token: Option<&str>,
) -> Result<RunReport, ResolveError> {
    config.validate()?;

    let canonical_text = read_canonical(&config.global_state)?;
    let canonical_label = config.label_for(&config.global_state);
    let advisory = load_advisory(config)?;
    let threshold = config.similarity_threshold;

    let analysis = analyze(&canonical_text, &canonical_label, &advisory, threshold);
    let patch = build_patch(&canonical_text, &analysis.plan.replacements, &canonical_label);

    let mut applied = 0;
    let mut wrote_canonical = false;
    let mut approval = ApprovalOutcome::NotSupplied;

    if mode == Mode::Apply {
        if analysis.plan.replacements.is_empty() {
            tracing::info!("no safe duplicate ACTIVE collisions found");
        }
        applied = patch.substitution.applied;
        if applied > 0 {
            fs::write(&config.global_state, &patch.substitution.text)
                .map_err(ResolveError::IoError)?;
            wrote_canonical = true;
            tracing::info!(
                applied,
                path = %config.global_state.display(),
                "applied safe supersede edits"
            );
        }

        approval = check_approval(approval_token);
        match approval {
            ApprovalOutcome::Rejected => {
                tracing::warn!("approval token not recognized; gated changes not applied")
            }
            ApprovalOutcome::Acknowledged => tracing::info!(
                gated = analysis.plan.gated.len(),
                "approval recognized; no gated actions selected, proposals remain in draft"
            ),
            ApprovalOutcome::NotSupplied => {}
        }
    }

    let draft = build_draft(
        &analysis,
        &canonical_label,
        &canonical_text,
        &advisory,
        threshold,
        &patch,
    );
    let markdown = render_markdown(&draft, APPROVAL_PHRASE);
    let artifacts = write_artifacts(&config.workspace, &draft, &markdown, &patch.diff)?;

    let report = RunReport {
        mode,
        draft,
        artifacts,
        applied,
        wrote_canonical,
        approval,
    };

    if config.telemetry {
        let event = TelemetryEvent::new(&format!("decision_resolve.{}", mode.as_str()), report.counts());
        append_event(&config.workspace, &event)?;
    }

    Ok(report)
}
