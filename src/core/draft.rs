//! Resolution draft: the reviewable snapshot of one run.
//!
//! The draft is rebuilt from scratch on every run and never merged with a
//! previous one. Field order is fixed by struct declaration order so the
//! YAML artifact diffs cleanly between runs; it carries no wall-clock time.

use crate::core::collision::{AdvisoryOverlap, Issue, NearDuplicateProposal};
use crate::core::error::ResolveError;
use crate::core::output::compact_line;
use crate::core::patch::ReplacementMiss;
use crate::core::plan::SafeAction;
use crate::core::record::SkippedFragment;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DRAFT_YAML_NAME: &str = "RESOLUTION-DRAFT.yaml";
pub const DRAFT_MD_NAME: &str = "RESOLUTION-DRAFT.md";
pub const PATCH_NAME: &str = "RESOLUTION-PATCH.diff";

const MD_VALUE_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftMeta {
    pub global_state_path: String,
    /// SHA-256 of the canonical text the draft was computed from.
    pub global_state_digest: String,
    pub advisory_sources: Vec<String>,
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DraftSummary {
    pub global_decisions: usize,
    pub global_active: usize,
    pub issues: usize,
    pub safe_actions: usize,
    pub gated: usize,
    pub advisory_decisions: usize,
    pub advisory_overlaps: usize,
    pub skipped_fragments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionDraft {
    pub meta: DraftMeta,
    pub summary: DraftSummary,
    pub issues: Vec<Issue>,
    pub safe_auto_actions: Vec<SafeAction>,
    pub gated: Vec<NearDuplicateProposal>,
    pub advisory_overlaps: Vec<AdvisoryOverlap>,
    pub skipped_fragments: Vec<SkippedFragment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replacement_misses: Vec<ReplacementMiss>,
}

impl ResolutionDraft {
    pub fn to_yaml(&self) -> Result<String, ResolveError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn issue_line(issue: &Issue) -> Vec<String> {
    match issue {
        Issue::MissingFields {
            key,
            domain,
            missing,
            lines,
        } => vec![
            format!(
                "- {} | key={} | domain={} | lines={:?}",
                issue.kind(),
                key,
                domain,
                lines
            ),
            format!("  - missing: {}", missing.join(", ")),
        ],
        Issue::InvalidStatus {
            key,
            domain,
            status,
            lines,
        } => vec![
            format!(
                "- {} | key={} | domain={} | lines={:?}",
                issue.kind(),
                key,
                domain,
                lines
            ),
            format!(
                "  - status: {} (must be ACTIVE or SUPERSEDED)",
                compact_line(status, MD_VALUE_MAX_CHARS)
            ),
        ],
        Issue::MissingSupersededBy { key, domain, lines } => vec![format!(
            "- {} | key={} | domain={} | lines={:?}",
            issue.kind(),
            key,
            domain,
            lines
        )],
    }
}

/// Human-readable rendering of the draft.
pub fn render_markdown(draft: &ResolutionDraft, approval_phrase: &str) -> String {
    let mut md = vec![
        "# Decision Resolution Draft".to_string(),
        String::new(),
        format!("- Global state: {}", draft.meta.global_state_path),
        format!("- Digest: {}", draft.meta.global_state_digest),
        format!("- Similarity threshold: {}", draft.meta.similarity_threshold),
        format!("- Global decisions: {}", draft.summary.global_decisions),
        format!("- Global ACTIVE: {}", draft.summary.global_active),
        format!("- Issues: {}", draft.summary.issues),
        format!("- Safe auto actions: {}", draft.summary.safe_actions),
        format!("- Gated proposals: {}", draft.summary.gated),
    ];
    if !draft.meta.advisory_sources.is_empty() {
        md.push(format!(
            "- Advisory sources: {} ({} decisions)",
            draft.meta.advisory_sources.join(", "),
            draft.summary.advisory_decisions
        ));
    }
    md.push(String::new());

    if !draft.issues.is_empty() {
        md.push("## Issues (must fix)".to_string());
        md.extend(draft.issues.iter().flat_map(issue_line));
        md.push(String::new());
    }

    if !draft.safe_auto_actions.is_empty() {
        md.push("## Safe auto actions (applyable without approval)".to_string());
        for action in &draft.safe_auto_actions {
            md.push(format!(
                "- auto_supersede_duplicate_active | winner={} | loser={} | domain={} | lines={:?}",
                action.winner_key, action.loser_key, action.domain, action.loser_lines
            ));
        }
        md.push(String::new());
    }

    if !draft.gated.is_empty() {
        md.push("## Gated proposals (require owner approval)".to_string());
        for proposal in &draft.gated {
            md.push(format!(
                "- near_duplicate_active | a={} | b={} | domain={} | similarity={:.2}",
                proposal.a_key, proposal.b_key, proposal.domain, proposal.similarity
            ));
            md.push(format!(
                "  - {}",
                compact_line(&proposal.recommendation, MD_VALUE_MAX_CHARS)
            ));
        }
        md.push(String::new());
    }

    if !draft.advisory_overlaps.is_empty() {
        md.push("## Advisory overlaps (context only)".to_string());
        for overlap in &draft.advisory_overlaps {
            md.push(format!(
                "- canonical={} | advisory={} ({} lines={:?}) | {} | similarity={:.2}",
                overlap.canonical_key,
                overlap.advisory_key,
                overlap.advisory_source,
                overlap.advisory_lines,
                if overlap.exact { "exact" } else { "near" },
                overlap.similarity
            ));
        }
        md.push(String::new());
    }

    if !draft.skipped_fragments.is_empty() {
        md.push("## Skipped fragments (no recognizable fields)".to_string());
        for fragment in &draft.skipped_fragments {
            md.push(format!(
                "- {} lines={:?}",
                fragment.source,
                [fragment.line_start, fragment.line_end]
            ));
        }
        md.push(String::new());
    }

    if !draft.replacement_misses.is_empty() {
        md.push("## Replacement misses (block moved or changed; not applied)".to_string());
        for miss in &draft.replacement_misses {
            md.push(format!("- loser={} | offset={}", miss.loser_key, miss.position));
        }
        md.push(String::new());
    }

    md.extend([
        "## Apply instructions".to_string(),
        String::new(),
        "1) Scan:".to_string(),
        "```bash".to_string(),
        "decision-ledger scan --workspace <workspace> --kit-dir .".to_string(),
        "```".to_string(),
        String::new(),
        "2) Apply safe auto fixes:".to_string(),
        "```bash".to_string(),
        "decision-ledger apply --workspace <workspace> --kit-dir .".to_string(),
        "```".to_string(),
        String::new(),
        "3) Acknowledge gated proposals (requires approval token):".to_string(),
        "```bash".to_string(),
        "decision-ledger apply --workspace <workspace> --kit-dir . \\".to_string(),
        format!("  --approve \"{}\"", approval_phrase),
        "```".to_string(),
    ]);

    md.join("\n") + "\n"
}

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenArtifacts {
    pub draft_yaml: PathBuf,
    pub draft_md: PathBuf,
    pub patch: Option<PathBuf>,
}

/// Writes the YAML and Markdown drafts, plus the patch when `diff` is
/// non-empty. Creates `workspace` if needed.
pub fn write_artifacts(
    workspace: &Path,
    draft: &ResolutionDraft,
    markdown: &str,
    diff: &str,
) -> Result<WrittenArtifacts, ResolveError> {
    fs::create_dir_all(workspace).map_err(ResolveError::IoError)?;

    let draft_yaml = workspace.join(DRAFT_YAML_NAME);
    fs::write(&draft_yaml, draft.to_yaml()?).map_err(ResolveError::IoError)?;

    let draft_md = workspace.join(DRAFT_MD_NAME);
    fs::write(&draft_md, markdown).map_err(ResolveError::IoError)?;

    let patch = if diff.trim().is_empty() {
        None
    } else {
        let path = workspace.join(PATCH_NAME);
        fs::write(&path, diff).map_err(ResolveError::IoError)?;
        Some(path)
    };

    Ok(WrittenArtifacts {
        draft_yaml,
        draft_md,
        patch,
    })
}
