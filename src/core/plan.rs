//! Resolution planning: exact duplicates become safe supersede edits,
//! near-duplicates stay gated proposals, must-fix issues ride along.

use crate::core::collision::{DuplicateCluster, Findings, Issue, NearDuplicateProposal};
use crate::core::record::{
    DecisionRecord, FIELD_STATUS, FIELD_SUPERSEDED_BY, STATUS_SUPERSEDED,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AutoSupersedeDuplicateActive,
}

/// An exact-duplicate loser that can be superseded without review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub winner_key: String,
    pub loser_key: String,
    pub domain: String,
    pub loser_lines: [usize; 2],
}

/// Block-level substitution backing a [`SafeAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub loser_key: String,
    /// Byte offset of the original block in the scanned snapshot.
    pub position: usize,
    pub original: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    pub issues: Vec<Issue>,
    pub safe_actions: Vec<SafeAction>,
    pub replacements: Vec<Replacement>,
    pub gated: Vec<NearDuplicateProposal>,
}

/// Newest member of a cluster: greatest date string, later position on ties.
///
/// Dates are compared as plain strings, so mixed formats can misorder.
pub fn select_winner<'a>(
    records: &'a [DecisionRecord],
    cluster: &DuplicateCluster,
) -> Option<&'a DecisionRecord> {
    cluster
        .members
        .iter()
        .filter_map(|&i| records.get(i))
        .max_by(|a, b| {
            let a_date = a.date.as_deref().unwrap_or("");
            let b_date = b.date.as_deref().unwrap_or("");
            a_date
                .cmp(b_date)
                .then(a.span.start.cmp(&b.span.start))
        })
}

/// Rewrites a block to `Status: SUPERSEDED` pointing at `winner_key`.
///
/// Existing control lines are overwritten in place (indentation kept); absent
/// ones are inserted after the last non-blank line, using the block's line
/// ending. Every other line is left byte-for-byte intact.
pub fn supersede_block(block: &str, winner_key: &str) -> String {
    let mut saw_status = false;
    let mut saw_pointer = false;
    let eol = if block.contains("\r\n") { "\r" } else { "" };

    let mut lines: Vec<String> = block
        .split('\n')
        .map(|line| {
            let (body, cr) = match line.strip_suffix('\r') {
                Some(body) => (body, "\r"),
                None => (line, ""),
            };
            let trimmed = body.trim();
            let indent = &body[..body.len() - body.trim_start().len()];
            if trimmed.starts_with(FIELD_STATUS) {
                saw_status = true;
                format!("{}{} {}{}", indent, FIELD_STATUS, STATUS_SUPERSEDED, cr)
            } else if trimmed.starts_with(FIELD_SUPERSEDED_BY) {
                saw_pointer = true;
                format!("{}{} {}{}", indent, FIELD_SUPERSEDED_BY, winner_key, cr)
            } else {
                line.to_string()
            }
        })
        .collect();

    let mut insert_at = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(lines.len());
    if !saw_status {
        lines.insert(insert_at, format!("{} {}{}", FIELD_STATUS, STATUS_SUPERSEDED, eol));
        insert_at += 1;
    }
    if !saw_pointer {
        lines.insert(insert_at, format!("{} {}{}", FIELD_SUPERSEDED_BY, winner_key, eol));
    }

    lines.join("\n")
}

/// Safe actions and their block replacements for every exact-duplicate cluster.
pub fn plan_duplicate_resolution(
    records: &[DecisionRecord],
    clusters: &[DuplicateCluster],
) -> (Vec<SafeAction>, Vec<Replacement>) {
    let mut actions = Vec::new();
    let mut replacements = Vec::new();

    for cluster in clusters {
        let Some(winner) = select_winner(records, cluster) else {
            continue;
        };
        for loser in cluster
            .members
            .iter()
            .filter_map(|&i| records.get(i))
            .filter(|r| r.span.start != winner.span.start)
        {
            actions.push(SafeAction {
                kind: ActionKind::AutoSupersedeDuplicateActive,
                winner_key: winner.key.clone(),
                loser_key: loser.key.clone(),
                domain: loser.domain.clone(),
                loser_lines: [loser.span.line_start, loser.span.line_end],
            });
            replacements.push(Replacement {
                loser_key: loser.key.clone(),
                position: loser.span.start,
                original: loser.block.clone(),
                replacement: supersede_block(&loser.block, &winner.key),
            });
        }
    }

    (actions, replacements)
}

/// Issues and gated proposals pass through untouched; they never block the
/// safe-action computation.
pub fn plan_resolution(records: &[DecisionRecord], findings: &Findings) -> ResolutionPlan {
    let (safe_actions, replacements) = plan_duplicate_resolution(records, &findings.clusters);
    ResolutionPlan {
        issues: findings.issues.clone(),
        safe_actions,
        replacements,
        gated: findings.near_duplicates.clone(),
    }
}
