//! Structural validation and collision detection over parsed decision records.
//!
//! Validation runs over every record. Collision passes only look at ACTIVE
//! records: identical normalized keys form exact-duplicate clusters, and
//! high token overlap inside a comparable domain becomes a gated
//! near-duplicate proposal. Nothing here decides what to change.

use crate::core::record::{DEFAULT_DOMAIN, DecisionRecord, Status};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.65;

pub const NEAR_DUPLICATE_RECOMMENDATION: &str = "Merge into one canonical ACTIVE decision and SUPERSEDE the other(s). Requires owner approval.";

/// A must-fix structural problem with a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Issue {
    MissingFields {
        key: String,
        domain: String,
        missing: Vec<String>,
        lines: [usize; 2],
    },
    InvalidStatus {
        key: String,
        domain: String,
        status: String,
        lines: [usize; 2],
    },
    /// SUPERSEDED without a `Superseded by:` pointer.
    MissingSupersededBy {
        key: String,
        domain: String,
        lines: [usize; 2],
    },
}

impl Issue {
    pub fn kind(&self) -> &'static str {
        match self {
            Issue::MissingFields { .. } => "missing_fields",
            Issue::InvalidStatus { .. } => "invalid_status",
            Issue::MissingSupersededBy { .. } => "missing_superseded_by",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Issue::MissingFields { key, .. }
            | Issue::InvalidStatus { key, .. }
            | Issue::MissingSupersededBy { key, .. } => key,
        }
    }
}

/// ACTIVE records sharing one normalized key. `members` index the record
/// slice handed to [`detect_collisions`], in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCluster {
    pub key: String,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    NearDuplicateActive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearDuplicateProposal {
    #[serde(rename = "type")]
    pub kind: ProposalKind,
    pub a_key: String,
    pub b_key: String,
    pub domain: String,
    pub similarity: f64,
    pub recommendation: String,
}

/// An ACTIVE advisory record echoing a canonical ACTIVE record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryOverlap {
    pub canonical_key: String,
    pub advisory_key: String,
    pub advisory_source: String,
    pub advisory_lines: [usize; 2],
    pub exact: bool,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Findings {
    pub issues: Vec<Issue>,
    pub clusters: Vec<DuplicateCluster>,
    pub near_duplicates: Vec<NearDuplicateProposal>,
}

/// Intersection over union of token sets; 0 when both are empty.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: FxHashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: FxHashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `unknown` acts as a wildcard; explicit domains must match.
pub fn domains_comparable(a: &str, b: &str) -> bool {
    a == b || a == DEFAULT_DOMAIN || b == DEFAULT_DOMAIN
}

fn effective_domain<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a != DEFAULT_DOMAIN { a } else { b }
}

fn lines_of(record: &DecisionRecord) -> [usize; 2] {
    [record.span.line_start, record.span.line_end]
}

pub fn validate_record(record: &DecisionRecord) -> Vec<Issue> {
    let mut issues = Vec::new();

    let missing = record.missing_fields();
    if !missing.is_empty() {
        issues.push(Issue::MissingFields {
            key: record.key.clone(),
            domain: record.domain.clone(),
            missing: missing.into_iter().map(str::to_string).collect(),
            lines: lines_of(record),
        });
    }

    if let Status::Invalid(status) = &record.status {
        issues.push(Issue::InvalidStatus {
            key: record.key.clone(),
            domain: record.domain.clone(),
            status: status.clone(),
            lines: lines_of(record),
        });
    }

    if record.status == Status::Superseded && record.superseded_by.is_none() {
        issues.push(Issue::MissingSupersededBy {
            key: record.key.clone(),
            domain: record.domain.clone(),
            lines: lines_of(record),
        });
    }

    issues
}

/// Groups ACTIVE records by key; clusters appear in order of their first member.
pub fn exact_duplicate_clusters(records: &[DecisionRecord]) -> Vec<DuplicateCluster> {
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut clusters: Vec<DuplicateCluster> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if !record.status.is_active() {
            continue;
        }
        match index.get(record.key.as_str()) {
            Some(&slot) => clusters[slot].members.push(i),
            None => {
                index.insert(record.key.as_str(), clusters.len());
                clusters.push(DuplicateCluster {
                    key: record.key.clone(),
                    members: vec![i],
                });
            }
        }
    }

    clusters.retain(|c| c.members.len() >= 2);
    clusters
}

pub fn near_duplicate_proposals(
    records: &[DecisionRecord],
    threshold: f64,
) -> Vec<NearDuplicateProposal> {
    let active: Vec<(&DecisionRecord, Vec<String>)> = records
        .iter()
        .filter(|r| r.status.is_active())
        .map(|r| (r, r.tokens()))
        .collect();

    let mut proposals = Vec::new();
    for (i, (a, a_tokens)) in active.iter().enumerate() {
        for (b, b_tokens) in active.iter().skip(i + 1) {
            if a.key == b.key || !domains_comparable(&a.domain, &b.domain) {
                continue;
            }
            let similarity = jaccard(a_tokens, b_tokens);
            if similarity >= threshold {
                proposals.push(NearDuplicateProposal {
                    kind: ProposalKind::NearDuplicateActive,
                    a_key: a.key.clone(),
                    b_key: b.key.clone(),
                    domain: effective_domain(&a.domain, &b.domain).to_string(),
                    similarity: round2(similarity),
                    recommendation: NEAR_DUPLICATE_RECOMMENDATION.to_string(),
                });
            }
        }
    }
    proposals
}

pub fn detect_collisions(records: &[DecisionRecord], threshold: f64) -> Findings {
    let findings = Findings {
        issues: records.iter().flat_map(validate_record).collect(),
        clusters: exact_duplicate_clusters(records),
        near_duplicates: near_duplicate_proposals(records, threshold),
    };
    tracing::debug!(
        issues = findings.issues.len(),
        clusters = findings.clusters.len(),
        near_duplicates = findings.near_duplicates.len(),
        "collision detection complete"
    );
    findings
}

/// Cross-references ACTIVE advisory records against ACTIVE canonical ones.
/// Advisory matches are context for the operator, never actions.
pub fn detect_advisory_overlaps(
    canonical: &[DecisionRecord],
    advisory: &[DecisionRecord],
    threshold: f64,
) -> Vec<AdvisoryOverlap> {
    let canonical_active: Vec<(&DecisionRecord, Vec<String>)> = canonical
        .iter()
        .filter(|r| r.status.is_active())
        .map(|r| (r, r.tokens()))
        .collect();

    let mut overlaps = Vec::new();
    for adv in advisory.iter().filter(|r| r.status.is_active()) {
        let adv_tokens = adv.tokens();
        for (canon, canon_tokens) in &canonical_active {
            if !domains_comparable(&canon.domain, &adv.domain) {
                continue;
            }
            let exact = canon.key == adv.key;
            let similarity = if exact {
                1.0
            } else {
                jaccard(canon_tokens, &adv_tokens)
            };
            if exact || similarity >= threshold {
                overlaps.push(AdvisoryOverlap {
                    canonical_key: canon.key.clone(),
                    advisory_key: adv.key.clone(),
                    advisory_source: adv.source.clone(),
                    advisory_lines: lines_of(adv),
                    exact,
                    similarity: round2(similarity),
                });
            }
        }
    }
    overlaps
}
