//! Decision record extraction from ledger text.
//!
//! A block opens at the literal `[DECISION]` marker and runs until the next
//! newline that is immediately followed by `[`, or until end of text. Inside a
//! block, fields are `Prefix: value` lines; the first line carrying a prefix
//! wins and later repeats are ignored.
//!
//! Records carry no identity beyond their content: the normalized key is a
//! hash of the stopword-filtered decision text, so the same decision written
//! with different casing, spacing or punctuation lands on the same key.

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

pub const BLOCK_MARKER: &str = "[DECISION]";

pub const FIELD_DECISION: &str = "Decision:";
pub const FIELD_APPROVED_BY: &str = "Approved by:";
pub const FIELD_DATE: &str = "Date:";
pub const FIELD_STATUS: &str = "Status:";
pub const FIELD_DOMAIN: &str = "Domain:";
pub const FIELD_SUPERSEDED_BY: &str = "Superseded by:";

/// Fields every decision block must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 4] = [FIELD_DECISION, FIELD_APPROVED_BY, FIELD_DATE, FIELD_STATUS];

const KNOWN_FIELDS: [&str; 6] = [
    FIELD_DECISION,
    FIELD_APPROVED_BY,
    FIELD_DATE,
    FIELD_STATUS,
    FIELD_DOMAIN,
    FIELD_SUPERSEDED_BY,
];

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_SUPERSEDED: &str = "SUPERSEDED";
pub const DEFAULT_DOMAIN: &str = "unknown";

const KEY_HEX_LEN: usize = 10;

const STOPWORDS: [&str; 21] = [
    "the", "a", "an", "to", "of", "and", "or", "for", "in", "on", "at", "with", "we", "our", "is",
    "are", "be", "this", "that", "it", "as",
];

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]+").expect("static regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lifecycle state of a decision as written in its `Status:` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Superseded,
    /// Present but not one of the two canonical values (already upper-cased).
    Invalid(String),
    Missing,
}

impl Status {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_uppercase()) {
            None => Status::Missing,
            Some(s) if s.is_empty() => Status::Missing,
            Some(s) if s == STATUS_ACTIVE => Status::Active,
            Some(s) if s == STATUS_SUPERSEDED => Status::Superseded,
            Some(s) => Status::Invalid(s),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Active => STATUS_ACTIVE,
            Status::Superseded => STATUS_SUPERSEDED,
            Status::Invalid(s) => s,
            Status::Missing => "",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte range and 1-based line range of a block within its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRecord {
    pub source: String,
    pub block: String,
    pub decision: String,
    pub approved_by: Option<String>,
    pub date: Option<String>,
    pub status: Status,
    pub domain: String,
    pub superseded_by: Option<String>,
    pub key: String,
    pub key_norm: String,
    pub span: Span,
}

impl DecisionRecord {
    /// Mandatory field prefixes this record lacks, in `REQUIRED_FIELDS` order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| match *field {
                FIELD_DECISION => self.decision.is_empty(),
                FIELD_APPROVED_BY => self.approved_by.is_none(),
                FIELD_DATE => self.date.is_none(),
                FIELD_STATUS => self.status == Status::Missing,
                _ => false,
            })
            .collect()
    }

    /// Normalized decision tokens used for similarity scoring.
    pub fn tokens(&self) -> Vec<String> {
        tokens(&self.decision)
    }
}

/// A `[DECISION]`-delimited fragment that carried no recognizable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFragment {
    pub source: String,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLedger {
    pub records: Vec<DecisionRecord>,
    pub skipped: Vec<SkippedFragment>,
}

/// Lower-case, turn punctuation into spaces and collapse whitespace.
pub fn norm_text(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped = NON_ALNUM_RE.replace_all(&lowered, " ");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

pub fn tokens(s: &str) -> Vec<String> {
    norm_text(s)
        .split(' ')
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn short_hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..KEY_HEX_LEN].to_string()
}

/// Returns `(key, key_norm)` for a decision text. Never yields an empty key.
pub fn decision_key(decision: &str) -> (String, String) {
    let key_norm = tokens(decision).join(" ");
    let key = if key_norm.is_empty() {
        short_hash(&norm_text(decision))
    } else {
        short_hash(&key_norm)
    };
    (key, key_norm)
}

/// First line in `block` whose trimmed form starts with `prefix`.
pub fn extract_field<'a>(block: &'a str, prefix: &str) -> Option<&'a str> {
    block.lines().find_map(|line| {
        line.trim()
            .strip_prefix(prefix)
            .map(|value| value.trim())
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn has_known_field(block: &str) -> bool {
    block.lines().any(|line| {
        let trimmed = line.trim();
        KNOWN_FIELDS.iter().any(|field| trimmed.starts_with(field))
    })
}

/// Byte ranges of every `[DECISION]` block in document order.
fn block_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find(BLOCK_MARKER) {
        let start = cursor + rel;
        let body_start = start + BLOCK_MARKER.len();
        let end = text[body_start..]
            .find("\n[")
            .map(|i| body_start + i)
            .unwrap_or(text.len());
        ranges.push((start, end));
        cursor = end;
    }
    ranges
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

pub fn parse_ledger(text: &str, source: &str) -> ParsedLedger {
    let mut parsed = ParsedLedger::default();

    for (start, end) in block_ranges(text) {
        let block = &text[start..end];
        let line_start = line_of(text, start);
        let line_end = line_of(text, end);

        if !has_known_field(block) {
            parsed.skipped.push(SkippedFragment {
                source: source.to_string(),
                line_start,
                line_end,
            });
            continue;
        }

        let decision = extract_field(block, FIELD_DECISION).unwrap_or("").to_string();
        let domain = extract_field(block, FIELD_DOMAIN)
            .filter(|d| !d.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
        let (key, key_norm) = decision_key(&decision);

        parsed.records.push(DecisionRecord {
            source: source.to_string(),
            block: block.to_string(),
            approved_by: non_empty(extract_field(block, FIELD_APPROVED_BY)),
            date: non_empty(extract_field(block, FIELD_DATE)),
            status: Status::from_raw(extract_field(block, FIELD_STATUS)),
            domain,
            superseded_by: non_empty(extract_field(block, FIELD_SUPERSEDED_BY)),
            decision,
            key,
            key_norm,
            span: Span {
                start,
                end,
                line_start,
                line_end,
            },
        });
    }

    tracing::debug!(
        source,
        records = parsed.records.len(),
        skipped = parsed.skipped.len(),
        "parsed decision ledger"
    );
    parsed
}

/// Ordered decision records of `text`; malformed fragments are dropped.
pub fn parse_decisions(text: &str, source: &str) -> Vec<DecisionRecord> {
    parse_ledger(text, source).records
}
