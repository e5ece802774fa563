//! Content-addressed block substitution.
//!
//! Replacements are located by exact substring search in the current text
//! (first occurrence), never by cached offsets or line numbers, and applied
//! bottom-to-top. A block that can no longer be found is skipped on its own.

use crate::core::diff::unified_diff;
use crate::core::plan::Replacement;
use serde::Serialize;

/// A safe action whose original block text was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementMiss {
    pub loser_key: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionResult {
    pub text: String,
    pub applied: usize,
    pub misses: Vec<ReplacementMiss>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub label: String,
    pub substitution: SubstitutionResult,
    /// Unified diff of the canonical text; empty when nothing applied.
    pub diff: String,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.diff.trim().is_empty()
    }
}

/// Byte range of the first exact occurrence of `needle`.
pub fn locate_block(haystack: &str, needle: &str) -> Option<std::ops::Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    haystack.find(needle).map(|start| start..start + needle.len())
}

pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> SubstitutionResult {
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.position.cmp(&a.position));

    let mut current = text.to_string();
    let mut applied = 0;
    let mut misses = Vec::new();

    for replacement in ordered {
        match locate_block(&current, &replacement.original) {
            Some(range) => {
                current.replace_range(range, &replacement.replacement);
                applied += 1;
            }
            None => {
                tracing::warn!(
                    loser_key = %replacement.loser_key,
                    position = replacement.position,
                    "original block not found; replacement skipped"
                );
                misses.push(ReplacementMiss {
                    loser_key: replacement.loser_key.clone(),
                    position: replacement.position,
                });
            }
        }
    }

    SubstitutionResult {
        text: current,
        applied,
        misses,
    }
}

/// Substitutes every replacement into `text` and diffs the result.
pub fn build_patch(text: &str, replacements: &[Replacement], label: &str) -> Patch {
    let substitution = apply_replacements(text, replacements);
    let diff = if substitution.applied > 0 {
        unified_diff(text, &substitution.text, label, label)
    } else {
        String::new()
    };
    Patch {
        label: label.to_string(),
        substitution,
        diff,
    }
}
