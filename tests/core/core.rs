use decision_ledger::core::apply::{SourceText, analyze, build_draft};
use decision_ledger::core::collision::detect_collisions;
use decision_ledger::core::patch::{apply_replacements, build_patch};
use decision_ledger::core::plan::plan_resolution;
use decision_ledger::core::record::{Status, parse_decisions, parse_ledger};

const LABEL: &str = "GLOBAL-STATE.yaml";

fn block(decision: &str, date: &str, status: &str) -> String {
    format!(
        "[DECISION]\nDecision: {}\nApproved by: owner\nDate: {}\nStatus: {}\n",
        decision, date, status
    )
}

#[test]
fn pipeline_newer_date_wins_regardless_of_position() {
    let text = [
        block("Ship weekly releases", "2024-06-01", "ACTIVE"),
        block("ship weekly releases.", "2023-01-01", "ACTIVE"),
    ]
    .concat();

    let records = parse_decisions(&text, LABEL);
    let findings = detect_collisions(&records, 0.65);
    let plan = plan_resolution(&records, &findings);
    assert_eq!(plan.safe_actions.len(), 1);
    assert_eq!(plan.safe_actions[0].loser_lines, [6, 11]);

    let result = apply_replacements(&text, &plan.replacements);
    let updated = parse_decisions(&result.text, LABEL);
    assert_eq!(updated[0].status, Status::Active);
    assert_eq!(updated[1].status, Status::Superseded);
    assert_eq!(updated[1].superseded_by.as_deref(), Some(updated[0].key.as_str()));
}

#[test]
fn pipeline_cluster_of_three_supersedes_two() {
    let text = [
        block("Use Postgres for storage", "2024-01-01", "ACTIVE"),
        block("use postgres for storage", "2024-01-01", "ACTIVE"),
        block("USE POSTGRES FOR STORAGE!", "2024-01-01", "ACTIVE"),
    ]
    .concat();

    let analysis = analyze(&text, LABEL, &[], 0.65);
    assert_eq!(analysis.plan.safe_actions.len(), 2);

    let patch = build_patch(&text, &analysis.plan.replacements, LABEL);
    assert_eq!(patch.substitution.applied, 2);
    assert!(patch.substitution.misses.is_empty());

    let after = parse_decisions(&patch.substitution.text, LABEL);
    let statuses: Vec<&Status> = after.iter().map(|r| &r.status).collect();
    assert_eq!(
        statuses,
        vec![&Status::Superseded, &Status::Superseded, &Status::Active]
    );
    // Second pass over the patched text is a no-op.
    let again = analyze(&patch.substitution.text, LABEL, &[], 0.65);
    assert!(again.plan.safe_actions.is_empty());
    assert!(again.plan.issues.is_empty());
}

#[test]
fn pipeline_preserves_crlf_and_indentation() {
    let text = "[DECISION]\r\n  Decision: Adopt Rust\r\n  Approved by: a\r\n  Date: 1\r\n  Status: ACTIVE\r\n\
[DECISION]\r\nDecision: adopt rust\r\nApproved by: a\r\nDate: 2\r\nStatus: ACTIVE\r\n";

    let analysis = analyze(text, LABEL, &[], 0.65);
    let patch = build_patch(text, &analysis.plan.replacements, LABEL);
    let out = &patch.substitution.text;

    assert!(out.contains("  Status: SUPERSEDED\r\n"));
    assert!(out.contains(&format!("Superseded by: {}\r\n", analysis.records[1].key)));
    assert!(out.contains("  Decision: Adopt Rust\r\n  Approved by: a\r\n"));
    assert!(out.ends_with("[DECISION]\r\nDecision: adopt rust\r\nApproved by: a\r\nDate: 2\r\nStatus: ACTIVE\r\n"));
}

#[test]
fn pipeline_stale_replacement_is_a_miss_not_an_error() {
    let text = [
        block("Use Postgres for storage", "1", "ACTIVE"),
        block("use postgres for storage", "2", "ACTIVE"),
    ]
    .concat();
    let analysis = analyze(&text, LABEL, &[], 0.65);

    let edited = text.replace("Approved by: owner\nDate: 1", "Approved by: someone else\nDate: 1");
    let patch = build_patch(&edited, &analysis.plan.replacements, LABEL);
    assert_eq!(patch.substitution.applied, 0);
    assert_eq!(patch.substitution.misses.len(), 1);
    assert_eq!(patch.substitution.text, edited);
    assert!(patch.is_empty());
}

#[test]
fn pipeline_skips_fragments_without_fields() {
    let text = format!(
        "[DECISION]\njust prose, no fields\n{}",
        block("Adopt Rust", "1", "ACTIVE")
    );
    let parsed = parse_ledger(&text, LABEL);
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.skipped.len(), 1);
    assert_eq!(parsed.skipped[0].line_start, 1);
}

#[test]
fn draft_yaml_is_stable_and_ordered() {
    let text = [
        block("Use Postgres for storage", "1", "ACTIVE"),
        block("use postgres for storage", "2", "ACTIVE"),
        block("Retire the cron host", "3", "pending"),
    ]
    .concat();
    let advisory = vec![SourceText {
        label: "MEMORY.md".to_string(),
        text: block("Use postgres for storage", "9", "ACTIVE"),
    }];

    let analysis = analyze(&text, LABEL, &advisory, 0.65);
    let patch = build_patch(&text, &analysis.plan.replacements, LABEL);
    let draft = build_draft(&analysis, LABEL, &text, &advisory, 0.65, &patch);
    let yaml = draft.to_yaml().unwrap();

    let meta = yaml.find("meta:").unwrap();
    let summary = yaml.find("summary:").unwrap();
    let issues = yaml.find("issues:").unwrap();
    let safe = yaml.find("safe_auto_actions:").unwrap();
    assert!(meta < summary && summary < issues && issues < safe);
    assert!(yaml.contains("type: invalid_status"));
    assert!(yaml.contains("type: auto_supersede_duplicate_active"));
    assert!(!yaml.contains("replacement_misses"));

    let rebuilt = build_draft(&analysis, LABEL, &text, &advisory, 0.65, &patch);
    assert_eq!(rebuilt.to_yaml().unwrap(), yaml);
}
