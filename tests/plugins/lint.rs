use decision_ledger::plugins::lint::{LintFinding, lint_paths};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_clean_files_have_no_findings() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("GLOBAL-STATE.yaml");
    fs::write(
        &path,
        "[DECISION]\nDecision: Adopt Rust\nApproved by: a\nDate: 2024-01-01\nStatus: ACTIVE\n",
    )
    .unwrap();

    assert!(lint_paths(&[path]).unwrap().is_empty());
}

#[test]
fn test_missing_fields_reported_with_lines() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("MEMORY.md");
    fs::write(&path, "# notes\n[DECISION]\nDecision: Adopt Rust\nStatus: ACTIVE").unwrap();

    let findings = lint_paths(&[path.clone()]).unwrap();
    assert_eq!(findings.len(), 1);
    match &findings[0] {
        LintFinding::MissingFields { missing, lines, .. } => {
            assert_eq!(missing, &vec!["Approved by:".to_string(), "Date:".to_string()]);
            assert_eq!(lines, &[2, 4]);
        }
        other => panic!("unexpected finding {:?}", other),
    }
    assert!(findings[0].message().contains("missing fields: Approved by:, Date:"));
}

#[test]
fn test_repeated_active_decision_across_files() {
    let tmp = tempdir().unwrap();
    let memory = tmp.path().join("MEMORY.md");
    let global = tmp.path().join("GLOBAL-STATE.yaml");
    let decision = "[DECISION]\nDecision: Adopt Rust\nApproved by: a\nDate: 1\nStatus: ACTIVE\n";
    fs::write(&memory, decision).unwrap();
    fs::write(&global, decision).unwrap();

    let findings = lint_paths(&[memory.clone(), global.clone()]).unwrap();
    assert_eq!(
        findings,
        vec![LintFinding::RepeatedActive {
            decision: "Adopt Rust".to_string(),
            first_seen: memory.to_string_lossy().into_owned(),
            path: global.to_string_lossy().into_owned(),
        }]
    );
}

#[test]
fn test_superseded_repeats_are_not_flagged() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("GLOBAL-STATE.yaml");
    fs::write(
        &path,
        "[DECISION]\nDecision: Adopt Rust\nApproved by: a\nDate: 1\nStatus: SUPERSEDED\nSuperseded by: abc\n\
[DECISION]\nDecision: Adopt Rust\nApproved by: a\nDate: 2\nStatus: ACTIVE\n",
    )
    .unwrap();

    assert!(lint_paths(&[path]).unwrap().is_empty());
}

#[test]
fn test_missing_paths_are_skipped() {
    let tmp = tempdir().unwrap();
    let findings = lint_paths(&[tmp.path().join("absent.md")]).unwrap();
    assert!(findings.is_empty());
}

#[test]
fn test_lint_never_modifies_files() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("GLOBAL-STATE.yaml");
    let content = "[DECISION]\nDecision: x\nStatus: ACTIVE\n[DECISION]\nDecision: x\nStatus: ACTIVE\n";
    fs::write(&path, content).unwrap();

    let findings = lint_paths(&[path.clone()]).unwrap();
    assert_eq!(findings.len(), 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn test_fieldless_block_reports_every_mandatory_field() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("MEMORY.md");
    fs::write(&path, "[DECISION]\nwe agreed to ship weekly\n").unwrap();

    let findings = lint_paths(&[path]).unwrap();
    assert_eq!(findings.len(), 1);
    match &findings[0] {
        LintFinding::MissingFields { missing, lines, .. } => {
            assert_eq!(
                missing,
                &vec![
                    "Decision:".to_string(),
                    "Approved by:".to_string(),
                    "Date:".to_string(),
                    "Status:".to_string(),
                ]
            );
            assert_eq!(lines[0], 1);
        }
        other => panic!("unexpected finding {:?}", other),
    }
}

#[test]
fn test_findings_follow_document_order() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("GLOBAL-STATE.yaml");
    fs::write(
        &path,
        "[DECISION]\nDecision: Adopt Rust\nStatus: ACTIVE\n\
[DECISION]\nnotes without fields\n\
[DECISION]\nDecision: Adopt Rust\nApproved by: a\nDate: 2\nStatus: ACTIVE\n",
    )
    .unwrap();

    let findings = lint_paths(&[path]).unwrap();
    let starts: Vec<usize> = findings
        .iter()
        .map(|f| match f {
            LintFinding::MissingFields { lines, .. } => lines[0],
            LintFinding::RepeatedActive { .. } => 0,
        })
        .collect();
    assert_eq!(starts, vec![1, 4, 0]);
    assert!(matches!(findings[2], LintFinding::RepeatedActive { .. }));
}
