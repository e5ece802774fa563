use decision_ledger::core::apply::{APPROVAL_PHRASE, ApprovalOutcome, Mode, run};
use decision_ledger::core::config::ResolveConfig;
use decision_ledger::core::draft::{DRAFT_MD_NAME, DRAFT_YAML_NAME, PATCH_NAME};
use decision_ledger::core::error::ResolveError;
use decision_ledger::core::output::OutputFormat;
use decision_ledger::core::record::{Status, decision_key, parse_decisions};
use decision_ledger::core::telemetry::metrics_path;
use decision_ledger::plugins::resolve::{ResolveArgs, build_config};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

const LEDGER: &str = "# GLOBAL STATE\n\
\n\
[DECISION]\n\
Decision: Use Postgres for storage\n\
Approved by: platform-lead\n\
Date: 2024-03-01\n\
Status: ACTIVE\n\
Domain: data\n\
\n\
[CONTEXT]\n\
Unrelated content that must survive untouched.\n\
\n\
[DECISION]\n\
Decision: use   postgres for storage!!\n\
Approved by: platform-lead\n\
Date: 2024-03-01\n\
Status: active\n\
Domain: data\n";

fn setup(ledger: &str) -> (tempfile::TempDir, ResolveConfig) {
    let tmp = tempdir().unwrap();
    let kit = tmp.path().join("kit");
    fs::create_dir_all(&kit).unwrap();
    fs::write(kit.join("GLOBAL-STATE.yaml"), ledger).unwrap();
    let config = ResolveConfig::new(&kit, tmp.path().join("ws"));
    (tmp, config)
}

fn read_ledger(config: &ResolveConfig) -> String {
    fs::read_to_string(&config.global_state).unwrap()
}

#[test]
fn test_scan_writes_drafts_and_patch_without_mutating() {
    let (_tmp, config) = setup(LEDGER);

    let report = run(&config, Mode::Scan, None).unwrap();

    assert_eq!(read_ledger(&config), LEDGER);
    assert!(!report.wrote_canonical);
    assert_eq!(report.applied, 0);
    assert_eq!(report.draft.summary.global_decisions, 2);
    assert_eq!(report.draft.summary.global_active, 2);
    assert_eq!(report.draft.summary.safe_actions, 1);
    assert!(config.workspace.join(DRAFT_YAML_NAME).exists());
    assert!(config.workspace.join(DRAFT_MD_NAME).exists());

    let patch = fs::read_to_string(config.workspace.join(PATCH_NAME)).unwrap();
    assert!(patch.starts_with("--- GLOBAL-STATE.yaml\n+++ GLOBAL-STATE.yaml\n"));
    assert!(patch.contains("-Status: ACTIVE\n+Status: SUPERSEDED\n"));
}

#[test]
fn test_apply_supersedes_earlier_duplicate_and_points_at_winner() {
    let (_tmp, config) = setup(LEDGER);

    let report = run(&config, Mode::Apply, None).unwrap();
    assert!(report.wrote_canonical);
    assert_eq!(report.applied, 1);

    let updated = read_ledger(&config);
    let records = parse_decisions(&updated, "GLOBAL-STATE.yaml");
    let (expected_key, _) = decision_key("Use Postgres for storage");
    assert_eq!(records[0].status, Status::Superseded);
    assert_eq!(records[0].superseded_by.as_deref(), Some(expected_key.as_str()));
    assert_eq!(records[1].status, Status::Active);
    assert!(updated.contains("[CONTEXT]\nUnrelated content that must survive untouched.\n"));
    // Only the control fields changed in the loser block.
    assert!(updated.contains(
        "Decision: Use Postgres for storage\nApproved by: platform-lead\nDate: 2024-03-01\nStatus: SUPERSEDED\nDomain: data\nSuperseded by: "
    ));
}

#[test]
fn test_apply_is_idempotent() {
    let (_tmp, config) = setup(LEDGER);

    let first = run(&config, Mode::Apply, None).unwrap();
    assert!(first.wrote_canonical);
    let after_first = read_ledger(&config);

    let second = run(&config, Mode::Apply, None).unwrap();
    assert!(!second.wrote_canonical);
    assert_eq!(second.draft.summary.safe_actions, 0);
    assert_eq!(read_ledger(&config), after_first);
    assert!(second.artifacts.patch.is_none());
}

#[test]
fn test_scan_is_deterministic() {
    let (_tmp, config) = setup(LEDGER);

    run(&config, Mode::Scan, None).unwrap();
    let first = fs::read_to_string(config.workspace.join(DRAFT_YAML_NAME)).unwrap();
    run(&config, Mode::Scan, None).unwrap();
    let second = fs::read_to_string(config.workspace.join(DRAFT_YAML_NAME)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_near_duplicates_are_gated_and_never_patched() {
    let ledger = "[DECISION]\nDecision: deploy services on kubernetes cluster\nApproved by: a\nDate: 1\nStatus: ACTIVE\n\
[DECISION]\nDecision: deploy services on kubernetes cluster nightly\nApproved by: a\nDate: 2\nStatus: ACTIVE\n";
    let (_tmp, config) = setup(ledger);

    let report = run(&config, Mode::Apply, Some(APPROVAL_PHRASE)).unwrap();
    assert_eq!(report.draft.summary.gated, 1);
    assert_eq!(report.draft.summary.safe_actions, 0);
    assert_eq!(report.approval, ApprovalOutcome::Acknowledged);
    assert!(!report.wrote_canonical);
    assert!(report.artifacts.patch.is_none());
    assert_eq!(read_ledger(&config), ledger);
}

#[test]
fn test_rejected_approval_does_not_block_safe_actions() {
    let (_tmp, config) = setup(LEDGER);
    let almost = "APPROVE STRUCTURAL CHANGE: DECISION-RESOLVe";

    let report = run(&config, Mode::Apply, Some(almost)).unwrap();
    assert_eq!(report.approval, ApprovalOutcome::Rejected);
    assert!(report.wrote_canonical);
    assert_eq!(report.applied, 1);
}

#[test]
fn test_must_fix_issues_are_reported_not_blocking() {
    let ledger = "[DECISION]\nDecision: Freeze API v1\nStatus: ACTIVE\n\
[DECISION]\nDecision: freeze api v1\nStatus: ACTIVE\n\
[DECISION]\nDecision: Retire cron host\nApproved by: ops\nDate: 2023-01-01\nStatus: SUPERSEDED\n";
    let (_tmp, config) = setup(ledger);

    let report = run(&config, Mode::Scan, None).unwrap();
    let kinds: Vec<&str> = report.draft.issues.iter().map(|i| i.kind()).collect();
    assert_eq!(
        kinds,
        vec!["missing_fields", "missing_fields", "missing_superseded_by"]
    );
    assert_eq!(report.draft.summary.safe_actions, 1);
}

#[test]
fn test_missing_canonical_is_distinct_error() {
    let tmp = tempdir().unwrap();
    let config = ResolveConfig::new(tmp.path().join("nokit"), tmp.path().join("ws"));
    let err = run(&config, Mode::Scan, None).unwrap_err();
    assert!(matches!(err, ResolveError::CanonicalNotFound(_)));
    assert!(!config.workspace.join(DRAFT_YAML_NAME).exists());
}

#[test]
fn test_advisory_memory_is_context_only() {
    let (_tmp, mut config) = setup(LEDGER);
    let memory = "[DECISION]\nDecision: Use postgres for storage.\nStatus: ACTIVE\n";
    fs::write(config.kit_dir.join("MEMORY.md"), memory).unwrap();
    config.include_memory = true;

    let report = run(&config, Mode::Apply, None).unwrap();
    assert_eq!(report.draft.meta.advisory_sources, vec!["MEMORY.md".to_string()]);
    assert_eq!(report.draft.summary.advisory_decisions, 1);
    assert_eq!(report.draft.summary.advisory_overlaps, 2);
    assert!(report.draft.advisory_overlaps.iter().all(|o| o.exact));
    // Advisory blocks never produce issues or edits.
    assert_eq!(report.draft.summary.issues, 0);
    assert_eq!(fs::read_to_string(config.kit_dir.join("MEMORY.md")).unwrap(), memory);
}

#[test]
fn test_telemetry_appends_counts() {
    let (_tmp, mut config) = setup(LEDGER);
    config.telemetry = true;

    run(&config, Mode::Scan, None).unwrap();
    let content = fs::read_to_string(metrics_path(&config.workspace)).unwrap();
    let event: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(event["event"], "decision_resolve.scan");
    assert_eq!(event["data"]["safe_actions"], 1);
    assert!(!content.contains("Postgres"));
}

fn args(kit: PathBuf, workspace: PathBuf) -> ResolveArgs {
    ResolveArgs {
        workspace,
        kit_dir: kit,
        global_state: None,
        advisory: vec![],
        include_memory: false,
        similarity: None,
        config: None,
        telemetry: false,
        format: OutputFormat::Text,
    }
}

#[test]
fn test_flags_override_config_file() {
    let tmp = tempdir().unwrap();
    let kit = tmp.path().to_path_buf();
    fs::write(
        kit.join("resolver.toml"),
        "similarity = 0.9\ninclude_memory = true\nglobal_state = \"ledger.yaml\"\n",
    )
    .unwrap();

    let mut cli = args(kit.clone(), kit.join("ws"));
    let from_file = build_config(&cli).unwrap();
    assert_eq!(from_file.similarity_threshold, 0.9);
    assert!(from_file.include_memory);
    assert_eq!(from_file.global_state, kit.join("ledger.yaml"));

    cli.similarity = Some(0.5);
    let overridden = build_config(&cli).unwrap();
    assert_eq!(overridden.similarity_threshold, 0.5);

    cli.similarity = Some(2.0);
    assert!(matches!(
        build_config(&cli),
        Err(ResolveError::ValidationError(_))
    ));
}

#[test]
fn test_explicit_missing_config_is_error() {
    let tmp = tempdir().unwrap();
    let mut cli = args(tmp.path().to_path_buf(), tmp.path().join("ws"));
    cli.config = Some(tmp.path().join("absent.toml"));
    assert!(matches!(build_config(&cli), Err(ResolveError::ConfigError(_))));
}
