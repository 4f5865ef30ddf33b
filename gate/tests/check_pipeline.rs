//! Orchestration tests for `run_check` over an in-memory change source.
//!
//! Each test seeds a `.skl/` directory in a temp repo root, drives one run and
//! inspects both the returned outcome and the persisted knowledge store.

use std::fs;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use pushgate::check::{Verdict, run_check};
use pushgate::core::gates::GateBlock;
use pushgate::core::proposal::CROSS_SCOPE_TAG;
use pushgate::core::types::ChangeType;
use pushgate::io::config::Mode;
use pushgate::io::layout::SklPaths;
use pushgate::model::Proposal;
use pushgate::test_support::{FakeChangeSource, write_json};

const AGENT: &str = "agent-a";

struct Fixture {
    dir: TempDir,
    paths: SklPaths,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = SklPaths::new(dir.path());
        let fixture = Self { dir, paths };
        fixture.write_file("core/db.py", "x = 1\n");
        fixture.write_file("api/util.py", "def helper():\n    pass\n");
        fixture.write_config(json!({}));
        fixture.write_knowledge(knowledge(&[json!({
            "proposal_id": "prop_20250530_agent-b_001",
            "agent_id": "agent-b",
            "status": "pending",
            "branch": "feature/login",
            "semantic_scope": "api"
        })]));
        write_json(
            &fixture.paths.agent_context_path(AGENT),
            &json!({
                "agent_id": AGENT,
                "semantic_scope": "api",
                "file_scope": ["api/routes.py", "api/new_handler.py"]
            }),
        )
        .expect("agent context");
        write_json(
            &fixture.paths.scope_definitions_path,
            &json!({
                "scope_definitions": {"scopes": {
                    "api": {
                        "allowed_paths": [],
                        "allowed_path_prefixes": ["api/"],
                        "forbidden_path_prefixes": ["core/"]
                    }
                }},
                "known_expected_cross_scope_imports": ["shared/"]
            }),
        )
        .expect("scope definitions");
        fixture
    }

    fn write_file(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write file");
    }

    fn write_config(&self, config: Value) {
        write_json(&self.paths.config_path, &config).expect("config");
    }

    fn write_knowledge(&self, knowledge: Value) {
        write_json(&self.paths.knowledge_path, &knowledge).expect("knowledge");
    }

    fn write_rfc(&self, name: &str, rfc: Value) {
        write_json(&self.paths.rfcs_dir.join(name), &rfc).expect("rfc");
    }

    fn knowledge_bytes(&self) -> Vec<u8> {
        fs::read(&self.paths.knowledge_path).expect("read knowledge")
    }

    fn knowledge_json(&self) -> Value {
        serde_json::from_slice(&self.knowledge_bytes()).expect("parse knowledge")
    }
}

fn knowledge(queue: &[Value]) -> Value {
    json!({
        "project": {"name": "demo"},
        "queue": queue,
        "state": [
            {"path": "core/db.py", "semantic_scope": "core", "dependencies": [], "invariants_touched": []},
            {
                "path": "api/routes.py",
                "semantic_scope": "api",
                "dependencies": ["api/util.py", "api/legacy.py"],
                "invariants_touched": []
            },
            {
                "path": "auth/session.py",
                "semantic_scope": "auth",
                "dependencies": ["core/db.py"],
                "invariants_touched": ["session_lifetime"]
            }
        ],
        "invariants": {"security_patterns": ["verify_token"]}
    })
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time")
}

fn blocking_rfc() -> Value {
    json!({
        "id": "RFC-001",
        "status": "open",
        "triggering_proposal": "prop_20250530_agent-b_001",
        "merge_blocked_until_criteria_pass": true,
        "acceptance_criteria": [
            {"ac_id": "AC-1", "description": "schema migrated", "check_type": "test",
             "check_reference": "tests/test_schema.py", "status": "passed"},
            {"ac_id": "AC-2", "description": "login rejects stale tokens", "check_type": "test",
             "check_reference": "tests/test_login.py::test_stale", "status": "pending"}
        ]
    })
}

fn routes_change(source: FakeChangeSource) -> FakeChangeSource {
    source.change(
        "api/routes.py",
        Some("import api.util\n\ndef route(x):\n    \"\"\"Old.\"\"\"\n    return x\n"),
        "import api.util\n\ndef route(x):\n    \"\"\"New wording.\"\"\"\n    return x\n",
    )
}

fn proposals(verdict: &Verdict) -> &[Proposal] {
    match verdict {
        Verdict::Allowed(proposals) => proposals,
        Verdict::Blocked(block) => panic!("unexpected block: {block}"),
    }
}

#[test]
fn full_run_appends_one_proposal_per_file_in_order() {
    let fixture = Fixture::new();
    let source = routes_change(FakeChangeSource::on_branch("feature/api"))
        .change("api/new_handler.py", None, "import core.db\nimport api.util\nimport shared.log\n")
        .change("core/db.py", Some("x = 1\n"), "x = 2\n");

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    assert_eq!(outcome.mode, Mode::Full);
    assert_eq!(outcome.scope.out_of_scope, vec!["core/db.py".to_string()]);
    assert_eq!(outcome.scope.cross_scope, vec!["core/db.py".to_string()]);

    let built = proposals(&outcome.verdict);
    let ids: Vec<&str> = built.iter().map(|p| p.proposal_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "prop_20250601_agent-a_002",
            "prop_20250601_agent-a_003",
            "prop_20250601_agent-a_004"
        ]
    );

    let routes = &built[0];
    assert!(routes.risk_signals.mechanical_only());
    assert!(routes.dependency_scan.undeclared.is_empty());
    assert_eq!(
        routes.dependency_scan.stale.iter().collect::<Vec<_>>(),
        vec!["api/legacy.py"]
    );
    assert_eq!(routes.branch.as_deref(), Some("feature/api"));

    let handler = &built[1];
    assert_eq!(handler.risk_signals.change_type, ChangeType::Structural);
    assert!(handler.dependency_scan.undeclared.is_empty());
    assert!(handler.dependency_scan.stale.is_empty());
    assert_eq!(
        handler.dependency_scan.cross_scope_undeclared.iter().collect::<Vec<_>>(),
        vec!["core/db.py"]
    );
    assert_eq!(handler.blocking_reasons, vec![CROSS_SCOPE_TAG.to_string()]);

    let db = &built[2];
    assert!(db.out_of_scope);
    assert!(db.cross_scope_flag);
    assert_eq!(db.risk_signals.change_type, ChangeType::Behavioral);
    assert!(db.risk_signals.invariant_referenced);

    assert_eq!(
        outcome.report_lines().last().map(String::as_str),
        Some("pushgate: 3 proposal(s) submitted to queue. 1 blocking flag(s).")
    );

    let stored = fixture.knowledge_json();
    let queue = stored["queue"].as_array().expect("queue");
    assert_eq!(queue.len(), 4);
    assert_eq!(queue[0]["proposal_id"], "prop_20250530_agent-b_001");
    assert_eq!(queue[1]["proposal_id"], "prop_20250601_agent-a_002");
    assert_eq!(queue[3]["path"], "core/db.py");
    assert_eq!(queue[2]["dependency_scan"]["cross_scope_undeclared"], json!(["core/db.py"]));
    assert_eq!(queue[1]["risk_signals"]["mechanical_only"], true);
    assert_eq!(queue[1]["submitted_at"], "2025-06-01T12:00:00Z");
    assert_eq!(stored["project"], json!({"name": "demo"}));
    let keys: Vec<&str> = stored
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["project", "queue", "state", "invariants"]);
}

#[test]
fn queue_gate_runs_before_acceptance_gate() {
    let fixture = Fixture::new();
    fixture.write_config(json!({"queue_max": 1}));
    fixture.write_rfc("rfc-001.json", blocking_rfc());
    let before = fixture.knowledge_bytes();
    let source = routes_change(FakeChangeSource::on_branch("feature/login"));

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    assert_eq!(
        outcome.verdict,
        Verdict::Blocked(GateBlock::QueueFull { pending: 1, max: 1 })
    );
    assert!(outcome.report_lines().iter().any(|l| l.contains("1/1 pending proposals")));
    assert_eq!(fixture.knowledge_bytes(), before);
}

#[test]
fn acceptance_gate_blocks_matching_branch() {
    let fixture = Fixture::new();
    fixture.write_rfc("rfc-001.json", blocking_rfc());
    let before = fixture.knowledge_bytes();
    let source = routes_change(FakeChangeSource::on_branch("feature/login"))
        .change("core/db.py", Some("x = 1\n"), "x = 2\n");

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    let Verdict::Blocked(GateBlock::UnmetCriteria { rfc_id, failing }) = &outcome.verdict else {
        panic!("expected acceptance block, got {:?}", outcome.verdict);
    };
    assert_eq!(rfc_id, "RFC-001");
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].ac_id, "AC-2");
    // Scope findings are still reported ahead of the block.
    assert_eq!(outcome.scope.out_of_scope, vec!["core/db.py".to_string()]);
    let lines = outcome.report_lines();
    assert!(lines[0].contains("outside agent file_scope"));
    assert!(lines.iter().any(|l| l.contains("[AC-2] login rejects stale tokens")));
    assert_eq!(fixture.knowledge_bytes(), before);
}

#[test]
fn acceptance_gate_is_skipped_without_a_branch() {
    let fixture = Fixture::new();
    fixture.write_rfc("rfc-001.json", blocking_rfc());
    let source = routes_change(FakeChangeSource::default());

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    let built = proposals(&outcome.verdict);
    assert_eq!(built.len(), 1);
    assert_eq!(built[0].branch, None);
}

#[test]
fn scope_pause_blocks_agent_scope_after_deadline() {
    let fixture = Fixture::new();
    fixture.write_rfc(
        "rfc-002.json",
        json!({
            "id": "RFC-002",
            "status": "open",
            "triggering_proposal": "prop_20250530_agent-b_001",
            "human_response_deadline": "2025-05-31T09:00:00Z"
        }),
    );
    let source = routes_change(FakeChangeSource::on_branch("feature/api"));

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    assert_eq!(
        outcome.verdict,
        Verdict::Blocked(GateBlock::ScopePaused {
            rfc_id: "RFC-002".to_string(),
            deadline: "2025-05-31T09:00:00Z".to_string(),
            scope: "api".to_string(),
        })
    );

    let later = Utc.with_ymd_and_hms(2025, 5, 30, 0, 0, 0).single().expect("valid time");
    let outcome = run_check(&fixture.paths, AGENT, &source, later).expect("run");
    assert!(!outcome.is_blocked());
}

#[test]
fn bootstrap_mode_skips_rfc_gates_and_semantic_scope() {
    let fixture = Fixture::new();
    fixture.write_config(json!({"skl_mode": "phase_0", "queue_max": 1}));
    fixture.write_rfc("rfc-001.json", blocking_rfc());
    let source = FakeChangeSource::on_branch("feature/login")
        .change("core/db.py", Some("x = 1\n"), "x = 2\n");

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    assert_eq!(outcome.mode, Mode::Bootstrap);
    assert!(outcome.scope.cross_scope.is_empty());
    assert_eq!(outcome.scope.out_of_scope, vec!["core/db.py".to_string()]);
    let built = proposals(&outcome.verdict);
    assert_eq!(built.len(), 1);
    assert!(!built[0].cross_scope_flag);
    assert_eq!(
        outcome.report_lines().last().map(String::as_str),
        Some("pushgate: 1 activity record(s) logged.")
    );
}

#[test]
fn failed_diff_allows_push_without_rewriting_store() {
    let fixture = Fixture::new();
    let before = fixture.knowledge_bytes();
    let source = FakeChangeSource {
        diff_fails: true,
        ..FakeChangeSource::on_branch("feature/api")
    };

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    assert!(proposals(&outcome.verdict).is_empty());
    assert_eq!(fixture.knowledge_bytes(), before);
}

#[test]
fn non_source_file_reports_declared_deps_as_stale() {
    let fixture = Fixture::new();
    let mut doc = knowledge(&[]);
    doc["state"]
        .as_array_mut()
        .expect("state")
        .push(json!({"path": "api/config.json", "semantic_scope": "api", "dependencies": ["api/util.py"]}));
    fixture.write_knowledge(doc);
    let source = FakeChangeSource::on_branch("feature/api").change(
        "api/config.json",
        Some("{}"),
        "{\"debug\": true}",
    );

    let outcome = run_check(&fixture.paths, AGENT, &source, now()).expect("run");
    let built = proposals(&outcome.verdict);
    assert_eq!(built[0].proposal_id, "prop_20250601_agent-a_001");
    assert_eq!(built[0].risk_signals.change_type, ChangeType::Behavioral);
    assert!(!built[0].risk_signals.public_api_changed);
    assert_eq!(
        built[0].dependency_scan.stale.iter().collect::<Vec<_>>(),
        vec!["api/util.py"]
    );
}

#[test]
fn setup_failures_are_errors() {
    let fixture = Fixture::new();
    let source = routes_change(FakeChangeSource::on_branch("feature/api"));

    assert!(run_check(&fixture.paths, "", &source, now()).is_err());
    assert!(run_check(&fixture.paths, "agent-unknown", &source, now()).is_err());

    fs::write(&fixture.paths.knowledge_path, "{ truncated").expect("corrupt");
    let err = run_check(&fixture.paths, AGENT, &source, now()).expect_err("corrupt store");
    assert!(format!("{err:#}").contains("knowledge.json"));
}
