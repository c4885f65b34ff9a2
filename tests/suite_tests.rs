//! End-to-end tests: discovery, planning, scheduling, matching and aggregation against a scripted front end.
//!
//! The fake front end is a shell script that reads the fixture it is given:
//! - lines starting with `// FAKE_OUT: ` are echoed to stdout (without the prefix),
//! - `FAKE_REJECT` anywhere makes it exit 1,
//! - `FAKE_HANG` anywhere makes it sleep far beyond any test timeout.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use svconform::report::ConsoleReporter;
use svconform::{
    CaseStatus, FrontendProfile, HarnessConfig, Phase, PhaseProfile, ProcessExecutor, Report, Selection, SuiteOptions,
    run_suite,
};
use tokio::sync::watch;

const FAKE_FRONTEND: &str = r#"#!/bin/sh
for last; do :; done
if grep -q FAKE_HANG "$last"; then
  exec sleep 30
fi
grep '^// FAKE_OUT: ' "$last" | sed 's#^// FAKE_OUT: ##'
if grep -q FAKE_REJECT "$last"; then
  exit 1
fi
exit 0
"#;

/// Written once, before any test spawns a process, so no exec races a still-open write handle.
fn fake_frontend() -> &'static Path {
    static SCRIPT: OnceLock<PathBuf> = OnceLock::new();
    SCRIPT.get_or_init(|| {
        let path = Path::new(env!("CARGO_TARGET_TMPDIR")).join("svconform_fake_frontend.sh");
        fs::write(&path, FAKE_FRONTEND).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
}

fn config(workers: usize) -> HarnessConfig {
    let profile = FrontendProfile::new(fake_frontend().to_string_lossy()).with_phase(Phase::Parsing, PhaseProfile {
        args: vec!["--parse-only".to_string()],
        ..PhaseProfile::default()
    });
    HarnessConfig::new()
        .with_workers(workers)
        .with_timeout(Duration::from_secs(10))
        .with_frontend("fake", profile)
}

fn corpus(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, text) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    dir
}

async fn run(dir: &Path, config: &HarnessConfig, selection: Selection) -> Report {
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let options = SuiteOptions::new(vec![dir.to_path_buf()]).with_selection(selection);
    let mut reporter = ConsoleReporter::new(Vec::new(), false).with_color(false);
    run_suite(config, &options, ProcessExecutor, &mut reporter, cancel_rx).await.unwrap()
}

fn status_of(report: &Report, name: &str) -> CaseStatus {
    report
        .cases
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no case named {name}"))
        .status
}

const UNIQUE0_CASE: &str = r#"/*
:name: unique0_case
:description: unique0 case test
:tags: 12.5
:type: simulation
*/
module top();
  logic [1:0] a = 3;
  logic [1:0] b = 0;
  always_comb begin
    unique0 case (a)
      0, 1: b = 1;
      2: b = 2;
      3: b = 3;
    endcase
  end
endmodule
"#;

fn equality_x(emitted: &str) -> String {
    format!(
        r#"/*
:name: equality_x_{tag}
:tags: 11.4.5
:type: simulation
*/
module top();
  logic [7:0] a = 8'b1101x001;
  logic [7:0] b = 8'b1101x001;
  logic c;
  initial begin
    c = a == b;
    $display(":assert: ('%s' == %d)", "x", c);
  end
endmodule
// FAKE_OUT: {emitted}
"#,
        tag = if emitted.contains("== 0") { "false" } else { "true" },
        emitted = emitted
    )
}

// ========================================
// Scenarios
// ========================================

#[tokio::test(flavor = "multi_thread")]
async fn test_fixture_without_directives_passes_on_exit_zero() {
    let dir = corpus(&[("unique0.sv", UNIQUE0_CASE)]);
    let report = run(dir.path(), &config(2), Selection::new()).await;

    assert_eq!(report.cases.len(), 1);
    assert_eq!(report.cases[0].status, CaseStatus::Pass);
    assert_eq!(report.cases[0].phase, Some(Phase::Simulation));
    assert_eq!(report.cases[0].exit_code, Some(0));
    assert!(report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_indeterminate_comparison_renders_false() {
    let dir = corpus(&[
        ("a.sv", &equality_x(":assert: ('x' == 0)")),
        ("b.sv", &equality_x(":assert: ('x' == 1)")),
    ]);
    let report = run(dir.path(), &config(2), Selection::new()).await;

    assert_eq!(status_of(&report, "equality_x_false"), CaseStatus::Pass);
    let failed = report.cases.iter().find(|c| c.name == "equality_x_true").unwrap();
    assert_eq!(failed.status, CaseStatus::Fail);
    assert_eq!(
        failed.reasons,
        vec![
            "line 12: no output matched `:assert: ('x' == 0)`".to_string(),
            "orphan assertion output: `:assert: ('x' == 1)`".to_string(),
        ]
    );
    assert!(!report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_duplicate_names_are_a_reported_conflict() {
    let fixture = "/*\n:name: past_function\n:type: parsing\n*/\nmodule m; endmodule\n";
    let dir = corpus(&[("one/past.sv", fixture), ("two/past.sv", fixture)]);
    let report = run(dir.path(), &config(2), Selection::new()).await;

    assert_eq!(report.cases.len(), 2);
    assert!(report.cases.iter().all(|c| c.status == CaseStatus::Pass));
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].name, "past_function");
    assert_eq!(report.conflicts[0].paths.len(), 2);
    assert!(!report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hung_front_end_is_killed_and_queue_continues() {
    let dir = corpus(&[
        ("a_hang.sv", "/*\n:name: hang\n:type: parsing\n:timeout: 0.5\n*/\n// FAKE_HANG\n"),
        ("b_ok.sv", "/*\n:name: ok_b\n:type: parsing\n*/\n"),
        ("c_ok.sv", "/*\n:name: ok_c\n:type: parsing\n*/\n"),
    ]);
    let start = Instant::now();
    let report = run(dir.path(), &config(1), Selection::new()).await;

    assert!(start.elapsed() < Duration::from_secs(10), "run took {:?}", start.elapsed());
    assert_eq!(status_of(&report, "hang"), CaseStatus::Timeout);
    assert_eq!(status_of(&report, "ok_b"), CaseStatus::Pass);
    assert_eq!(status_of(&report, "ok_c"), CaseStatus::Pass);
    assert_eq!(report.summary.count(CaseStatus::Timeout), 1);
}

// ========================================
// Classification through the pipeline
// ========================================

#[tokio::test(flavor = "multi_thread")]
async fn test_expected_rejection_and_unexpected_rejection() {
    let dir = corpus(&[
        (
            "neg.sv",
            "/*\n:name: neg\n:type: parsing\n:should_fail_because: bad port list\n*/\n// FAKE_REJECT\n",
        ),
        ("broken.sv", "/*\n:name: broken\n:type: parsing\n*/\n// FAKE_REJECT\n"),
    ]);
    let report = run(dir.path(), &config(2), Selection::new()).await;

    assert_eq!(status_of(&report, "neg"), CaseStatus::Pass);
    let broken = report.cases.iter().find(|c| c.name == "broken").unwrap();
    assert_eq!(broken.status, CaseStatus::ToolError);
    assert_eq!(broken.exit_code, Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_and_filtered_fixtures_never_run() {
    let dir = corpus(&[
        ("bad.sv", "/*\n:name: bad\n:type: parsing\n*/\n$display(\":assert: (%d %d)\", 1);\n"),
        ("other.sv", "/*\n:name: other\n:tags: 16.9\n:type: parsing\n*/\n"),
        ("chosen.sv", "/*\n:name: chosen\n:tags: 12.5\n:type: parsing\n*/\n"),
        ("untyped.sv", "module m; endmodule\n"),
    ]);
    let report = run(dir.path(), &config(2), Selection::new().with_tags(["12.5"])).await;

    assert_eq!(status_of(&report, "chosen"), CaseStatus::Pass);
    assert_eq!(status_of(&report, "other"), CaseStatus::Skipped);
    assert_eq!(status_of(&report, "untyped"), CaseStatus::Skipped);
    // Tag filters apply to malformed fixtures too.
    assert_eq!(status_of(&report, "bad"), CaseStatus::Skipped);
    assert!(report.is_success());

    let report = run(dir.path(), &config(2), Selection::new()).await;
    let bad = report.cases.iter().find(|c| c.name == "bad").unwrap();
    assert_eq!(bad.status, CaseStatus::Malformed);
    assert!(bad.reasons[0].starts_with("line 5:"), "{:?}", bad.reasons);
    assert!(!report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requested_phase_runs_untyped_fixture() {
    let dir = corpus(&[("untyped.sv", "module m; endmodule\n")]);
    let report = run(dir.path(), &config(1), Selection::new().with_phases([Phase::Parsing])).await;

    assert_eq!(report.cases.len(), 1);
    assert_eq!(report.cases[0].name, "untyped");
    assert_eq!(report.cases[0].phase, Some(Phase::Parsing));
    assert_eq!(report.cases[0].status, CaseStatus::Pass);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_front_end_is_a_tool_error() {
    let dir = corpus(&[("a.sv", "/*\n:name: a\n:type: parsing\n*/\n")]);
    let config = HarnessConfig::new().with_frontend("missing", FrontendProfile::new("/nonexistent/svconform-frontend"));
    let report = run(dir.path(), &config, Selection::new()).await;

    assert_eq!(report.cases[0].status, CaseStatus::ToolError);
    assert!(report.cases[0].reasons[0].starts_with("failed to launch"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_kills_in_flight_and_marks_queue() {
    let dir = corpus(&[
        ("a_hang.sv", "/*\n:name: hang\n:type: parsing\n*/\n// FAKE_HANG\n"),
        ("b_ok.sv", "/*\n:name: queued\n:type: parsing\n*/\n"),
    ]);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = cancel_tx.send(true);
    });
    let options = SuiteOptions::new(vec![dir.path().to_path_buf()]);
    let mut reporter = ConsoleReporter::new(Vec::new(), false).with_color(false);
    let report = run_suite(&config(1), &options, ProcessExecutor, &mut reporter, cancel_rx)
        .await
        .unwrap();

    assert_eq!(status_of(&report, "hang"), CaseStatus::Cancelled);
    assert_eq!(status_of(&report, "queued"), CaseStatus::Cancelled);
    assert!(!report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_root_is_fatal() {
    let options = SuiteOptions::new(vec![PathBuf::from("/nonexistent/svconform-corpus")]);
    let (_tx, rx) = watch::channel(false);
    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let result = run_suite(&config(1), &options, ProcessExecutor, &mut reporter, rx).await;
    assert!(matches!(result, Err(svconform::HarnessError::Discovery(_))));
}
