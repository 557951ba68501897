//! Specs for `osiris logs`.

use crate::prelude::*;

fn compile_and_run(project: &Project) {
    assert_eq!(
        exit_code(&project.osiris(&["compile", "pipeline.yaml", "--out", "build"])),
        0
    );
    assert_eq!(exit_code(&project.osiris(&["run", "build/manifest.yaml"])), 0);
}

#[test]
fn list_without_sessions_is_ok() {
    let project = Project::new();
    let output = project.osiris(&["logs", "list"]);
    assert_eq!(exit_code(&output), 0);
    assert!(stdout(&output).contains("no sessions"));
}

#[test]
fn list_shows_sessions_newest_first() {
    let project = Project::with_csv_pipeline();
    compile_and_run(&project);

    let output = project.osiris(&["--json", "logs", "list"]);
    assert_eq!(exit_code(&output), 0);
    let sessions: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    // Both the compile and the run session are present.
    let ids: Vec<&str> = sessions
        .iter()
        .map(|s| s["session_id"].as_str().unwrap())
        .collect();
    assert!(ids.iter().any(|id| id.starts_with("compile_")));
    assert!(ids.iter().any(|id| id.starts_with("run_")));
}

#[test]
fn show_reports_step_counts_matching_manifest() {
    let project = Project::with_csv_pipeline();
    compile_and_run(&project);
    let session = project
        .sessions()
        .into_iter()
        .find(|s| s.starts_with("run_"))
        .unwrap();

    let output = project.osiris(&["--json", "logs", "show", "--session", &session]);
    assert_eq!(exit_code(&output), 0);
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["status"], "success");
    assert_eq!(summary["steps_total"], 2);
    assert_eq!(summary["steps_ok"], 2);
    assert_eq!(summary["steps_failed"], 0);
    assert_eq!(summary["rows_in"], 3);
    assert_eq!(summary["rows_out"], 3);
}

#[test]
fn show_unknown_session_exits_2() {
    let project = Project::new();
    let output = project.osiris(&["logs", "show", "--session", "nope"]);
    assert_eq!(exit_code(&output), 2);
}

#[test]
fn last_returns_most_recent_session() {
    let project = Project::with_csv_pipeline();
    compile_and_run(&project);

    let output = project.osiris(&["--json", "logs", "last"]);
    assert_eq!(exit_code(&output), 0);
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(summary["session_id"].as_str().unwrap().starts_with("run_"));
}

#[test]
fn bundle_packs_a_session() {
    let project = Project::with_csv_pipeline();
    compile_and_run(&project);
    let session = project
        .sessions()
        .into_iter()
        .find(|s| s.starts_with("run_"))
        .unwrap();

    let output = project.osiris(&[
        "logs",
        "bundle",
        "--session",
        &session,
        "--out",
        "session.bundle.zst",
    ]);
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    assert!(project.exists("session.bundle.zst"));
}

#[test]
fn gc_keeps_recent_sessions() {
    let project = Project::with_csv_pipeline();
    compile_and_run(&project);

    let output = project.osiris(&["logs", "gc", "--days", "7", "--max-gb", "10"]);
    assert_eq!(exit_code(&output), 0);
    assert_eq!(project.sessions().len(), 2);
}
