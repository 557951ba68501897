//! Specs for `osiris run`.

use crate::prelude::*;

fn compile(project: &Project) {
    let output = project.osiris(&["compile", "pipeline.yaml", "--out", "build"]);
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
}

fn run_session_dir(project: &Project) -> String {
    project
        .sessions()
        .into_iter()
        .find(|s| s.starts_with("run_"))
        .expect("no run session recorded")
}

#[test]
fn compile_then_run_roundtrips_csv() {
    let project = Project::with_csv_pipeline();
    compile(&project);

    let output = project.osiris(&["run", "build/manifest.yaml"]);
    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("run complete"));

    // The writer materialized the table, header sorted, 3 data rows.
    let csv = project.read("out/actors.csv");
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,name"));
    assert_eq!(lines.count(), 3);

    // Session files exist and carry the run lifecycle.
    let session = run_session_dir(&project);
    let events = project.read(&format!("logs/{session}/events.jsonl"));
    for name in [
        "run_start",
        "step_start",
        "inputs_resolved",
        "step_complete",
        "cleanup_complete",
        "run_end",
    ] {
        assert!(events.contains(name), "missing event {name}");
    }
    let metrics = project.read(&format!("logs/{session}/metrics.jsonl"));
    assert!(metrics.contains("rows_read"));
    assert!(metrics.contains("rows_written"));

    // The redacted per-step config artifact is in place.
    assert!(project.exists(&format!(
        "logs/{session}/artifacts/extract-actors/cleaned_config.json"
    )));
    assert!(project.exists(&format!(
        "logs/{session}/artifacts/write-actors/cleaned_config.json"
    )));
}

#[test]
fn run_total_rows_matches_writer() {
    let project = Project::with_csv_pipeline();
    compile(&project);

    let output = project.osiris(&["--json", "run", "build/manifest.yaml"]);
    assert_eq!(exit_code(&output), 0);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["steps_executed"], 2);
    assert_eq!(value["total_rows"], 3);
}

#[test]
fn dry_run_stops_after_validation() {
    let project = Project::with_csv_pipeline();
    compile(&project);

    let output = project.osiris(&["run", "build/manifest.yaml", "--dry-run"]);
    assert_eq!(exit_code(&output), 0);
    assert!(stdout(&output).contains("manifest ok"));
    assert!(!project.exists("out/actors.csv"));
}

#[test]
fn run_missing_manifest_fails() {
    let project = Project::with_csv_pipeline();
    let output = project.osiris(&["run", "build/manifest.yaml"]);
    assert_eq!(exit_code(&output), 1);
}

#[test]
fn missing_env_var_fails_before_steps() {
    let project = Project::with_csv_pipeline();
    project.write(
        "osiris_connections.yaml",
        r#"
version: 1
connections:
  filesystem:
    workdir:
      base_dir: ${OSIRIS_SPEC_UNSET_BASE}
      default: true
"#,
    );
    compile(&project);

    let output = project.osiris(&["run", "build/manifest.yaml"]);
    assert_eq!(exit_code(&output), 2, "stdout: {}", stdout(&output));
    let message = stderr(&output);
    assert!(message.contains("OSIRIS_SPEC_UNSET_BASE"));
    assert!(message.contains("filesystem"));
    assert!(message.contains("workdir"));

    // The pipeline never produced output.
    assert!(!project.exists("out/actors.csv"));
}

#[test]
fn failed_run_records_failed_session() {
    let project = Project::with_csv_pipeline();
    compile(&project);
    // Remove the source so the extractor fails at run time.
    std::fs::remove_file(project.root.join("data/actors.csv")).unwrap();

    let output = project.osiris(&["run", "build/manifest.yaml"]);
    assert_eq!(exit_code(&output), 1);

    let session = run_session_dir(&project);
    let events = project.read(&format!("logs/{session}/events.jsonl"));
    assert!(events.contains("step_error"));
    assert!(events.contains("run_error"));
    assert!(events.contains("\"status\":\"failed\""));
}
