//! Specs for `osiris compile`.

use crate::prelude::*;

#[test]
fn compile_writes_manifest_and_configs() {
    let project = Project::with_csv_pipeline();
    let output = project.osiris(&["compile", "pipeline.yaml", "--out", "build"]);

    assert_eq!(exit_code(&output), 0, "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("csv-roundtrip"));
    assert!(project.exists("build/manifest.yaml"));
    assert!(project.exists("build/cfg/extract-actors.json"));
    assert!(project.exists("build/cfg/write-actors.json"));
    assert!(project.exists("build/effective_config.json"));

    // A compile session was recorded.
    let sessions = project.sessions();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].starts_with("compile_"));
}

#[test]
fn compile_is_deterministic() {
    let project = Project::with_csv_pipeline();
    assert_eq!(exit_code(&project.osiris(&["compile", "pipeline.yaml", "--out", "a"])), 0);
    assert_eq!(exit_code(&project.osiris(&["compile", "pipeline.yaml", "--out", "b"])), 0);

    for cfg in [
        "cfg/extract-actors.json",
        "cfg/write-actors.json",
        "effective_config.json",
    ] {
        similar_asserts::assert_eq!(
            project.read(&format!("a/{cfg}")),
            project.read(&format!("b/{cfg}"))
        );
    }

    let strip = |text: String| -> String {
        text.lines()
            .filter(|l| !l.trim_start().starts_with("generated_at:"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    similar_asserts::assert_eq!(
        strip(project.read("a/manifest.yaml")),
        strip(project.read("b/manifest.yaml"))
    );
}

#[test]
fn compile_auto_reuses_cache() {
    let project = Project::with_csv_pipeline();
    assert_eq!(exit_code(&project.osiris(&["compile", "pipeline.yaml"])), 0);

    let output = project.osiris(&["compile", "pipeline.yaml"]);
    assert_eq!(exit_code(&output), 0);
    assert!(stdout(&output).contains("cached"));
}

#[test]
fn compile_never_without_cache_fails() {
    let project = Project::with_csv_pipeline();
    let output = project.osiris(&["compile", "pipeline.yaml", "--compile", "never"]);
    assert_eq!(exit_code(&output), 1);
    assert!(stderr(&output).contains("never"));
}

#[test]
fn inline_secret_exits_2() {
    let project = Project::new();
    project.write(
        "pipeline.yaml",
        r#"
oml_version: "0.1.0"
name: leaky
steps:
  - id: extract
    component: mysql.extractor
    mode: extract
    config:
      query: "SELECT 1"
      password: hunter2
"#,
    );

    let output = project.osiris(&["compile", "pipeline.yaml"]);
    assert_eq!(exit_code(&output), 2);
    let message = stderr(&output);
    assert!(message.contains("extract"));
    assert!(message.contains("/password"));
    assert!(!project.exists("build/manifest.yaml"));
}

#[test]
fn unknown_component_exits_2() {
    let project = Project::new();
    project.write(
        "pipeline.yaml",
        r#"
oml_version: "0.1.0"
name: unknown
steps:
  - id: extract
    component: oracle.extractor
    mode: extract
    config: {}
"#,
    );

    let output = project.osiris(&["compile", "pipeline.yaml"]);
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("oracle.extractor"));
}

#[test]
fn malformed_param_exits_2() {
    let project = Project::with_csv_pipeline();
    let output = project.osiris(&["compile", "pipeline.yaml", "--param", "notkv"]);
    assert_eq!(exit_code(&output), 2);
    assert!(stderr(&output).contains("KEY=VALUE"));
}

#[test]
fn json_error_output_is_structured() {
    let project = Project::new();
    project.write(
        "pipeline.yaml",
        r#"
oml_version: "0.1.0"
name: leaky
steps:
  - id: extract
    component: mysql.extractor
    mode: extract
    config: {password: hunter2}
"#,
    );

    let output = project.osiris(&["--json", "compile", "pipeline.yaml"]);
    assert_eq!(exit_code(&output), 2);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["status"], "error");
    assert_eq!(value["error_type"], "inline_secret");
}

#[test]
fn profile_params_change_the_fingerprint() {
    let project = Project::new();
    project.write(
        "pipeline.yaml",
        r#"
oml_version: "0.1.0"
name: parametrized
params:
  source:
    default: data/actors.csv
profiles:
  alt:
    params:
      source: data/alt.csv
steps:
  - id: extract
    component: filesystem.csv_extractor
    mode: extract
    config:
      path: "${params.source}"
"#,
    );

    let default_run = project.osiris(&["--json", "compile", "pipeline.yaml", "--out", "a"]);
    assert_eq!(exit_code(&default_run), 0);
    let profile_run = project.osiris(&[
        "--json", "compile", "pipeline.yaml", "--out", "b", "--profile", "alt",
    ]);
    assert_eq!(exit_code(&profile_run), 0);

    let a: serde_json::Value = serde_json::from_str(&stdout(&default_run)).unwrap();
    let b: serde_json::Value = serde_json::from_str(&stdout(&profile_run)).unwrap();
    assert_ne!(a["params_fp"], b["params_fp"]);
    assert_ne!(a["oml_fp"], b["oml_fp"]);

    let cfg = project.read("b/cfg/extract.json");
    assert!(cfg.contains("data/alt.csv"));
}
