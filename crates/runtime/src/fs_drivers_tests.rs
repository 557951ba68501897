// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::driver::{Driver, DriverError, RunContext, StepInputs};
use osiris_core::StepOutput;
use serde_json::json;
use std::sync::Arc;

fn actors() -> osiris_core::Table {
    osiris_core::Table::from_rows(vec![
        [("id".to_string(), json!(1)), ("name".to_string(), json!("Tom"))]
            .into_iter()
            .collect(),
        [("id".to_string(), json!(2)), ("name".to_string(), json!("Morgan"))]
            .into_iter()
            .collect(),
        [("id".to_string(), json!(3)), ("name".to_string(), json!("Meryl"))]
            .into_iter()
            .collect(),
    ])
}

fn inputs_with_table() -> StepInputs {
    let mut inputs = StepInputs::new();
    inputs.insert(
        "extract".to_string(),
        Arc::new(StepOutput::with_table("df", actors())),
    );
    inputs
}

#[test]
fn writer_materializes_sorted_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    let config = json!({"path": "out/actors.csv"});

    let output = CsvWriterDriver
        .run("write", &config, &inputs_with_table(), &ctx)
        .unwrap();
    assert!(output.is_empty());

    let written = std::fs::read_to_string(tmp.path().join("out/actors.csv")).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("id,name"));
    assert_eq!(lines.filter(|l| !l.is_empty()).count(), 3);

    let metrics = ctx.recorded_metrics();
    assert_eq!(metrics[0].metric, "rows_written");
    assert_eq!(metrics[0].value.as_u64(), Some(3));
    assert_eq!(metrics[0].step_id.as_deref(), Some("write"));
}

#[test]
fn writer_requires_path() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    let err = CsvWriterDriver
        .run("write", &json!({}), &inputs_with_table(), &ctx)
        .unwrap_err();
    assert!(matches!(err, DriverError::MissingConfig { key, .. } if key == "path"));
}

#[test]
fn writer_requires_a_table_input() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    let err = CsvWriterDriver
        .run("write", &json!({"path": "out.csv"}), &StepInputs::new(), &ctx)
        .unwrap_err();
    assert!(matches!(err, DriverError::InvalidInput { .. }));
}

#[test]
fn writer_rejects_escaping_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    let err = CsvWriterDriver
        .run(
            "write",
            &json!({"path": "../escape.csv"}),
            &inputs_with_table(),
            &ctx,
        )
        .unwrap_err();
    assert!(matches!(err, DriverError::Path(_)));
}

#[test]
fn writer_renders_templates() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    CsvWriterDriver
        .run(
            "write",
            &json!({"path": "out/{step_id}.csv"}),
            &inputs_with_table(),
            &ctx,
        )
        .unwrap();
    assert!(tmp.path().join("out/write.csv").is_file());
}

#[test]
fn writer_honors_custom_delimiter() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    CsvWriterDriver
        .run(
            "write",
            &json!({"path": "out.csv", "delimiter": ";"}),
            &inputs_with_table(),
            &ctx,
        )
        .unwrap();
    let written = std::fs::read_to_string(tmp.path().join("out.csv")).unwrap();
    assert!(written.starts_with("id;name"));
}

#[test]
fn extractor_reads_back_what_the_writer_wrote() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    CsvWriterDriver
        .run(
            "write",
            &json!({"path": "out/actors.csv"}),
            &inputs_with_table(),
            &ctx,
        )
        .unwrap();

    let output = CsvExtractorDriver
        .run(
            "read",
            &json!({"path": "out/actors.csv"}),
            &StepInputs::new(),
            &ctx,
        )
        .unwrap();
    let table = output.primary_table().unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows()[0]["name"], json!("Tom"));

    let rows_read = ctx
        .recorded_metrics()
        .into_iter()
        .find(|m| m.metric == "rows_read")
        .unwrap();
    assert_eq!(rows_read.value.as_u64(), Some(3));
}

#[test]
fn extractor_honors_limit() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("data.csv"), "id\n1\n2\n3\n4\n").unwrap();
    let ctx = RunContext::new(tmp.path());

    let output = CsvExtractorDriver
        .run(
            "read",
            &json!({"path": "data.csv", "limit": 2}),
            &StepInputs::new(),
            &ctx,
        )
        .unwrap();
    assert_eq!(output.primary_table().unwrap().row_count(), 2);
}

#[test]
fn extractor_missing_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(tmp.path());
    let err = CsvExtractorDriver
        .run("read", &json!({"path": "nope.csv"}), &StepInputs::new(), &ctx)
        .unwrap_err();
    assert!(matches!(err, DriverError::Failed { .. }));
}
