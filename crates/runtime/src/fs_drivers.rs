// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem CSV drivers
//!
//! The one connector family the core ships end-to-end: a CSV writer that
//! materializes its upstream table to disk and a CSV extractor that reads
//! one back. Both render their `path` config through the templated-path
//! utility, so outputs stay under the run's base directory.

use crate::driver::{Driver, DriverError, RunContext, StepInputs};
use osiris_core::{render_input_path, render_path, PathContext, StepOutput, Table};
use serde_json::{json, Value};
use std::fs;

fn required_str<'v>(config: &'v Value, key: &str, step_id: &str) -> Result<&'v str, DriverError> {
    config
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DriverError::MissingConfig {
            step_id: step_id.to_string(),
            key: key.to_string(),
        })
}

fn delimiter(config: &Value) -> char {
    config
        .get("delimiter")
        .and_then(Value::as_str)
        .and_then(|s| s.chars().next())
        .unwrap_or(',')
}

fn path_context(step_id: &str) -> PathContext {
    let mut ctx = PathContext::new();
    ctx.insert("step_id", step_id);
    ctx.insert("ts", chrono::Utc::now());
    if let Some(session) = osiris_session::current() {
        ctx.insert("session_id", session.id().as_str());
    }
    ctx
}

/// Writes the upstream table to a CSV file.
///
/// Config: `path` (required, `{var}` templates allowed), `delimiter`
/// (default `,`). Consumes the first table-valued input; reports
/// `rows_written` and a `write.complete` event, and returns an empty
/// mapping.
pub struct CsvWriterDriver;

impl Driver for CsvWriterDriver {
    fn run(
        &self,
        step_id: &str,
        config: &Value,
        inputs: &StepInputs,
        ctx: &RunContext,
    ) -> Result<StepOutput, DriverError> {
        let template = required_str(config, "path", step_id)?;
        let table = inputs
            .values()
            .find_map(|output| output.primary_table())
            .ok_or_else(|| DriverError::InvalidInput {
                step_id: step_id.to_string(),
                message: "no table-valued input to write".to_string(),
            })?;

        let rel = render_path(ctx.base_dir(), template, &path_context(step_id), None)?;
        let path = ctx.base_dir().join(&rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, table.to_csv(delimiter(config)))?;

        let rows = table.row_count();
        ctx.log_metric("rows_written", rows, None, Some(step_id));
        let mut fields = serde_json::Map::new();
        fields.insert("step_id".to_string(), json!(step_id));
        fields.insert("path".to_string(), json!(rel));
        fields.insert("rows_written".to_string(), json!(rows));
        ctx.log_event("write.complete", fields);

        Ok(StepOutput::empty())
    }
}

/// Reads a CSV file with a header row into a table.
///
/// Config: `path` (required), `delimiter` (default `,`), `limit` (optional
/// row cap). Reports `rows_read` and returns the table under the `df` key.
pub struct CsvExtractorDriver;

impl Driver for CsvExtractorDriver {
    fn run(
        &self,
        step_id: &str,
        config: &Value,
        _inputs: &StepInputs,
        ctx: &RunContext,
    ) -> Result<StepOutput, DriverError> {
        let template = required_str(config, "path", step_id)?;
        let rel = render_input_path(ctx.base_dir(), template, &path_context(step_id), None)?;
        let path = ctx.base_dir().join(&rel);
        let text = fs::read_to_string(&path).map_err(|e| DriverError::Failed {
            step_id: step_id.to_string(),
            message: format!("cannot read {}: {e}", path.display()),
        })?;

        let mut table = Table::from_csv(&text, delimiter(config))?;
        if let Some(limit) = config.get("limit").and_then(Value::as_u64) {
            let rows = table.rows().to_vec();
            table = Table::from_rows(rows.into_iter().take(limit as usize).collect());
        }

        ctx.log_metric("rows_read", table.row_count(), None, Some(step_id));
        Ok(StepOutput::with_table("df", table))
    }
}

#[cfg(test)]
#[path = "fs_drivers_tests.rs"]
mod tests;
