// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session reading and aggregation
//!
//! Replays a session's `events.jsonl` and `metrics.jsonl` into a
//! [`SessionSummary`]. The reader is deliberately lenient: unknown events
//! are aggregated by their raw fields, corrupt lines are skipped, and row
//! totals follow a precedence rule that avoids double counting.

use osiris_core::redact_text;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Derived outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Success,
    Failed,
    Running,
    #[default]
    Unknown,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Success => write!(f, "success"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Aggregated view of one recorded session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub duration_ms: u64,
    pub status: SessionStatus,
    pub pipeline_name: Option<String>,
    pub oml_version: Option<String>,
    pub steps_total: u64,
    pub steps_ok: u64,
    pub steps_failed: u64,
    pub rows_in: u64,
    pub rows_out: u64,
    pub tables: Vec<String>,
    pub warnings: u64,
    pub errors: u64,
}

/// Per-session accumulator for the row precedence rule.
#[derive(Default)]
struct RowCounts {
    cleanup_total: Option<u64>,
    written_by_step: BTreeMap<String, u64>,
    read_by_step: BTreeMap<String, u64>,
}

impl RowCounts {
    /// `rows_out` precedence: the `cleanup_complete` total wins; otherwise
    /// step-tagged `rows_written`; otherwise step-tagged `rows_read`.
    fn rows_out(&self) -> u64 {
        if let Some(total) = self.cleanup_total {
            return total;
        }
        if !self.written_by_step.is_empty() {
            return self.written_by_step.values().sum();
        }
        self.read_by_step.values().sum()
    }

    fn rows_in(&self) -> u64 {
        self.read_by_step.values().sum()
    }

    fn record(map: &mut BTreeMap<String, u64>, step: &str, value: u64) {
        let entry = map.entry(step.to_string()).or_insert(0);
        // Events and metrics may both report the same step; keep the larger
        // sample rather than summing the duplicates.
        *entry = (*entry).max(value);
    }
}

/// Reads and aggregates sessions under a sessions root.
pub struct SessionReader {
    root: PathBuf,
}

impl SessionReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All sessions, newest first by `(started_at, session_id)`.
    pub fn list_sessions(&self, limit: Option<usize>) -> Vec<SessionSummary> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut sessions: Vec<SessionSummary> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') || name.starts_with('@') {
                    return None;
                }
                self.read_session(&name)
            })
            .collect();
        sessions.sort_by(|a, b| {
            (b.started_at.as_deref().unwrap_or(""), &b.session_id)
                .cmp(&(a.started_at.as_deref().unwrap_or(""), &a.session_id))
        });
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        sessions
    }

    /// The most recently started session, if any.
    pub fn last_session(&self) -> Option<SessionSummary> {
        self.list_sessions(Some(1)).into_iter().next()
    }

    /// Aggregate one session; `None` when the directory does not exist.
    pub fn read_session(&self, session_id: &str) -> Option<SessionSummary> {
        let dir = self.root.join(session_id);
        if !dir.is_dir() {
            return None;
        }
        let mut summary = SessionSummary {
            session_id: session_id.to_string(),
            ..SessionSummary::default()
        };
        let mut rows = RowCounts::default();
        let mut step_ids: Vec<String> = Vec::new();
        let mut tables: Vec<String> = Vec::new();
        let mut saw_start = false;
        let mut saw_terminal = false;
        let mut failed = false;

        for event in read_jsonl(&dir.join("events.jsonl")) {
            let name = event.get("event").and_then(Value::as_str).unwrap_or("");
            let step_id = event.get("step_id").and_then(Value::as_str);

            match name {
                "run_start" | "compile_start" => {
                    saw_start = true;
                    if summary.started_at.is_none() {
                        summary.started_at = ts_of(&event);
                    }
                }
                "oml_validated" => {
                    summary.pipeline_name = event
                        .get("pipeline")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    summary.oml_version = event
                        .get("oml_version")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
                "step_start" => {
                    if let Some(id) = step_id {
                        if !step_ids.iter().any(|s| s == id) {
                            step_ids.push(id.to_string());
                        }
                    }
                }
                "step_complete" => {
                    summary.steps_ok += 1;
                }
                "step_error" => {
                    summary.steps_failed += 1;
                    failed = true;
                }
                "cleanup_complete" => {
                    if let Some(total) = event.get("total_rows").and_then(Value::as_u64) {
                        rows.cleanup_total = Some(total);
                    }
                }
                "run_end" => {
                    saw_terminal = true;
                    summary.finished_at = ts_of(&event);
                    if event.get("status").and_then(Value::as_str) == Some("failed") {
                        failed = true;
                    }
                    if let Some(secs) = event.get("duration_seconds").and_then(Value::as_f64) {
                        summary.duration_ms = (secs * 1000.0) as u64;
                    }
                }
                "run_error" | "compile_error" => {
                    saw_terminal = true;
                    summary.finished_at = ts_of(&event);
                    failed = true;
                }
                "compile_complete" => {
                    saw_terminal = true;
                    summary.finished_at = ts_of(&event);
                    if let Some(ms) = event.get("duration_ms").and_then(Value::as_u64) {
                        summary.duration_ms = ms;
                    }
                }
                _ => {}
            }

            // Row fields on arbitrary events count only when step-tagged.
            if let Some(id) = step_id {
                if let Some(n) = event.get("rows_written").and_then(Value::as_u64) {
                    RowCounts::record(&mut rows.written_by_step, id, n);
                }
                if let Some(n) = event.get("rows_read").and_then(Value::as_u64) {
                    RowCounts::record(&mut rows.read_by_step, id, n);
                }
            }
            if let Some(table) = event.get("table").and_then(Value::as_str) {
                if !tables.iter().any(|t| t == table) {
                    tables.push(table.to_string());
                }
            }
            match event.get("level").and_then(Value::as_str) {
                Some("warning") => summary.warnings += 1,
                Some("error") => summary.errors += 1,
                _ => {}
            }
        }

        for metric in read_jsonl(&dir.join("metrics.jsonl")) {
            let name = metric.get("metric").and_then(Value::as_str).unwrap_or("");
            // Metrics without a step_id are unreliable; ignore them so they
            // cannot double count against event-derived values.
            let Some(step_id) = metric.get("step_id").and_then(Value::as_str) else {
                continue;
            };
            let Some(value) = metric.get("value").and_then(Value::as_u64) else {
                continue;
            };
            match name {
                "rows_written" => RowCounts::record(&mut rows.written_by_step, step_id, value),
                "rows_read" => RowCounts::record(&mut rows.read_by_step, step_id, value),
                _ => {}
            }
        }

        summary.steps_total = step_ids.len() as u64;
        summary.rows_in = rows.rows_in();
        summary.rows_out = rows.rows_out();
        tables.sort();
        summary.tables = tables;
        summary.status = if saw_terminal {
            if failed || summary.steps_failed > 0 || summary.errors > 0 {
                SessionStatus::Failed
            } else {
                SessionStatus::Success
            }
        } else if saw_start {
            SessionStatus::Running
        } else {
            SessionStatus::Unknown
        };
        Some(summary)
    }

    /// Redacted raw text of a session file, for presentation.
    pub fn read_redacted(&self, session_id: &str, file: &str) -> Option<String> {
        let path = self.root.join(session_id).join(file);
        fs::read_to_string(path).ok().map(|s| redact_text(&s))
    }
}

fn ts_of(event: &Value) -> Option<String> {
    event.get("ts").and_then(Value::as_str).map(str::to_string)
}

/// Parse a JSONL file leniently: corrupt lines are skipped.
fn read_jsonl(path: &Path) -> Vec<Value> {
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
