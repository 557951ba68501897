// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `osiris logs`

use super::Globals;
use crate::output;
use clap::{Args, Subcommand};
use osiris_session::{bundle_session, gc_sessions, SessionReader, SessionSummary};
use std::path::PathBuf;

#[derive(Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

#[derive(Subcommand)]
pub enum LogsCommand {
    /// List sessions, newest first
    List {
        /// Maximum number of sessions to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one session's summary
    Show {
        #[arg(long)]
        session: String,
    },
    /// Show the most recent session
    Last,
    /// Pack a session into a compressed bundle
    Bundle {
        #[arg(long)]
        session: String,
        /// Output file (default: <session>.bundle.zst)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete old sessions by age, then by total size
    Gc {
        #[arg(long)]
        days: u32,
        #[arg(long = "max-gb")]
        max_gb: f64,
    },
}

pub fn execute(globals: &Globals, args: LogsArgs) -> i32 {
    let reader = SessionReader::new(globals.logs_dir.clone());
    match args.command {
        LogsCommand::List { limit } => {
            let sessions = reader.list_sessions(limit);
            output::emit(globals.json, &sessions, || render_list(&sessions));
            0
        }
        LogsCommand::Show { session } => match reader.read_session(&session) {
            Some(summary) => {
                output::emit(globals.json, &summary, || render_summary(&summary));
                0
            }
            None => {
                output::emit_error(
                    globals.json,
                    "unknown_session",
                    &format!("no session named '{session}'"),
                );
                2
            }
        },
        LogsCommand::Last => match reader.last_session() {
            Some(summary) => {
                output::emit(globals.json, &summary, || render_summary(&summary));
                0
            }
            None => {
                output::emit_error(globals.json, "no_sessions", "no sessions recorded yet");
                2
            }
        },
        LogsCommand::Bundle { session, out } => {
            if reader.read_session(&session).is_none() {
                output::emit_error(
                    globals.json,
                    "unknown_session",
                    &format!("no session named '{session}'"),
                );
                return 2;
            }
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{session}.bundle.zst")));
            match bundle_session(&globals.logs_dir, &session, &out) {
                Ok(()) => {
                    output::emit(
                        globals.json,
                        &serde_json::json!({
                            "status": "ok",
                            "session": session,
                            "bundle": out.display().to_string(),
                        }),
                        || format!("bundled {session} -> {}", out.display()),
                    );
                    0
                }
                Err(error) => {
                    output::emit_error(globals.json, "bundle_failed", &error.to_string());
                    1
                }
            }
        }
        LogsCommand::Gc { days, max_gb } => match gc_sessions(&globals.logs_dir, days, max_gb) {
            Ok(report) => {
                output::emit(globals.json, &report, || {
                    format!(
                        "removed {} sessions, freed {} bytes",
                        report.removed.len(),
                        report.bytes_freed
                    )
                });
                0
            }
            Err(error) => {
                output::emit_error(globals.json, "gc_failed", &error.to_string());
                1
            }
        },
    }
}

fn render_list(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "no sessions recorded yet".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "{}  {}  steps {}/{}  rows in/out {}/{}",
                s.session_id, s.status, s.steps_ok, s.steps_total, s.rows_in, s.rows_out
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_summary(s: &SessionSummary) -> String {
    let mut lines = vec![
        format!("session:    {}", s.session_id),
        format!("status:     {}", s.status),
        format!(
            "steps:      {} total, {} ok, {} failed",
            s.steps_total, s.steps_ok, s.steps_failed
        ),
        format!("rows:       {} in, {} out", s.rows_in, s.rows_out),
    ];
    if let Some(pipeline) = &s.pipeline_name {
        lines.push(format!("pipeline:   {pipeline}"));
    }
    if let Some(started) = &s.started_at {
        lines.push(format!("started:    {started}"));
    }
    if s.duration_ms > 0 {
        lines.push(format!("duration:   {}ms", s.duration_ms));
    }
    if !s.tables.is_empty() {
        lines.push(format!("tables:     {}", s.tables.join(", ")));
    }
    if s.warnings > 0 || s.errors > 0 {
        lines.push(format!(
            "diagnostics: {} warnings, {} errors",
            s.warnings, s.errors
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
