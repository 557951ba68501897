// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `osiris run`

use super::Globals;
use crate::output;
use clap::Args;
use osiris_connect::ConnectionStore;
use osiris_oml::ComponentRegistry;
use osiris_runtime::Runner;
use osiris_session::{set_current, LogLevel, SessionConfig, SessionContext};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RunArgs {
    /// Compiled manifest file
    pub manifest: PathBuf,

    /// Stop after manifest validation
    #[arg(long)]
    pub dry_run: bool,

    /// Mirror debug-level lines into the session log
    #[arg(long, short)]
    pub verbose: bool,
}

pub fn execute(globals: &Globals, args: RunArgs) -> i32 {
    let mut config = SessionConfig::from_env();
    if args.verbose {
        config.log_level = LogLevel::Debug;
    }
    let session = match SessionContext::create(&globals.logs_dir, "run", config) {
        Ok(session) => session,
        Err(error) => {
            output::emit_error(globals.json, "session", &error.to_string());
            return 1;
        }
    };
    let _guard = set_current(session.clone());

    let components = ComponentRegistry::load(&globals.components);
    let connections = ConnectionStore::from_dir(Path::new("."));
    let runner = Runner::new(
        &components,
        &connections,
        PathBuf::from("."),
        session.dir().join("artifacts"),
    );

    if args.dry_run {
        return match runner.validate(&args.manifest) {
            Ok(manifest) => {
                output::emit(
                    globals.json,
                    &serde_json::json!({
                        "status": "ok",
                        "dry_run": true,
                        "pipeline": manifest.pipeline.id,
                        "steps": manifest.steps.len(),
                    }),
                    || {
                        format!(
                            "manifest ok: {} ({} steps)",
                            manifest.pipeline.id,
                            manifest.steps.len()
                        )
                    },
                );
                0
            }
            Err(error) => {
                output::emit_error(globals.json, "invalid_manifest", &error.to_string());
                error.exit_code()
            }
        };
    }

    match runner.run_checked(&args.manifest) {
        Ok(summary) => {
            output::emit(
                globals.json,
                &serde_json::json!({
                    "status": "ok",
                    "session": session.id().as_str(),
                    "pipeline": summary.pipeline_id,
                    "steps_executed": summary.steps_executed,
                    "total_rows": summary.total_rows,
                    "duration_seconds": summary.duration_seconds,
                }),
                || {
                    format!(
                        "run complete: {} ({} steps, {} rows) session {}",
                        summary.pipeline_id,
                        summary.steps_executed,
                        summary.total_rows,
                        session.id()
                    )
                },
            );
            0
        }
        Err(error) => {
            output::emit_error(globals.json, "run_failed", &error.to_string());
            error.exit_code()
        }
    }
}
