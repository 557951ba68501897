// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `osiris compile`

use super::Globals;
use crate::output;
use clap::Args;
use osiris_compile::{compile, CompileMode, CompileOptions};
use osiris_oml::ComponentRegistry;
use osiris_session::{set_current, SessionConfig, SessionContext};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args)]
pub struct CompileArgs {
    /// OML pipeline file
    pub oml: PathBuf,

    /// Output directory for the manifest and per-step configs
    #[arg(long, default_value = "build")]
    pub out: PathBuf,

    /// Profile whose params override the OML defaults
    #[arg(long)]
    pub profile: Option<String>,

    /// Parameter override (repeatable), KEY=VALUE
    #[arg(long = "param", value_name = "K=V")]
    pub params: Vec<String>,

    /// Cache behavior: auto, force, or never
    #[arg(long = "compile", default_value = "auto")]
    pub mode: CompileMode,
}

pub fn execute(globals: &Globals, args: CompileArgs) -> i32 {
    let mut cli_params = BTreeMap::new();
    for raw in &args.params {
        match osiris_compile::params::parse_cli_param(raw) {
            Ok((key, value)) => {
                cli_params.insert(key, value);
            }
            Err(error) => {
                output::emit_error(globals.json, error.error_type(), &error.to_string());
                return error.exit_code();
            }
        }
    }

    let session = match SessionContext::create(&globals.logs_dir, "compile", SessionConfig::from_env())
    {
        Ok(session) => session,
        Err(error) => {
            output::emit_error(globals.json, "session", &error.to_string());
            return 1;
        }
    };
    let _guard = set_current(session.clone());

    let components = ComponentRegistry::load(&globals.components);
    let options = CompileOptions {
        out_dir: args.out,
        profile: args.profile,
        cli_params,
        mode: args.mode,
    };

    match compile(&components, &args.oml, &options) {
        Ok(report) => {
            output::emit(
                globals.json,
                &serde_json::json!({
                    "status": "ok",
                    "session": session.id().as_str(),
                    "pipeline": report.pipeline,
                    "steps": report.steps,
                    "manifest": report.manifest_path.display().to_string(),
                    "oml_fp": report.oml_fp,
                    "params_fp": report.params_fp,
                    "cached": report.cached,
                }),
                || {
                    format!(
                        "compiled {} ({} steps{}) -> {}",
                        report.pipeline,
                        report.steps,
                        if report.cached { ", cached" } else { "" },
                        report.manifest_path.display()
                    )
                },
            );
            0
        }
        Err(error) => {
            output::emit_error(globals.json, error.error_type(), &error.to_string());
            error.exit_code()
        }
    }
}
