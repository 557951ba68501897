// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! osiris - declarative data pipelines

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{compile, logs, run};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "osiris",
    version,
    about = "Osiris - compile and run declarative data pipelines"
)]
struct Cli {
    /// Sessions root directory
    #[arg(long = "logs-dir", global = true, default_value = "./logs")]
    logs_dir: PathBuf,

    /// Components directory holding per-component spec files
    #[arg(long = "components", global = true, default_value = "components")]
    components: PathBuf,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an OML pipeline into a manifest
    Compile(compile::CompileArgs),
    /// Run a compiled manifest
    Run(run::RunArgs),
    /// Inspect recorded sessions
    Logs(logs::LogsArgs),
}

fn main() {
    let cli = Cli::parse();
    let globals = commands::Globals {
        logs_dir: cli.logs_dir,
        components: cli.components,
        json: cli.json,
    };
    let code = match cli.command {
        Commands::Compile(args) => compile::execute(&globals, args),
        Commands::Run(args) => run::execute(&globals, args),
        Commands::Logs(args) => logs::execute(&globals, args),
    };
    std::process::exit(code);
}
