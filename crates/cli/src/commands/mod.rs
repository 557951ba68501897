// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations

pub mod compile;
pub mod logs;
pub mod run;

use std::path::PathBuf;

/// Options shared by every subcommand.
pub struct Globals {
    pub logs_dir: PathBuf,
    pub components: PathBuf,
    pub json: bool,
}
