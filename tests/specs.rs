//! Behavioral specifications for the osiris CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, exit codes, and the files a command leaves behind.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/compile.rs"]
mod compile;
#[path = "specs/errors.rs"]
mod errors;
#[path = "specs/logs.rs"]
mod logs;
#[path = "specs/run.rs"]
mod run;
