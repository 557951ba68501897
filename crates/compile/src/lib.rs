// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! osiris-compile: OML → manifest compiler
//!
//! Compilation turns a validated OML document into a deterministic,
//! secret-free execution plan: `manifest.yaml`, one JSON config per step
//! under `cfg/`, and an `effective_config.json` audit of the resolved
//! parameters. Identical inputs produce byte-identical outputs (modulo the
//! `generated_at` timestamp), which is what makes the content-addressed
//! cache sound.

pub mod compiler;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod manifest;
pub mod params;

pub use compiler::{compile, CompileMode, CompileOptions, CompileReport};
pub use error::CompileError;
pub use fingerprint::{canonical_fingerprint, canonical_json};
pub use graph::{order_steps, OrderedStep};
pub use manifest::{
    Fingerprints, Manifest, ManifestError, ManifestMeta, ManifestPipeline, ManifestStep,
};
pub use params::{resolve_params, ParamSource, ResolvedParam, ResolvedParams};
