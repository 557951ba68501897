// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::component::{ComponentRegistry, ComponentSpec, XRuntime};
use crate::document::Mode;
use serde_json::json;

/// Build a component spec with an open config schema.
pub fn spec(name: &str, modes: &[Mode], secrets: &[&str], driver: Option<&str>) -> ComponentSpec {
    ComponentSpec {
        name: name.to_string(),
        version: "0.1.0".to_string(),
        modes: modes.to_vec(),
        capabilities: Default::default(),
        config_schema: json!({"type": "object"}),
        secrets: secrets.iter().map(|s| s.to_string()).collect(),
        x_runtime: driver.map(|d| XRuntime {
            driver: d.to_string(),
        }),
        llm_hints: None,
    }
}

/// A registry with the component families the integration scenarios use.
pub fn sample_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.insert(spec(
        "mysql.extractor",
        &[Mode::Extract, Mode::Discover],
        &["/password"],
        Some("mysql.extractor"),
    ));
    registry.insert(spec(
        "duckdb.transform",
        &[Mode::Transform],
        &[],
        Some("duckdb.transform"),
    ));
    registry.insert(spec(
        "supabase.writer",
        &[Mode::Write],
        &["/service_role_key"],
        Some("supabase.writer"),
    ));
    registry.insert(spec(
        "filesystem.csv_writer",
        &[Mode::Write],
        &[],
        Some("filesystem.csv_writer"),
    ));
    registry.insert(spec(
        "filesystem.csv_extractor",
        &[Mode::Extract],
        &[],
        Some("filesystem.csv_extractor"),
    ));
    registry
}
