// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component spec loading and registry
//!
//! Each immediate subdirectory of the components root may carry a
//! `spec.yaml` or `spec.json` describing one component: its modes, the
//! JSON Schema its step configs must satisfy, which config locations are
//! secret, and optionally the driver that realizes it at run time.
//!
//! Invalid specs are logged and skipped; they never abort startup.

use crate::document::Mode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static META_SCHEMA: LazyLock<Option<jsonschema::Validator>> = LazyLock::new(|| {
    let schema: Value = match serde_json::from_str(include_str!("meta_schema.json")) {
        Ok(schema) => schema,
        Err(_) => return None,
    };
    jsonschema::draft202012::new(&schema).ok()
});

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("spec {path} is not valid YAML/JSON: {message}")]
    Parse { path: String, message: String },
    #[error("spec {path} violates the component meta-schema: {message}")]
    MetaSchema { path: String, message: String },
    #[error("spec {path} has an invalid configSchema: {message}")]
    ConfigSchema { path: String, message: String },
    #[error("spec {path}: secret pointer '{pointer}' is not permitted by configSchema")]
    SecretPointer { path: String, pointer: String },
}

/// `x-runtime` block: how the host realizes this component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XRuntime {
    pub driver: String,
}

/// A validated component spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub version: String,
    pub modes: Vec<Mode>,
    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
    #[serde(rename = "configSchema")]
    pub config_schema: Value,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default, rename = "x-runtime")]
    pub x_runtime: Option<XRuntime>,
    /// Conversational-generation hints; carried but ignored by the core.
    #[serde(default, rename = "llmHints", skip_serializing_if = "Option::is_none")]
    pub llm_hints: Option<Value>,
}

impl ComponentSpec {
    /// The dotted-prefix namespace, e.g. `mysql` for `mysql.extractor`.
    pub fn family(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    pub fn driver(&self) -> Option<&str> {
        self.x_runtime.as_ref().map(|x| x.driver.as_str())
    }
}

/// Deterministic, name-sorted mapping of loaded component specs.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    specs: BTreeMap<String, ComponentSpec>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load specs from each immediate subdirectory of `components_root`.
    ///
    /// `spec.yaml` wins over `spec.json` in the same directory. Directories
    /// without a spec file are ignored; invalid specs are logged and
    /// skipped. A missing root yields an empty registry.
    pub fn load(components_root: &Path) -> Self {
        let mut registry = Self::new();
        let entries = match fs::read_dir(components_root) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::warn!(
                    root = %components_root.display(),
                    "components root not found; registry is empty"
                );
                return registry;
            }
        };

        let mut dirs: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let Some(spec_path) = ["spec.yaml", "spec.json"]
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.is_file())
            else {
                continue;
            };
            match load_spec_file(&spec_path) {
                Ok(spec) => {
                    registry.specs.insert(spec.name.clone(), spec);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping invalid component spec");
                }
            }
        }
        registry
    }

    pub fn insert(&mut self, spec: ComponentSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.specs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ComponentSpec)> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// SHA-256 over a canonical projection of the registry, used by
    /// downstream caches to detect spec changes.
    pub fn fingerprint(&self) -> String {
        let mut projection = BTreeMap::new();
        for (name, spec) in &self.specs {
            let mut modes: Vec<String> = spec.modes.iter().map(|m| m.to_string()).collect();
            modes.sort();
            projection.insert(
                name.clone(),
                serde_json::json!({
                    "version": spec.version,
                    "modes": modes,
                    "required": sorted_strings(&spec.config_schema, "required"),
                    "properties": sorted_keys(&spec.config_schema, "properties"),
                }),
            );
        }
        let bytes = serde_json::to_vec(&projection).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        format!("{digest:x}")
    }
}

fn sorted_strings(schema: &Value, field: &str) -> Vec<String> {
    let mut items: Vec<String> = schema
        .get(field)
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    items.sort();
    items
}

fn sorted_keys(schema: &Value, field: &str) -> Vec<String> {
    let mut keys: Vec<String> = schema
        .get(field)
        .and_then(Value::as_object)
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}

/// Parse and validate one spec file.
pub fn load_spec_file(path: &Path) -> Result<ComponentSpec, ComponentError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ComponentError::Io {
        path: display.clone(),
        source,
    })?;

    let raw: Value = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&text).map_err(|e| ComponentError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&text).map_err(|e| ComponentError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?
    };

    if let Some(validator) = META_SCHEMA.as_ref() {
        if let Some(error) = validator.iter_errors(&raw).next() {
            return Err(ComponentError::MetaSchema {
                path: display,
                message: error.to_string(),
            });
        }
    }

    let spec: ComponentSpec =
        serde_json::from_value(raw).map_err(|e| ComponentError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?;

    // configSchema must itself be a valid Draft 2020-12 schema.
    if let Err(e) = jsonschema::draft202012::new(&spec.config_schema) {
        return Err(ComponentError::ConfigSchema {
            path: display,
            message: e.to_string(),
        });
    }

    for pointer in &spec.secrets {
        if !pointer_permitted(&spec.config_schema, pointer) {
            return Err(ComponentError::SecretPointer {
                path: display.clone(),
                pointer: pointer.clone(),
            });
        }
    }

    Ok(spec)
}

/// A secret pointer must address a node present or permitted by the schema.
///
/// Only the first token is checked: a closed schema (`additionalProperties:
/// false`) must list it under `properties`; open schemas permit anything.
fn pointer_permitted(schema: &Value, pointer: &str) -> bool {
    let Some(first) = pointer.trim_start_matches('/').split('/').next() else {
        return false;
    };
    if first.is_empty() {
        return false;
    }
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));
    if !closed {
        return true;
    }
    schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| props.contains_key(first))
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod tests;
