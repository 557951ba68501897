// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compiled execution manifest

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid manifest {path}: {message}")]
    Parse { path: String, message: String },
    #[error("manifest steps are not topologically sorted: step '{step}' runs before '{upstream}'")]
    NotSorted { step: String, upstream: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub oml_fp: String,
    pub params_fp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPipeline {
    pub id: String,
    pub version: String,
    pub fingerprints: Fingerprints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStep {
    pub id: String,
    /// Component name realizing this step (`mysql.extractor`, ...).
    pub driver: String,
    /// Relative to the manifest file.
    pub cfg_path: String,
    #[serde(default)]
    pub needs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMeta {
    pub oml_version: String,
    pub profile: String,
    pub generated_at: String,
}

/// The deterministic, secret-free execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub pipeline: ManifestPipeline,
    pub steps: Vec<ManifestStep>,
    pub meta: ManifestMeta,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|e| ManifestError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Safety re-check that every step appears after all of its `needs`.
    pub fn assert_sorted(&self) -> Result<(), ManifestError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            for upstream in &step.needs {
                if !seen.contains(upstream.as_str()) {
                    return Err(ManifestError::NotSorted {
                        step: step.id.clone(),
                        upstream: upstream.clone(),
                    });
                }
            }
            seen.insert(&step.id);
        }
        Ok(())
    }

    pub fn step(&self, id: &str) -> Option<&ManifestStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
