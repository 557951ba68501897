// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OML document parsing and structural validation

use crate::component::ComponentRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// OML versions this build understands.
const SUPPORTED_VERSION_PREFIX: &str = "0.1.";

/// Errors from parsing or validating an OML document
#[derive(Debug, Error)]
pub enum OmlError {
    #[error("invalid OML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unsupported oml_version '{0}' (supported: {SUPPORTED_VERSION_PREFIX}x)")]
    UnsupportedVersion(String),

    #[error("pipeline has no steps")]
    NoSteps,

    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("invalid step id '{0}': use lowercase letters, digits, '-' and '_'")]
    InvalidStepId(String),

    #[error("step '{step}': unknown component '{component}'")]
    UnknownComponent { step: String, component: String },

    #[error("step '{step}': component '{component}' does not declare mode '{mode}'")]
    InvalidMode {
        step: String,
        component: String,
        mode: Mode,
    },

    #[error("step '{step}': unknown upstream step '{upstream}' in needs")]
    UnknownUpstream { step: String, upstream: String },
}

/// Operating mode a component can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Extract,
    Transform,
    Write,
    Discover,
    Analyze,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Extract => "extract",
            Mode::Transform => "transform",
            Mode::Write => "write",
            Mode::Discover => "discover",
            Mode::Analyze => "analyze",
        };
        write!(f, "{s}")
    }
}

/// `params.<name>: {default: value}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    #[serde(default)]
    pub default: Value,
}

/// `profiles.<name>: {params: {...}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDef {
    #[serde(default)]
    pub params: IndexMap<String, Value>,
}

/// One node of the pipeline graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub component: String,
    pub mode: Mode,
    /// `None` = field omitted (implicit dependency on the previous step);
    /// `Some(vec![])` = explicitly no dependency.
    #[serde(default, deserialize_with = "deserialize_needs")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs: Option<Vec<String>>,
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
}

/// A parsed OML pipeline document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmlDocument {
    pub oml_version: String,
    pub name: String,
    #[serde(default)]
    pub params: IndexMap<String, ParamDef>,
    #[serde(default)]
    pub profiles: IndexMap<String, ProfileDef>,
    pub steps: Vec<Step>,
}

impl OmlDocument {
    /// Parse an OML document from YAML text.
    pub fn parse(text: &str) -> Result<Self, OmlError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Check the structural invariants against loaded component specs:
    /// supported version, well-formed unique step ids, known components,
    /// declared modes, and `needs` referencing real upstream steps.
    pub fn validate(&self, components: &ComponentRegistry) -> Result<(), OmlError> {
        if !self.oml_version.starts_with(SUPPORTED_VERSION_PREFIX) {
            return Err(OmlError::UnsupportedVersion(self.oml_version.clone()));
        }
        if self.steps.is_empty() {
            return Err(OmlError::NoSteps);
        }

        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if !is_valid_step_id(&step.id) {
                return Err(OmlError::InvalidStepId(step.id.clone()));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(OmlError::DuplicateStepId(step.id.clone()));
            }
        }

        for step in &self.steps {
            let spec = components.get(&step.component).ok_or_else(|| {
                OmlError::UnknownComponent {
                    step: step.id.clone(),
                    component: step.component.clone(),
                }
            })?;
            if !spec.modes.contains(&step.mode) {
                return Err(OmlError::InvalidMode {
                    step: step.id.clone(),
                    component: step.component.clone(),
                    mode: step.mode,
                });
            }
            if let Some(needs) = &step.needs {
                for upstream in needs {
                    if !seen.contains(upstream.as_str()) {
                        return Err(OmlError::UnknownUpstream {
                            step: step.id.clone(),
                            upstream: upstream.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

fn is_valid_step_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && id.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// `needs` accepts a sequence of step ids or a mapping whose keys are the
/// step ids (values ignored). A missing field stays `None`.
fn deserialize_needs<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Needs {
        List(Vec<String>),
        Map(IndexMap<String, Value>),
    }

    let needs = Option::<Needs>::deserialize(deserializer)?;
    Ok(needs.map(|n| match n {
        Needs::List(ids) => ids,
        Needs::Map(map) => map.into_keys().collect(),
    }))
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
