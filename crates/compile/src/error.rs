// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the compiler

use osiris_oml::OmlError;
use thiserror::Error;

/// Errors that can occur while compiling an OML document.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Oml(#[from] OmlError),

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("invalid parameter '{0}': expected KEY=VALUE")]
    InvalidParamFormat(String),

    #[error("parameter '{0}' is not declared by the pipeline")]
    UnknownParam(String),

    #[error("step '{step}': config references undeclared parameter '{name}'")]
    UnknownParamReference { step: String, name: String },

    #[error(
        "step '{step}': inline secret at '{pointer}': use a connection reference \
         or ${{ENV_VAR}} instead of a literal value"
    )]
    InlineSecret { step: String, pointer: String },

    #[error("step '{step}': config does not match the component schema: {message}")]
    SchemaValidation { step: String, message: String },

    #[error("dependency cycle involving steps: {}", steps.join(", "))]
    GraphCycle { steps: Vec<String> },

    #[error(
        "no cached manifest matches the current fingerprints \
         (oml_fp {oml_fp}, params_fp {params_fp}) and compile mode is 'never'"
    )]
    CacheMiss { oml_fp: String, params_fp: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Short machine-readable tag for session events and JSON output.
    pub fn error_type(&self) -> &'static str {
        match self {
            CompileError::Oml(OmlError::UnsupportedVersion(_)) => "unsupported_version",
            CompileError::Oml(OmlError::DuplicateStepId(_)) => "duplicate_step_id",
            CompileError::Oml(OmlError::UnknownComponent { .. }) => "unknown_component",
            CompileError::Oml(OmlError::InvalidMode { .. }) => "invalid_mode",
            CompileError::Oml(_) => "invalid_oml",
            CompileError::UnknownProfile(_) => "unknown_profile",
            CompileError::InvalidParamFormat(_) => "invalid_param_format",
            CompileError::UnknownParam(_) => "unknown_param",
            CompileError::UnknownParamReference { .. } => "unknown_param_reference",
            CompileError::InlineSecret { .. } => "inline_secret",
            CompileError::SchemaValidation { .. } => "schema_validation",
            CompileError::GraphCycle { .. } => "graph_cycle",
            CompileError::CacheMiss { .. } => "cache_miss",
            CompileError::Io(_) => "io",
            CompileError::Yaml(_) | CompileError::Json(_) => "serialization",
        }
    }

    /// Exit code class: 2 for user-input errors, 1 for runtime/internal.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::CacheMiss { .. }
            | CompileError::Io(_)
            | CompileError::Yaml(_)
            | CompileError::Json(_) => 1,
            _ => 2,
        }
    }
}
