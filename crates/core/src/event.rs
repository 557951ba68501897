// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured session events and metrics
//!
//! Events serialize as `{"event": "<name>", ...fields}`; the session context
//! wraps them with `ts` and `session` when appending to `events.jsonl`.

use serde::{Deserialize, Serialize};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Events emitted by the compiler and runner over a session's lifetime.
///
/// Serializes with `{"event": "event_name", ...fields}` format.
/// Unknown event names deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // -- compile --
    CompileStart {
        oml_path: String,
    },

    OmlValidated {
        oml_version: String,
        pipeline: String,
        steps: usize,
    },

    CompileComplete {
        pipeline: String,
        oml_fp: String,
        params_fp: String,
        duration_ms: u64,
        /// True when a cached manifest with matching fingerprints was reused.
        cached: bool,
    },

    CompileError {
        error_type: String,
        message: String,
    },

    /// A step relied on the implicit previous-step dependency because its
    /// `needs` field was neither a list nor explicitly empty.
    DependencyDefaulted {
        step_id: String,
        needs: Vec<String>,
    },

    // -- run --
    RunStart {
        pipeline_id: String,
        profile: String,
        manifest_path: String,
    },

    DriversRegistered {
        drivers: Vec<String>,
    },

    DriverRegistrationFailed {
        component: String,
        driver: String,
        error: String,
    },

    StepStart {
        step_id: String,
        driver: String,
    },

    ConnectionResolveStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
        family: String,
        alias: String,
    },

    ConnectionResolveComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
        family: String,
        alias: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Name of the unresolved environment variable on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env_var: Option<String>,
    },

    ConfigMetaStripped {
        step_id: String,
        keys: Vec<String>,
    },

    InputsResolved {
        step_id: String,
        from_step: String,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<u64>,
        from_memory: bool,
    },

    ArtifactCreated {
        step_id: String,
        path: String,
    },

    StepComplete {
        step_id: String,
        driver: String,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows_processed: Option<u64>,
    },

    StepError {
        step_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        driver: Option<String>,
        error: String,
    },

    CleanupComplete {
        steps_executed: usize,
        total_rows: u64,
    },

    RunEnd {
        status: RunStatus,
        duration_seconds: f64,
        steps_executed: usize,
    },

    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
    },

    /// Catch-all for unknown event names (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::CompileStart { .. } => "compile_start",
            Event::OmlValidated { .. } => "oml_validated",
            Event::CompileComplete { .. } => "compile_complete",
            Event::CompileError { .. } => "compile_error",
            Event::DependencyDefaulted { .. } => "dependency_defaulted",
            Event::RunStart { .. } => "run_start",
            Event::DriversRegistered { .. } => "drivers_registered",
            Event::DriverRegistrationFailed { .. } => "driver_registration_failed",
            Event::StepStart { .. } => "step_start",
            Event::ConnectionResolveStart { .. } => "connection_resolve_start",
            Event::ConnectionResolveComplete { .. } => "connection_resolve_complete",
            Event::ConfigMetaStripped { .. } => "config_meta_stripped",
            Event::InputsResolved { .. } => "inputs_resolved",
            Event::ArtifactCreated { .. } => "artifact_created",
            Event::StepComplete { .. } => "step_complete",
            Event::StepError { .. } => "step_error",
            Event::CleanupComplete { .. } => "cleanup_complete",
            Event::RunEnd { .. } => "run_end",
            Event::RunError { .. } => "run_error",
            Event::Custom => "custom",
        }
    }

    /// Severity attached to the event when written to the JSONL stream.
    ///
    /// The session reader derives its warning/error counters from this field.
    pub fn level(&self) -> Option<&'static str> {
        match self {
            Event::DependencyDefaulted { .. } | Event::DriverRegistrationFailed { .. } => {
                Some("warning")
            }
            Event::CompileError { .. } | Event::StepError { .. } | Event::RunError { .. } => {
                Some("error")
            }
            Event::ConnectionResolveComplete { ok: false, .. } => Some("error"),
            _ => None,
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::CompileStart { oml_path } => format!("{t} oml={oml_path}"),
            Event::OmlValidated {
                oml_version,
                pipeline,
                steps,
            } => format!("{t} pipeline={pipeline} oml_version={oml_version} steps={steps}"),
            Event::CompileComplete {
                pipeline,
                oml_fp,
                cached,
                ..
            } => {
                use crate::id::ShortId;
                format!("{t} pipeline={pipeline} oml_fp={} cached={cached}", oml_fp.short(12))
            }
            Event::CompileError {
                error_type,
                message,
            } => format!("{t} type={error_type} message={message}"),
            Event::DependencyDefaulted { step_id, needs } => {
                format!("{t} step={step_id} needs={needs:?}")
            }
            Event::RunStart {
                pipeline_id,
                profile,
                ..
            } => format!("{t} pipeline={pipeline_id} profile={profile}"),
            Event::DriversRegistered { drivers } => format!("{t} count={}", drivers.len()),
            Event::DriverRegistrationFailed {
                component, error, ..
            } => format!("{t} component={component} error={error}"),
            Event::StepStart { step_id, driver } => format!("{t} step={step_id} driver={driver}"),
            Event::ConnectionResolveStart {
                step_id,
                family,
                alias,
            } => match step_id {
                Some(id) => format!("{t} step={id} family={family} alias={alias}"),
                None => format!("{t} family={family} alias={alias}"),
            },
            Event::ConnectionResolveComplete {
                step_id,
                family,
                alias,
                ok,
                ..
            } => match step_id {
                Some(id) => format!("{t} step={id} family={family} alias={alias} ok={ok}"),
                None => format!("{t} family={family} alias={alias} ok={ok}"),
            },
            Event::ConfigMetaStripped { step_id, keys } => {
                format!("{t} step={step_id} keys={keys:?}")
            }
            Event::InputsResolved {
                step_id,
                from_step,
                key,
                rows,
                ..
            } => match rows {
                Some(n) => format!("{t} step={step_id} from={from_step} key={key} rows={n}"),
                None => format!("{t} step={step_id} from={from_step} key={key}"),
            },
            Event::ArtifactCreated { step_id, path } => format!("{t} step={step_id} path={path}"),
            Event::StepComplete {
                step_id,
                duration_ms,
                rows_processed,
                ..
            } => match rows_processed {
                Some(n) => format!("{t} step={step_id} duration_ms={duration_ms} rows={n}"),
                None => format!("{t} step={step_id} duration_ms={duration_ms}"),
            },
            Event::StepError { step_id, error, .. } => format!("{t} step={step_id} error={error}"),
            Event::CleanupComplete {
                steps_executed,
                total_rows,
            } => format!("{t} steps={steps_executed} total_rows={total_rows}"),
            Event::RunEnd {
                status,
                steps_executed,
                ..
            } => format!("{t} status={status} steps={steps_executed}"),
            Event::RunError { message, step_id } => match step_id {
                Some(id) => format!("{t} step={id} message={message}"),
                None => format!("{t} message={message}"),
            },
            Event::Custom => t.to_string(),
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            Event::StepStart { step_id, .. }
            | Event::ConfigMetaStripped { step_id, .. }
            | Event::InputsResolved { step_id, .. }
            | Event::ArtifactCreated { step_id, .. }
            | Event::StepComplete { step_id, .. }
            | Event::StepError { step_id, .. }
            | Event::DependencyDefaulted { step_id, .. } => Some(step_id),
            Event::ConnectionResolveStart { step_id, .. }
            | Event::ConnectionResolveComplete { step_id, .. }
            | Event::RunError { step_id, .. } => step_id.as_deref(),
            _ => None,
        }
    }
}

/// A single metric sample appended to `metrics.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric: String,
    pub value: serde_json::Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl Metric {
    pub fn new(metric: impl Into<String>, value: impl Into<serde_json::Number>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
            unit: None,
            step_id: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
