// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driver contract

use crate::store::InProcStore;
use osiris_core::{Metric, PathError, StepOutput, TableError};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Upstream outputs keyed by the producing step's id.
pub type StepInputs = BTreeMap<String, Arc<StepOutput>>;

/// Errors a driver can surface; any of them aborts the run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("step '{step_id}': missing required config key '{key}'")]
    MissingConfig { step_id: String, key: String },

    #[error("step '{step_id}': {message}")]
    InvalidInput { step_id: String, message: String },

    #[error("step '{step_id}': {message}")]
    Failed { step_id: String, message: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Execution context handed to every driver invocation.
///
/// Structured logging goes through the ambient session; metrics are also
/// recorded locally so the runner can aggregate row totals at cleanup.
/// [`RunContext::db`] hands out the run-scoped in-process store.
pub struct RunContext {
    base_dir: PathBuf,
    db: InProcStore,
    recorded: Arc<Mutex<Vec<Metric>>>,
}

impl RunContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            db: InProcStore::new(),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Directory all driver output paths are rendered under.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The run-scoped in-process table store.
    pub fn db(&self) -> InProcStore {
        self.db.clone()
    }

    /// Emit a driver-defined event with free-form fields.
    pub fn log_event(&self, name: &str, fields: Map<String, Value>) {
        if let Some(session) = osiris_session::current() {
            session.log_raw_event(name, fields);
        }
    }

    /// Emit a metric sample (`rows_read`, `rows_written`, ...).
    pub fn log_metric(
        &self,
        name: &str,
        value: impl Into<serde_json::Number>,
        unit: Option<&str>,
        step_id: Option<&str>,
    ) {
        let mut metric = Metric::new(name, value);
        if let Some(unit) = unit {
            metric = metric.with_unit(unit);
        }
        if let Some(step_id) = step_id {
            metric = metric.with_step(step_id);
        }
        osiris_session::log_metric(&metric);
        self.recorded.lock().push(metric);
    }

    /// Metrics recorded so far in this run.
    pub fn recorded_metrics(&self) -> Vec<Metric> {
        self.recorded.lock().clone()
    }
}

/// A concrete realization of a component.
///
/// `config` is the post-resolution mapping the runner supplies (meta keys
/// stripped, `resolved_connection` injected); `inputs` holds the in-memory
/// outputs of the step's `needs`. Extractors ignore `inputs`; writers that
/// consume but do not produce return [`StepOutput::empty`].
pub trait Driver: Send + Sync {
    fn run(
        &self,
        step_id: &str,
        config: &Value,
        inputs: &StepInputs,
        ctx: &RunContext,
    ) -> Result<StepOutput, DriverError>;
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
