// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::driver::{Driver, DriverError, RunContext, StepInputs};
use crate::registry::{DriverFactory, FactoryTable};
use osiris_core::{Row, StepOutput, Table};
use serde_json::Value;
use std::sync::Arc;

/// A driver with canned behavior for runner tests.
#[derive(Default)]
pub struct FakeDriver {
    pub output: StepOutput,
    /// When set, `run` fails with this message.
    pub fail_with: Option<String>,
    /// When set, reports this many `rows_written` before returning.
    pub rows_written: Option<u64>,
}

impl Driver for FakeDriver {
    fn run(
        &self,
        step_id: &str,
        _config: &Value,
        _inputs: &StepInputs,
        ctx: &RunContext,
    ) -> Result<StepOutput, DriverError> {
        if let Some(message) = &self.fail_with {
            return Err(DriverError::Failed {
                step_id: step_id.to_string(),
                message: message.clone(),
            });
        }
        if let Some(rows) = self.rows_written {
            ctx.log_metric("rows_written", rows, None, Some(step_id));
        }
        Ok(self.output.clone())
    }
}

/// Factory returning a fresh fake with the given output.
pub fn fake_factory(output: StepOutput) -> DriverFactory {
    Arc::new(move || {
        Arc::new(FakeDriver {
            output: output.clone(),
            ..FakeDriver::default()
        }) as Arc<dyn Driver>
    })
}

/// Factory whose driver always fails.
pub fn failing_factory(message: &str) -> DriverFactory {
    let message = message.to_string();
    Arc::new(move || {
        Arc::new(FakeDriver {
            fail_with: Some(message.clone()),
            ..FakeDriver::default()
        }) as Arc<dyn Driver>
    })
}

/// Factory whose driver reports `rows_written` and returns empty output.
pub fn writer_factory(rows: u64) -> DriverFactory {
    Arc::new(move || {
        Arc::new(FakeDriver {
            rows_written: Some(rows),
            ..FakeDriver::default()
        }) as Arc<dyn Driver>
    })
}

/// A driver that records the config it was handed.
pub struct CapturingDriver {
    pub seen: Arc<parking_lot::Mutex<Option<Value>>>,
    pub output: StepOutput,
}

impl Driver for CapturingDriver {
    fn run(
        &self,
        _step_id: &str,
        config: &Value,
        _inputs: &StepInputs,
        _ctx: &RunContext,
    ) -> Result<StepOutput, DriverError> {
        *self.seen.lock() = Some(config.clone());
        Ok(self.output.clone())
    }
}

/// Factory for a [`CapturingDriver`] plus the handle to what it saw.
pub fn capturing_factory(
    output: StepOutput,
) -> (DriverFactory, Arc<parking_lot::Mutex<Option<Value>>>) {
    let seen: Arc<parking_lot::Mutex<Option<Value>>> = Arc::new(parking_lot::Mutex::new(None));
    let seen_in_factory = seen.clone();
    let factory: DriverFactory = Arc::new(move || {
        Arc::new(CapturingDriver {
            seen: seen_in_factory.clone(),
            output: output.clone(),
        }) as Arc<dyn Driver>
    });
    (factory, seen)
}

/// Shorthand for a one-column table with the given ids.
pub fn id_table(ids: &[i64]) -> Table {
    Table::from_rows(
        ids.iter()
            .map(|id| {
                [("id".to_string(), serde_json::json!(id))]
                    .into_iter()
                    .collect::<Row>()
            })
            .collect(),
    )
}

/// Host table mapping driver strings to fakes for the sample components.
pub fn fake_host_table(extract: Table) -> FactoryTable {
    let mut host = FactoryTable::new();
    host.insert(
        "mysql.extractor".to_string(),
        fake_factory(StepOutput::with_table("df", extract)),
    );
    host.insert("supabase.writer".to_string(), writer_factory(2));
    host
}
