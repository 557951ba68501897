// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-ordered manifest execution

use crate::driver::{RunContext, StepInputs};
use crate::registry::{DriverRegistry, FactoryTable};
use osiris_compile::{Manifest, ManifestError, ManifestStep};
use osiris_connect::{parse_reference, ConnectError, ConnectionStore};
use osiris_core::{mask_secrets, Event, Metric, RunStatus, StepOutput};
use osiris_oml::ComponentRegistry;
use osiris_session::log_event;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Driver(#[from] crate::driver::DriverError),

    #[error("no driver registered for component '{component}'")]
    DriverNotRegistered { component: String },

    #[error(
        "step '{step_id}': connection family mismatch: step family is '{step_family}', \
         reference is '@{ref_family}.…'"
    )]
    ConnectionFamilyMismatch {
        step_id: String,
        step_family: String,
        ref_family: String,
    },

    #[error("step '{step_id}': upstream output '{upstream}' is not available")]
    MissingInput { step_id: String, upstream: String },

    #[error("step '{step_id}': cannot load config {path}: {message}")]
    Config {
        step_id: String,
        path: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Exit code class: 2 for environment errors, 1 for runtime.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Connect(_) | RunnerError::ConnectionFamilyMismatch { .. } => 2,
            _ => 1,
        }
    }
}

/// What a completed run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub pipeline_id: String,
    pub steps_executed: usize,
    pub total_rows: u64,
    pub duration_seconds: f64,
}

/// Executes a compiled manifest step by step.
pub struct Runner<'a> {
    components: &'a ComponentRegistry,
    connections: &'a ConnectionStore,
    host_factories: FactoryTable,
    /// Driver output paths are rendered under this directory.
    base_dir: PathBuf,
    /// `cleaned_config.json` and driver artifacts land here, per step.
    artifacts_dir: PathBuf,
}

impl<'a> Runner<'a> {
    pub fn new(
        components: &'a ComponentRegistry,
        connections: &'a ConnectionStore,
        base_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            components,
            connections,
            host_factories: FactoryTable::new(),
            base_dir: base_dir.into(),
            artifacts_dir: artifacts_dir.into(),
        }
    }

    /// Add host-supplied driver factories (keyed by `x-runtime.driver`).
    pub fn with_factories(mut self, host: FactoryTable) -> Self {
        self.host_factories = host;
        self
    }

    /// Load the manifest and re-check its step ordering (the dry-run stop
    /// point).
    pub fn validate(&self, manifest_path: &Path) -> Result<Manifest, RunnerError> {
        let manifest = Manifest::load(manifest_path)?;
        manifest.assert_sorted()?;
        Ok(manifest)
    }

    /// Execute a manifest; `true` on success.
    pub fn run(&self, manifest_path: &Path) -> bool {
        self.run_checked(manifest_path).is_ok()
    }

    /// Execute a manifest, emitting the full event sequence; the first
    /// failure aborts with `step_error` + `run_error` and a failed
    /// `run_end`.
    pub fn run_checked(&self, manifest_path: &Path) -> Result<RunSummary, RunnerError> {
        let started = Instant::now();
        let manifest = match self.validate(manifest_path) {
            Ok(manifest) => manifest,
            Err(error) => {
                log_event(&Event::RunError {
                    message: error.to_string(),
                    step_id: None,
                });
                return Err(error);
            }
        };

        let registry = DriverRegistry::from_components(self.components, &self.host_factories);
        let mut drivers: Vec<String> = manifest
            .steps
            .iter()
            .map(|s| s.driver.clone())
            .filter(|d| registry.contains(d))
            .collect();
        drivers.sort();
        drivers.dedup();
        log_event(&Event::DriversRegistered { drivers });

        log_event(&Event::RunStart {
            pipeline_id: manifest.pipeline.id.clone(),
            profile: manifest.meta.profile.clone(),
            manifest_path: manifest_path.display().to_string(),
        });

        let ctx = RunContext::new(self.base_dir.clone());
        let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));

        // Remaining downstream consumers per producing step; an output is
        // dropped once nothing left in the manifest needs it.
        let mut consumers: HashMap<String, usize> = HashMap::new();
        for step in &manifest.steps {
            for upstream in &step.needs {
                *consumers.entry(upstream.clone()).or_insert(0) += 1;
            }
        }

        let mut results: BTreeMap<String, Arc<StepOutput>> = BTreeMap::new();
        let mut steps_executed = 0usize;
        for step in &manifest.steps {
            match self.execute_step(step, manifest_dir, &results, &ctx, &registry) {
                Ok(output) => {
                    steps_executed += 1;
                    results.insert(step.id.clone(), output);
                    for upstream in &step.needs {
                        if let Some(count) = consumers.get_mut(upstream) {
                            *count -= 1;
                            if *count == 0 {
                                results.remove(upstream);
                            }
                        }
                    }
                }
                Err(error) => {
                    log_event(&Event::StepError {
                        step_id: step.id.clone(),
                        driver: Some(step.driver.clone()),
                        error: error.to_string(),
                    });
                    log_event(&Event::RunError {
                        message: error.to_string(),
                        step_id: Some(step.id.clone()),
                    });
                    log_event(&Event::RunEnd {
                        status: RunStatus::Failed,
                        duration_seconds: started.elapsed().as_secs_f64(),
                        steps_executed,
                    });
                    return Err(error);
                }
            }
        }

        let total_rows = writer_total_rows(&manifest, &ctx, &results);
        log_event(&Event::CleanupComplete {
            steps_executed,
            total_rows,
        });
        let duration_seconds = started.elapsed().as_secs_f64();
        log_event(&Event::RunEnd {
            status: RunStatus::Success,
            duration_seconds,
            steps_executed,
        });

        Ok(RunSummary {
            pipeline_id: manifest.pipeline.id,
            steps_executed,
            total_rows,
            duration_seconds,
        })
    }

    fn execute_step(
        &self,
        step: &ManifestStep,
        manifest_dir: &Path,
        results: &BTreeMap<String, Arc<StepOutput>>,
        ctx: &RunContext,
        registry: &DriverRegistry,
    ) -> Result<Arc<StepOutput>, RunnerError> {
        let step_started = Instant::now();
        log_event(&Event::StepStart {
            step_id: step.id.clone(),
            driver: step.driver.clone(),
        });

        let cfg_path = manifest_dir.join(&step.cfg_path);
        let mut config: Value = fs::read_to_string(&cfg_path)
            .map_err(|e| RunnerError::Config {
                step_id: step.id.clone(),
                path: cfg_path.display().to_string(),
                message: e.to_string(),
            })
            .and_then(|text| {
                serde_json::from_str(&text).map_err(|e| RunnerError::Config {
                    step_id: step.id.clone(),
                    path: cfg_path.display().to_string(),
                    message: e.to_string(),
                })
            })?;

        self.resolve_step_connection(step, &mut config)?;
        strip_meta_keys(&step.id, &mut config);
        self.write_cleaned_config(step, &config)?;

        let mut inputs = StepInputs::new();
        for upstream in &step.needs {
            let output = results
                .get(upstream)
                .cloned()
                .ok_or_else(|| RunnerError::MissingInput {
                    step_id: step.id.clone(),
                    upstream: upstream.clone(),
                })?;
            log_event(&Event::InputsResolved {
                step_id: step.id.clone(),
                from_step: upstream.clone(),
                key: output
                    .iter()
                    .next()
                    .map(|(k, _)| k.clone())
                    .unwrap_or_default(),
                rows: output.primary_table().map(|t| t.row_count()),
                from_memory: true,
            });
            inputs.insert(upstream.clone(), output);
        }

        let driver =
            registry
                .get(&step.driver)
                .ok_or_else(|| RunnerError::DriverNotRegistered {
                    component: step.driver.clone(),
                })?;
        let output = driver.run(&step.id, &config, &inputs, ctx)?;

        let duration_ms = step_started.elapsed().as_millis() as u64;
        let rows_processed = output.rows_processed();
        log_event(&Event::StepComplete {
            step_id: step.id.clone(),
            driver: step.driver.clone(),
            duration_ms,
            rows_processed,
        });
        osiris_session::log_metric(
            &Metric::new("step_duration_ms", duration_ms).with_step(step.id.clone()),
        );

        Ok(Arc::new(output))
    }

    /// Resolve the step's connection, when it has one.
    ///
    /// An explicit `connection: "@family.alias"` is parsed and checked
    /// against the driver's family. Without one, the family default is
    /// resolved, except for `duckdb` (local in-process semantics) and
    /// families absent from the store altogether.
    fn resolve_step_connection(
        &self,
        step: &ManifestStep,
        config: &mut Value,
    ) -> Result<(), RunnerError> {
        let step_family = family_of(&step.driver);
        let conn_ref = config.get("connection").and_then(Value::as_str);
        let resolved = match parse_reference(conn_ref)? {
            Some((ref_family, alias)) => {
                if ref_family != step_family {
                    return Err(RunnerError::ConnectionFamilyMismatch {
                        step_id: step.id.clone(),
                        step_family: step_family.to_string(),
                        ref_family,
                    });
                }
                Some(
                    self.connections
                        .resolve(&ref_family, Some(&alias), Some(&step.id))?,
                )
            }
            None => {
                if step_family == "duckdb" || !self.connections.has_family(step_family) {
                    None
                } else {
                    Some(self.connections.resolve(step_family, None, Some(&step.id))?)
                }
            }
        };

        if let (Some(record), Value::Object(map)) = (resolved, config) {
            map.insert("resolved_connection".to_string(), record);
        }
        Ok(())
    }

    /// Persist the redacted config the driver is about to see.
    fn write_cleaned_config(&self, step: &ManifestStep, config: &Value) -> Result<(), RunnerError> {
        let mut cleaned = config.clone();
        if let Some(spec) = self.components.get(&step.driver) {
            let mut pointers = spec.secrets.clone();
            pointers.extend(
                spec.secrets
                    .iter()
                    .map(|p| format!("/resolved_connection{p}")),
            );
            mask_secrets(&mut cleaned, &pointers);
        }

        let dir = self.artifacts_dir.join(&step.id);
        fs::create_dir_all(&dir)?;
        let path = dir.join("cleaned_config.json");
        let mut text = serde_json::to_string_pretty(&cleaned).unwrap_or_else(|_| "{}".to_string());
        text.push('\n');
        fs::write(&path, text)?;
        log_event(&Event::ArtifactCreated {
            step_id: step.id.clone(),
            path: path.display().to_string(),
        });
        Ok(())
    }
}

fn family_of(driver: &str) -> &str {
    driver.split('.').next().unwrap_or(driver)
}

/// Writer detection: component-name heuristic with step-id fallback.
fn is_writer(driver: &str, step_id: &str) -> bool {
    if driver.ends_with(".writer") || driver.ends_with(".load") {
        return true;
    }
    step_id.contains("write") || step_id.contains("load")
}

/// Sum of rows written by writer steps only, so a bidirectional
/// extract→write pipeline is not double-counted. The explicit
/// `rows_written` metric wins; a writer without one contributes its
/// `rows_processed` return value.
fn writer_total_rows(
    manifest: &Manifest,
    ctx: &RunContext,
    results: &BTreeMap<String, Arc<StepOutput>>,
) -> u64 {
    let mut written_by_step: HashMap<&str, u64> = HashMap::new();
    let metrics = ctx.recorded_metrics();
    for metric in &metrics {
        if metric.metric != "rows_written" {
            continue;
        }
        let (Some(step_id), Some(value)) = (metric.step_id.as_deref(), metric.value.as_u64())
        else {
            continue;
        };
        let entry = written_by_step.entry(step_id).or_insert(0);
        *entry = (*entry).max(value);
    }

    manifest
        .steps
        .iter()
        .filter(|s| is_writer(&s.driver, &s.id))
        .map(|s| {
            written_by_step.get(s.id.as_str()).copied().unwrap_or_else(|| {
                results
                    .get(&s.id)
                    .and_then(|o| o.rows_processed())
                    .unwrap_or(0)
            })
        })
        .sum()
}

/// Strip meta keys the driver must not see; emits `config_meta_stripped`
/// when any were present.
fn strip_meta_keys(step_id: &str, config: &mut Value) {
    let Value::Object(map) = config else {
        return;
    };
    let mut stripped = Vec::new();
    for key in ["component", "connection"] {
        if map.remove(key).is_some() {
            stripped.push(key.to_string());
        }
    }
    if !stripped.is_empty() {
        log_event(&Event::ConfigMetaStripped {
            step_id: step_id.to_string(),
            keys: stripped,
        });
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
