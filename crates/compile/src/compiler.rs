// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compile pipeline: OML in, manifest + per-step configs out

use crate::error::CompileError;
use crate::fingerprint::canonical_fingerprint;
use crate::graph::{order_steps, OrderedStep};
use crate::manifest::{Fingerprints, Manifest, ManifestMeta, ManifestPipeline, ManifestStep};
use crate::params::{resolve_params, substitute_params, ResolvedParams};
use osiris_core::{literal_secret_pointers, Event};
use osiris_oml::{ComponentRegistry, OmlDocument};
use osiris_session::log_event;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Manifest schema version stamped into `pipeline.version`.
const PIPELINE_VERSION: &str = "0.1.0";

/// Cache behavior for an existing manifest with matching fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Reuse on fingerprint match, rewrite otherwise.
    #[default]
    Auto,
    /// Always rewrite.
    Force,
    /// Require a matching cached manifest; fail without one.
    Never,
}

impl std::str::FromStr for CompileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(CompileMode::Auto),
            "force" => Ok(CompileMode::Force),
            "never" => Ok(CompileMode::Never),
            other => Err(format!("invalid compile mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub out_dir: PathBuf,
    pub profile: Option<String>,
    pub cli_params: BTreeMap<String, String>,
    pub mode: CompileMode,
}

/// What a successful compilation produced.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub manifest_path: PathBuf,
    pub pipeline: String,
    pub steps: usize,
    pub oml_fp: String,
    pub params_fp: String,
    /// True when a cached manifest was reused instead of rewritten.
    pub cached: bool,
}

/// Compile an OML document into a manifest under `options.out_dir`.
///
/// Emits `compile_start`, `oml_validated`, and `compile_complete` (or
/// `compile_error`) through the ambient session. Validation errors leave
/// the output directory unchanged.
pub fn compile(
    components: &ComponentRegistry,
    oml_path: &Path,
    options: &CompileOptions,
) -> Result<CompileReport, CompileError> {
    let started = Instant::now();
    log_event(&Event::CompileStart {
        oml_path: oml_path.display().to_string(),
    });

    match compile_inner(components, oml_path, options, started) {
        Ok(report) => Ok(report),
        Err(error) => {
            log_event(&Event::CompileError {
                error_type: error.error_type().to_string(),
                message: error.to_string(),
            });
            Err(error)
        }
    }
}

fn compile_inner(
    components: &ComponentRegistry,
    oml_path: &Path,
    options: &CompileOptions,
    started: Instant,
) -> Result<CompileReport, CompileError> {
    let text = fs::read_to_string(oml_path)?;
    let doc = OmlDocument::parse(&text)?;
    doc.validate(components)?;
    log_event(&Event::OmlValidated {
        oml_version: doc.oml_version.clone(),
        pipeline: doc.name.clone(),
        steps: doc.steps.len(),
    });

    let params = resolve_params(&doc, options.profile.as_deref(), &options.cli_params)?;

    // Substitute parameters; connection references stay intact for run time.
    let mut configs: BTreeMap<String, Value> = BTreeMap::new();
    for step in &doc.steps {
        let mut config = Value::Object(step.config.clone());
        substitute_params(&mut config, &params, &step.id)?;
        configs.insert(step.id.clone(), config);
    }

    reject_inline_secrets(components, &doc, &configs)?;
    validate_against_schemas(components, &doc, &configs)?;

    let ordered = order_steps(&doc.steps)?;
    for step in &ordered {
        if step.defaulted {
            log_event(&Event::DependencyDefaulted {
                step_id: step.step.id.clone(),
                needs: step.needs.clone(),
            });
        }
    }

    let oml_fp = oml_fingerprint(&doc, &ordered, &configs)?;
    let params_fp = canonical_fingerprint(&params)?;

    if let Some(report) = check_cache(options, &doc, &oml_fp, &params_fp, started)? {
        return Ok(report);
    }

    let report = emit_outputs(options, &doc, &ordered, &configs, &params, &oml_fp, &params_fp)?;
    log_event(&Event::CompileComplete {
        pipeline: doc.name.clone(),
        oml_fp,
        params_fp,
        duration_ms: started.elapsed().as_millis() as u64,
        cached: false,
    });
    Ok(report)
}

fn reject_inline_secrets(
    components: &ComponentRegistry,
    doc: &OmlDocument,
    configs: &BTreeMap<String, Value>,
) -> Result<(), CompileError> {
    for step in &doc.steps {
        let Some(spec) = components.get(&step.component) else {
            continue;
        };
        if let Some(config) = configs.get(&step.id) {
            if let Some(pointer) = literal_secret_pointers(config, &spec.secrets).into_iter().next()
            {
                return Err(CompileError::InlineSecret {
                    step: step.id.clone(),
                    pointer,
                });
            }
        }
    }
    Ok(())
}

fn validate_against_schemas(
    components: &ComponentRegistry,
    doc: &OmlDocument,
    configs: &BTreeMap<String, Value>,
) -> Result<(), CompileError> {
    for step in &doc.steps {
        let Some(spec) = components.get(&step.component) else {
            continue;
        };
        let validator = jsonschema::draft202012::new(&spec.config_schema).map_err(|e| {
            CompileError::SchemaValidation {
                step: step.id.clone(),
                message: e.to_string(),
            }
        })?;
        if let Some(config) = configs.get(&step.id) {
            if let Some(error) = validator.iter_errors(config).next() {
                return Err(CompileError::SchemaValidation {
                    step: step.id.clone(),
                    message: error.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Fingerprint of the OML after parameter substitution: name, version, and
/// the ordered steps with their resolved configs and explicit needs.
fn oml_fingerprint(
    doc: &OmlDocument,
    ordered: &[OrderedStep],
    configs: &BTreeMap<String, Value>,
) -> Result<String, CompileError> {
    let steps: Vec<Value> = ordered
        .iter()
        .map(|s| {
            json!({
                "id": s.step.id,
                "component": s.step.component,
                "mode": s.step.mode,
                "needs": s.needs,
                "config": configs.get(&s.step.id).cloned().unwrap_or(Value::Null),
            })
        })
        .collect();
    Ok(canonical_fingerprint(&json!({
        "oml_version": doc.oml_version,
        "name": doc.name,
        "steps": steps,
    }))?)
}

/// Decide whether an existing manifest satisfies this compilation.
fn check_cache(
    options: &CompileOptions,
    doc: &OmlDocument,
    oml_fp: &str,
    params_fp: &str,
    started: Instant,
) -> Result<Option<CompileReport>, CompileError> {
    let manifest_path = options.out_dir.join("manifest.yaml");
    let existing = Manifest::load(&manifest_path).ok();
    let matches = existing.as_ref().is_some_and(|m| {
        m.pipeline.fingerprints.oml_fp == oml_fp && m.pipeline.fingerprints.params_fp == params_fp
    });

    match options.mode {
        CompileMode::Force => Ok(None),
        CompileMode::Auto | CompileMode::Never => {
            if matches {
                log_event(&Event::CompileComplete {
                    pipeline: doc.name.clone(),
                    oml_fp: oml_fp.to_string(),
                    params_fp: params_fp.to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    cached: true,
                });
                Ok(Some(CompileReport {
                    manifest_path,
                    pipeline: doc.name.clone(),
                    steps: doc.steps.len(),
                    oml_fp: oml_fp.to_string(),
                    params_fp: params_fp.to_string(),
                    cached: true,
                }))
            } else if options.mode == CompileMode::Never {
                Err(CompileError::CacheMiss {
                    oml_fp: oml_fp.to_string(),
                    params_fp: params_fp.to_string(),
                })
            } else {
                Ok(None)
            }
        }
    }
}

fn emit_outputs(
    options: &CompileOptions,
    doc: &OmlDocument,
    ordered: &[OrderedStep],
    configs: &BTreeMap<String, Value>,
    params: &ResolvedParams,
    oml_fp: &str,
    params_fp: &str,
) -> Result<CompileReport, CompileError> {
    let cfg_dir = options.out_dir.join("cfg");
    fs::create_dir_all(&cfg_dir)?;

    let mut steps = Vec::with_capacity(ordered.len());
    for step in ordered {
        let cfg_rel = format!("cfg/{}.json", step.step.id);
        let mut config = configs
            .get(&step.step.id)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        if let Value::Object(map) = &mut config {
            map.insert(
                "component".to_string(),
                Value::String(step.step.component.clone()),
            );
        }
        write_json(&options.out_dir.join(&cfg_rel), &config)?;
        steps.push(ManifestStep {
            id: step.step.id.clone(),
            driver: step.step.component.clone(),
            cfg_path: cfg_rel,
            needs: step.needs.clone(),
        });
    }

    let effective = json!({
        "profile": options.profile.clone().unwrap_or_else(|| "default".to_string()),
        "params": params,
    });
    write_json(&options.out_dir.join("effective_config.json"), &effective)?;

    let manifest = Manifest {
        pipeline: ManifestPipeline {
            id: doc.name.clone(),
            version: PIPELINE_VERSION.to_string(),
            fingerprints: Fingerprints {
                oml_fp: oml_fp.to_string(),
                params_fp: params_fp.to_string(),
            },
        },
        steps,
        meta: ManifestMeta {
            oml_version: doc.oml_version.clone(),
            profile: options.profile.clone().unwrap_or_else(|| "default".to_string()),
            generated_at: chrono_now(),
        },
    };
    let manifest_path = options.out_dir.join("manifest.yaml");
    fs::write(&manifest_path, serde_yaml::to_string(&manifest)?)?;

    Ok(CompileReport {
        manifest_path,
        pipeline: doc.name.clone(),
        steps: ordered.len(),
        oml_fp: oml_fp.to_string(),
        params_fp: params_fp.to_string(),
        cached: false,
    })
}

/// Sorted keys, 2-space indent, LF line endings, trailing newline.
fn write_json(path: &Path, value: &Value) -> Result<(), CompileError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

fn chrono_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
