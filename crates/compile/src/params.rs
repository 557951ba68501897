// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parameter resolution with precedence and provenance
//!
//! Final value per parameter: CLI override > `OSIRIS_PARAM_<NAME>` env
//! variable > selected profile's `params` > the OML default. The source of
//! each value is recorded for the `effective_config.json` audit block.

use crate::error::CompileError;
use osiris_oml::OmlDocument;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Environment prefix for parameter overrides.
pub const ENV_PARAM_PREFIX: &str = "OSIRIS_PARAM_";

/// Where a parameter's final value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    Cli,
    Env,
    Profile(String),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParam {
    pub value: Value,
    pub source: ParamSource,
}

/// Name-sorted resolved parameters.
pub type ResolvedParams = BTreeMap<String, ResolvedParam>;

/// Resolve the pipeline's parameters by precedence.
///
/// Every declared parameter resolves (its OML default is the floor);
/// overrides for undeclared parameters are rejected.
pub fn resolve_params(
    doc: &OmlDocument,
    profile: Option<&str>,
    cli_params: &BTreeMap<String, String>,
) -> Result<ResolvedParams, CompileError> {
    let profile_params = match profile {
        Some(name) => Some(
            doc.profiles
                .get(name)
                .ok_or_else(|| CompileError::UnknownProfile(name.to_string()))?,
        ),
        None => None,
    };

    for name in cli_params.keys() {
        if !doc.params.contains_key(name) {
            return Err(CompileError::UnknownParam(name.clone()));
        }
    }
    if let Some(profile_def) = profile_params {
        for name in profile_def.params.keys() {
            if !doc.params.contains_key(name) {
                return Err(CompileError::UnknownParam(name.clone()));
            }
        }
    }

    let mut resolved = ResolvedParams::new();
    for (name, def) in &doc.params {
        let param = if let Some(raw) = cli_params.get(name) {
            ResolvedParam {
                value: coerce(raw),
                source: ParamSource::Cli,
            }
        } else if let Some(raw) = env_override(name) {
            ResolvedParam {
                value: coerce(&raw),
                source: ParamSource::Env,
            }
        } else if let Some(value) = profile_params.and_then(|p| p.params.get(name)) {
            ResolvedParam {
                value: value.clone(),
                source: ParamSource::Profile(profile.unwrap_or_default().to_string()),
            }
        } else {
            ResolvedParam {
                value: def.default.clone(),
                source: ParamSource::Default,
            }
        };
        resolved.insert(name.clone(), param);
    }
    Ok(resolved)
}

/// Parse a `KEY=VALUE` CLI argument.
pub fn parse_cli_param(raw: &str) -> Result<(String, String), CompileError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CompileError::InvalidParamFormat(raw.to_string())),
    }
}

/// Substitute `${params.<name>}` references through a config value tree.
///
/// A string that is exactly one reference takes the parameter's typed
/// value; embedded references interpolate as text.
pub fn substitute_params(
    value: &mut Value,
    params: &ResolvedParams,
    step: &str,
) -> Result<(), CompileError> {
    match value {
        Value::String(s) => {
            if let Some(name) = whole_reference(s) {
                let param = lookup(params, &name, step)?;
                *value = param.value.clone();
            } else if s.contains("${params.") {
                *value = Value::String(interpolate(s, params, step)?);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_params(item, params, step)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_params(item, params, step)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn lookup<'p>(
    params: &'p ResolvedParams,
    name: &str,
    step: &str,
) -> Result<&'p ResolvedParam, CompileError> {
    params
        .get(name)
        .ok_or_else(|| CompileError::UnknownParamReference {
            step: step.to_string(),
            name: name.to_string(),
        })
}

/// `"${params.x}"` → `Some("x")`; anything else → `None`.
fn whole_reference(s: &str) -> Option<String> {
    let body = s.strip_prefix("${params.")?.strip_suffix('}')?;
    if body.is_empty() || body.contains('$') || body.contains('}') {
        return None;
    }
    Some(body.to_string())
}

fn interpolate(s: &str, params: &ResolvedParams, step: &str) -> Result<String, CompileError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${params.") {
        out.push_str(&rest[..start]);
        let after = &rest[start + "${params.".len()..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                let param = lookup(params, name, step)?;
                match &param.value {
                    Value::String(v) => out.push_str(v),
                    other => out.push_str(&other.to_string()),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${params.");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn env_override(name: &str) -> Option<String> {
    let var = format!("{ENV_PARAM_PREFIX}{}", name.to_ascii_uppercase());
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// CLI and env overrides arrive as text; keep numbers and booleans typed so
/// schema validation sees what the OML default would have been.
fn coerce(raw: &str) -> Value {
    if raw == "true" {
        return Value::Bool(true);
    }
    if raw == "false" {
        return Value::Bool(false);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
