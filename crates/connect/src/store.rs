// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection store loading and resolution

use osiris_core::Event;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Store file name, looked up in the working directory.
pub const CONNECTIONS_FILE: &str = "osiris_connections.yaml";

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connections file not found: {path}")]
    MissingConnectionsFile { path: String },

    #[error("invalid connections file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid connection reference '{reference}': expected '@family.alias'")]
    MalformedReference { reference: String },

    #[error("invalid connection reference '{reference}': family and alias cannot be empty")]
    EmptyReferenceParts { reference: String },

    #[error("unknown connection family '{family}' (available: {})", available.join(", "))]
    UnknownFamily {
        family: String,
        available: Vec<String>,
    },

    #[error("unknown connection alias '{family}.{alias}' (available: {})", available.join(", "))]
    UnknownAlias {
        family: String,
        alias: String,
        available: Vec<String>,
    },

    #[error("no default connection for family '{family}' (available: {})", available.join(", "))]
    NoDefaultConnection {
        family: String,
        available: Vec<String>,
    },

    #[error("multiple connections marked default for family '{family}'")]
    MultipleDefaults { family: String },

    #[error(
        "environment variable '{var}' required by connection '{family}.{alias}' field '{field}' \
         is not set or empty"
    )]
    MissingEnvVar {
        family: String,
        alias: String,
        field: String,
        var: String,
    },
}

impl ConnectError {
    /// The unresolved variable name, when this is a missing-env failure.
    pub fn env_var(&self) -> Option<&str> {
        match self {
            ConnectError::MissingEnvVar { var, .. } => Some(var),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConnectionsFile {
    #[serde(default)]
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    connections: BTreeMap<String, BTreeMap<String, Value>>,
}

struct Cached {
    modified: Option<SystemTime>,
    connections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Cached view of `osiris_connections.yaml`.
///
/// The parsed file is cached process-wide and re-read when its modification
/// time changes between runs.
pub struct ConnectionStore {
    path: PathBuf,
    cache: Mutex<Option<Cached>>,
}

impl ConnectionStore {
    /// Store backed by `<dir>/osiris_connections.yaml`.
    pub fn from_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONNECTIONS_FILE))
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a family (and optional alias) to a concrete connection
    /// record.
    ///
    /// Alias selection: explicit alias, else the single record flagged
    /// `default: true`, else an alias literally named `default`. The
    /// returned record has `${ENV_VAR}` placeholders substituted, the
    /// `default` flag stripped, and `_family`/`_alias` annotations added.
    ///
    /// Emits `connection_resolve_start`/`connection_resolve_complete`
    /// through the ambient session; values are never logged.
    pub fn resolve(
        &self,
        family: &str,
        alias: Option<&str>,
        step_id: Option<&str>,
    ) -> Result<Value, ConnectError> {
        osiris_session::log_event(&Event::ConnectionResolveStart {
            step_id: step_id.map(str::to_string),
            family: family.to_string(),
            alias: alias.unwrap_or("(default)").to_string(),
        });

        let result = self.resolve_inner(family, alias);

        osiris_session::log_event(&Event::ConnectionResolveComplete {
            step_id: step_id.map(str::to_string),
            family: family.to_string(),
            alias: alias.unwrap_or("(default)").to_string(),
            ok: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            env_var: result
                .as_ref()
                .err()
                .and_then(|e| e.env_var())
                .map(str::to_string),
        });

        result
    }

    fn resolve_inner(&self, family: &str, alias: Option<&str>) -> Result<Value, ConnectError> {
        let connections = self.load()?;
        let records = connections
            .get(family)
            .ok_or_else(|| ConnectError::UnknownFamily {
                family: family.to_string(),
                available: connections.keys().cloned().collect(),
            })?;

        let alias = match alias {
            Some(alias) => {
                if !records.contains_key(alias) {
                    return Err(ConnectError::UnknownAlias {
                        family: family.to_string(),
                        alias: alias.to_string(),
                        available: records.keys().cloned().collect(),
                    });
                }
                alias.to_string()
            }
            None => select_default(family, records)?,
        };

        // records.contains_key checked above; selection only returns known aliases
        let Some(record) = records.get(&alias) else {
            return Err(ConnectError::UnknownAlias {
                family: family.to_string(),
                alias: alias.clone(),
                available: records.keys().cloned().collect(),
            });
        };

        let mut resolved = substitute_env(record.clone(), family, &alias, "")?;
        if let Value::Object(map) = &mut resolved {
            map.remove("default");
            map.insert("_family".to_string(), Value::String(family.to_string()));
            map.insert("_alias".to_string(), Value::String(alias.clone()));
        }
        Ok(resolved)
    }

    /// Whether the store has any record for `family`.
    ///
    /// A missing or unreadable store file counts as "no".
    pub fn has_family(&self, family: &str) -> bool {
        self.load()
            .map(|connections| connections.contains_key(family))
            .unwrap_or(false)
    }

    fn load(&self) -> Result<BTreeMap<String, BTreeMap<String, Value>>, ConnectError> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.modified == modified && modified.is_some() {
                return Ok(cached.connections.clone());
            }
        }

        let text = fs::read_to_string(&self.path).map_err(|_| {
            ConnectError::MissingConnectionsFile {
                path: self.path.display().to_string(),
            }
        })?;
        let file: ConnectionsFile =
            serde_yaml::from_str(&text).map_err(|e| ConnectError::Parse {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        *cache = Some(Cached {
            modified,
            connections: file.connections.clone(),
        });
        Ok(file.connections)
    }
}

fn select_default(
    family: &str,
    records: &BTreeMap<String, Value>,
) -> Result<String, ConnectError> {
    let flagged: Vec<&String> = records
        .iter()
        .filter(|(_, record)| record.get("default") == Some(&Value::Bool(true)))
        .map(|(alias, _)| alias)
        .collect();
    match flagged.as_slice() {
        [alias] => return Ok((*alias).clone()),
        [] => {}
        _ => {
            return Err(ConnectError::MultipleDefaults {
                family: family.to_string(),
            })
        }
    }
    if records.contains_key("default") {
        return Ok("default".to_string());
    }
    Err(ConnectError::NoDefaultConnection {
        family: family.to_string(),
        available: records.keys().cloned().collect(),
    })
}

/// Substitute `${NAME}` placeholders recursively through strings, lists,
/// and maps. An unset or empty variable fails with the family, alias, and
/// field name for the diagnostic.
fn substitute_env(
    value: Value,
    family: &str,
    alias: &str,
    field: &str,
) -> Result<Value, ConnectError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(&s, family, alias, field)?)),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(substitute_env(item, family, alias, field)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                let child_field = if field.is_empty() {
                    key.clone()
                } else {
                    format!("{field}.{key}")
                };
                out.insert(key, substitute_env(item, family, alias, &child_field)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

fn substitute_string(
    input: &str,
    family: &str,
    alias: &str,
    field: &str,
) -> Result<String, ConnectError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                match std::env::var(var) {
                    Ok(value) if !value.is_empty() => out.push_str(&value),
                    _ => {
                        return Err(ConnectError::MissingEnvVar {
                            family: family.to_string(),
                            alias: alias.to_string(),
                            field: field.to_string(),
                            var: var.to_string(),
                        })
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
