// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Templated output paths
//!
//! All driver-visible output paths are rendered through [`render_path`],
//! which keeps results relative to an explicit base directory and rejects
//! anything that could escape it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;

/// Default `{ts}` format: `20260114-091205`.
pub const DEFAULT_TS_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("unsafe path: {path}")]
    UnsafePath { path: String },
}

/// A value substitutable into a path template.
#[derive(Debug, Clone)]
pub enum PathValue {
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for PathValue {
    fn from(s: &str) -> Self {
        PathValue::Text(s.to_string())
    }
}

impl From<String> for PathValue {
    fn from(s: String) -> Self {
        PathValue::Text(s)
    }
}

impl From<DateTime<Utc>> for PathValue {
    fn from(ts: DateTime<Utc>) -> Self {
        PathValue::Timestamp(ts)
    }
}

/// Substitution context for [`render_path`].
#[derive(Debug, Clone, Default)]
pub struct PathContext {
    values: IndexMap<String, PathValue>,
}

impl PathContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PathValue>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    fn render(&self, name: &str, ts_format: &str) -> String {
        match self.values.get(name) {
            Some(PathValue::Text(s)) => s.clone(),
            Some(PathValue::Timestamp(ts)) => ts.format(ts_format).to_string(),
            None => String::new(),
        }
    }

    fn session_id(&self) -> Option<&str> {
        match self.values.get("session_id") {
            Some(PathValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// Render a `{var}`-templated path relative to `base_dir`.
///
/// - `{name}` occurrences are substituted from `ctx`; missing keys become
///   empty and the resulting `//` runs are normalized away.
/// - Timestamp values are formatted with `ts_format`
///   (default [`DEFAULT_TS_FORMAT`]).
/// - Any `..` segment in the template or a substituted value fails with
///   [`PathError::UnsafePath`]; a leading `/` is stripped so results are
///   always relative.
/// - A template without placeholders whose rendered file already exists
///   under `base_dir` gets a unique suffix derived from `ctx.session_id`
///   before the extension. Templated paths never auto-suffix.
pub fn render_path(
    base_dir: &Path,
    template: &str,
    ctx: &PathContext,
    ts_format: Option<&str>,
) -> Result<String, PathError> {
    render(base_dir, template, ctx, ts_format, true)
}

/// [`render_path`] without the collision suffix, for paths that are read
/// rather than written.
pub fn render_input_path(
    base_dir: &Path,
    template: &str,
    ctx: &PathContext,
    ts_format: Option<&str>,
) -> Result<String, PathError> {
    render(base_dir, template, ctx, ts_format, false)
}

fn render(
    base_dir: &Path,
    template: &str,
    ctx: &PathContext,
    ts_format: Option<&str>,
    suffix_on_collision: bool,
) -> Result<String, PathError> {
    let ts_format = ts_format.unwrap_or(DEFAULT_TS_FORMAT);
    let mut rendered = String::new();
    let mut had_placeholder = false;
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                had_placeholder = true;
                let name = &after[..close];
                let value = ctx.render(name, ts_format);
                if has_parent_segment(&value) {
                    return Err(PathError::UnsafePath {
                        path: template.to_string(),
                    });
                }
                rendered.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                // Unbalanced brace: keep it literal.
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);

    if has_parent_segment(&rendered) {
        return Err(PathError::UnsafePath {
            path: template.to_string(),
        });
    }

    let segments: Vec<&str> = rendered
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        return Err(PathError::UnsafePath {
            path: template.to_string(),
        });
    }
    let mut result = segments.join("/");

    if suffix_on_collision && !had_placeholder && base_dir.join(&result).exists() {
        let suffix = match ctx.session_id() {
            Some(id) => {
                use crate::id::ShortId;
                id.short(8).to_string()
            }
            None => {
                use crate::id::ShortId;
                uuid::Uuid::new_v4().simple().to_string().short(8).to_string()
            }
        };
        result = append_suffix(&result, &suffix);
    }

    Ok(result)
}

fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|s| s == "..")
}

/// Insert `_<suffix>` before the final extension (`a/b.csv` → `a/b_x.csv`).
fn append_suffix(path: &str, suffix: &str) -> String {
    let (dir, name) = match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    };
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{dir}{}_{suffix}{}", &name[..dot], &name[dot..]),
        _ => format!("{dir}{name}_{suffix}"),
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
