// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sessions-root maintenance: retention sweep and session bundling

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::context::SessionError;

/// Compression level for session bundles.
const BUNDLE_ZSTD_LEVEL: i32 = 3;

/// Outcome of a [`gc_sessions`] sweep.
#[derive(Debug, Default, Serialize)]
pub struct GcReport {
    pub removed: Vec<String>,
    pub bytes_freed: u64,
}

/// Delete sessions older than `days`, then oldest-first until the root is
/// under `max_gb`.
///
/// Hidden (`.`/`@`-prefixed) entries are left alone. Age is judged by the
/// directory's modification time, which tracks the last stream write.
pub fn gc_sessions(root: &Path, days: u32, max_gb: f64) -> Result<GcReport, SessionError> {
    let mut report = GcReport::default();
    let mut sessions = collect_sessions(root)?;

    let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
    sessions.retain(|entry| {
        if entry.modified < cutoff {
            report.bytes_freed += entry.size;
            report.removed.push(entry.name.clone());
            if let Err(e) = fs::remove_dir_all(&entry.path) {
                tracing::warn!(session = %entry.name, error = %e, "gc removal failed");
            }
            false
        } else {
            true
        }
    });

    let max_bytes = (max_gb * 1e9) as u64;
    let mut total: u64 = sessions.iter().map(|e| e.size).sum();
    sessions.sort_by_key(|e| e.modified);
    for entry in sessions {
        if total <= max_bytes {
            break;
        }
        total -= entry.size;
        report.bytes_freed += entry.size;
        report.removed.push(entry.name.clone());
        if let Err(e) = fs::remove_dir_all(&entry.path) {
            tracing::warn!(session = %entry.name, error = %e, "gc removal failed");
        }
    }

    Ok(report)
}

/// Pack one session's files into a zstd-compressed JSON bundle at `out`.
///
/// The bundle is a single JSON object `{"session_id": ..., "files":
/// {relative_path: content}}`; binary artifact bytes are stored lossily as
/// UTF-8 text. Written via a `.tmp` sibling and renamed into place.
pub fn bundle_session(root: &Path, session_id: &str, out: &Path) -> Result<(), SessionError> {
    let dir = root.join(session_id);
    let mut files = serde_json::Map::new();
    collect_files(&dir, &dir, &mut files)?;

    let bundle = serde_json::json!({
        "session_id": session_id,
        "files": files,
    });
    let raw = serde_json::to_vec(&bundle)?;
    let compressed = zstd::encode_all(raw.as_slice(), BUNDLE_ZSTD_LEVEL)?;

    let tmp = out.with_extension("tmp");
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = fs::File::create(&tmp)?;
    file.write_all(&compressed)?;
    file.sync_all()?;
    fs::rename(&tmp, out)?;
    Ok(())
}

/// Decode a bundle produced by [`bundle_session`].
pub fn read_bundle(path: &Path) -> Result<serde_json::Value, SessionError> {
    let compressed = fs::read(path)?;
    let raw = zstd::decode_all(compressed.as_slice())?;
    Ok(serde_json::from_slice(&raw)?)
}

struct SessionEntry {
    name: String,
    path: PathBuf,
    size: u64,
    modified: DateTime<Utc>,
}

fn collect_sessions(root: &Path) -> Result<Vec<SessionEntry>, SessionError> {
    let mut entries = Vec::new();
    let read = match fs::read_dir(root) {
        Ok(read) => read,
        Err(_) => return Ok(entries),
    };
    for entry in read.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with('@') {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        entries.push(SessionEntry {
            size: dir_size(&path),
            name,
            path,
            modified,
        });
    }
    Ok(entries)
}

fn dir_size(dir: &Path) -> u64 {
    let mut total = 0;
    if let Ok(read) = fs::read_dir(dir) {
        for entry in read.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                total += dir_size(&path);
            } else if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

fn collect_files(
    base: &Path,
    dir: &Path,
    files: &mut serde_json::Map<String, serde_json::Value>,
) -> Result<(), SessionError> {
    for entry in fs::read_dir(dir)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, files)?;
        } else {
            let rel = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            let content = fs::read(&path)?;
            files.insert(
                rel,
                serde_json::Value::String(String::from_utf8_lossy(&content).into_owned()),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
