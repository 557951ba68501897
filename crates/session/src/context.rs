// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation session context
//!
//! A [`SessionContext`] owns one session directory and its three streams:
//! `events.jsonl`, `metrics.jsonl`, and `osiris.log`. A thread-local
//! current-session handle makes structured logging ambient for the duration
//! of a top-level command; [`SessionGuard`] restores the previous handle and
//! flushes the streams on drop, also on failure paths.
//!
//! Logging failures are warned via `tracing` and never propagate; recording
//! must not break the pipeline.

use chrono::Utc;
use osiris_core::{new_session_id, Event, Metric, SessionId};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Threshold for lines mirrored into `osiris.log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" | "warn" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn from_event(level: Option<&str>) -> Self {
        match level {
            Some("warning") => LogLevel::Warning,
            Some("error") => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Session creation options.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// When set, events whose name is not listed are dropped silently.
    pub allowed_events: Option<HashSet<String>>,
    /// Minimum level mirrored into `osiris.log`.
    pub log_level: LogLevel,
    /// Overrides the `osiris.log` location inside the session directory.
    pub log_file: Option<PathBuf>,
}

impl SessionConfig {
    /// Read `OSIRIS_LOG_LEVEL` and `OSIRIS_LOG_FILE` from the environment.
    pub fn from_env() -> Self {
        let log_level = std::env::var("OSIRIS_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or_default();
        let log_file = std::env::var("OSIRIS_LOG_FILE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self {
            allowed_events: None,
            log_level,
            log_file,
        }
    }
}

struct Streams {
    events: BufWriter<File>,
    metrics: BufWriter<File>,
    log: BufWriter<File>,
}

/// Handle to one session directory and its write streams.
pub struct SessionContext {
    id: SessionId,
    dir: PathBuf,
    config: SessionConfig,
    streams: Mutex<Streams>,
}

impl SessionContext {
    /// Create a fresh `<kind>_<id>` session directory under `root`.
    pub fn create(root: &Path, kind: &str, config: SessionConfig) -> Result<Arc<Self>, SessionError> {
        Self::create_with_id(root, new_session_id(kind), config)
    }

    /// Create a session directory with an explicit id.
    pub fn create_with_id(
        root: &Path,
        id: SessionId,
        config: SessionConfig,
    ) -> Result<Arc<Self>, SessionError> {
        let dir = root.join(id.as_str());
        fs::create_dir_all(dir.join("artifacts"))?;

        let open = |name: &Path| -> Result<BufWriter<File>, SessionError> {
            Ok(BufWriter::new(
                OpenOptions::new().create(true).append(true).open(name)?,
            ))
        };
        let log_path = config
            .log_file
            .clone()
            .unwrap_or_else(|| dir.join("osiris.log"));
        let streams = Streams {
            events: open(&dir.join("events.jsonl"))?,
            metrics: open(&dir.join("metrics.jsonl"))?,
            log: open(&log_path)?,
        };

        Ok(Arc::new(Self {
            id,
            dir,
            config,
            streams: Mutex::new(streams),
        }))
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Per-step artifacts directory, created on first use.
    pub fn artifacts_dir(&self, step_id: &str) -> Result<PathBuf, SessionError> {
        let dir = self.dir.join("artifacts").join(step_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Append a typed event to `events.jsonl` and mirror it to `osiris.log`.
    pub fn log_event(&self, event: &Event) {
        if !self.event_allowed(event.name()) {
            return;
        }
        let record = match serde_json::to_value(event) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) | Err(_) => {
                tracing::warn!(event = event.name(), "failed to serialize event");
                return;
            }
        };
        let level = event.level();
        self.append_event_record(event.name(), record, level);
        self.log_line(LogLevel::from_event(level), &event.log_summary());
    }

    /// Append a driver-defined event by name with free-form fields.
    pub fn log_raw_event(&self, name: &str, fields: Map<String, Value>) {
        if !self.event_allowed(name) {
            return;
        }
        let mut record = fields;
        record.insert("event".to_string(), Value::String(name.to_string()));
        self.append_event_record(name, record, None);
        self.log_line(LogLevel::Info, name);
    }

    /// Append a metric sample to `metrics.jsonl`.
    pub fn log_metric(&self, metric: &Metric) {
        let record = match serde_json::to_value(metric) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) | Err(_) => {
                tracing::warn!(metric = %metric.metric, "failed to serialize metric");
                return;
            }
        };
        let mut record = record;
        record.insert("ts".to_string(), Value::String(now_rfc3339()));
        record.insert(
            "session".to_string(),
            Value::String(self.id.as_str().to_string()),
        );
        let mut streams = self.streams.lock();
        if let Err(e) = write_jsonl(&mut streams.metrics, &record) {
            tracing::warn!(session = %self.id, error = %e, "failed to write metric");
        }
    }

    /// Write a human line to `osiris.log` without a structured event.
    pub fn log_line(&self, level: LogLevel, message: &str) {
        if level < self.config.log_level {
            return;
        }
        let line = format!(
            "{} osiris [{}] {} {}\n",
            now_rfc3339(),
            self.id,
            level.label(),
            message
        );
        let mut streams = self.streams.lock();
        if let Err(e) = streams.log.write_all(line.as_bytes()) {
            tracing::warn!(session = %self.id, error = %e, "failed to write log line");
        }
    }

    /// Flush all streams to disk.
    pub fn flush(&self) {
        let mut streams = self.streams.lock();
        for (name, result) in [
            ("events", streams.events.flush()),
            ("metrics", streams.metrics.flush()),
            ("log", streams.log.flush()),
        ] {
            if let Err(e) = result {
                tracing::warn!(session = %self.id, stream = name, error = %e, "flush failed");
            }
        }
    }

    fn event_allowed(&self, name: &str) -> bool {
        match &self.config.allowed_events {
            Some(allowed) => allowed.contains(name),
            None => true,
        }
    }

    fn append_event_record(
        &self,
        name: &str,
        mut record: Map<String, Value>,
        level: Option<&str>,
    ) {
        record.insert("ts".to_string(), Value::String(now_rfc3339()));
        record.insert(
            "session".to_string(),
            Value::String(self.id.as_str().to_string()),
        );
        if let Some(level) = level {
            record.insert("level".to_string(), Value::String(level.to_string()));
        }
        let mut streams = self.streams.lock();
        if let Err(e) = write_jsonl(&mut streams.events, &record) {
            tracing::warn!(session = %self.id, event = name, error = %e, "failed to write event");
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.flush();
    }
}

fn write_jsonl(writer: &mut BufWriter<File>, record: &Map<String, Value>) -> std::io::Result<()> {
    let line = serde_json::to_string(record)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

thread_local! {
    static CURRENT: RefCell<Vec<Arc<SessionContext>>> = const { RefCell::new(Vec::new()) };
}

/// Install `ctx` as the current session for this thread.
///
/// The previous handle is restored when the returned guard drops; the
/// installed session is flushed at that point.
#[must_use = "the session is only current while the guard is alive"]
pub fn set_current(ctx: Arc<SessionContext>) -> SessionGuard {
    CURRENT.with(|stack| stack.borrow_mut().push(ctx));
    SessionGuard { _private: () }
}

/// The current session, if a guard is alive on this thread.
pub fn current() -> Option<Arc<SessionContext>> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// Log an event through the ambient session; no-op without one.
pub fn log_event(event: &Event) {
    if let Some(ctx) = current() {
        ctx.log_event(event);
    }
}

/// Log a metric through the ambient session; no-op without one.
pub fn log_metric(metric: &Metric) {
    if let Some(ctx) = current() {
        ctx.log_metric(metric);
    }
}

/// Scope token returned by [`set_current`].
pub struct SessionGuard {
    _private: (),
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            if let Some(ctx) = stack.borrow_mut().pop() {
                ctx.flush();
            }
        });
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
