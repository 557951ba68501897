// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! osiris-session: On-disk session recording and aggregation
//!
//! Every top-level command records its execution as a session directory
//! under the sessions root: structured JSONL event and metric streams, a
//! human-readable log, and per-step artifacts. This crate owns writing
//! those files ([`SessionContext`]), reading them back into summaries
//! ([`SessionReader`]), and retention maintenance.

pub mod context;
pub mod maintenance;
pub mod reader;

pub use context::{
    current, log_event, log_metric, set_current, LogLevel, SessionConfig, SessionContext,
    SessionError, SessionGuard,
};
pub use maintenance::{bundle_session, gc_sessions, read_bundle, GcReport};
pub use reader::{SessionReader, SessionStatus, SessionSummary};
