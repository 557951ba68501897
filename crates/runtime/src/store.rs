// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-scoped in-process table store
//!
//! Transform drivers that want to share intermediate tables within one run
//! ask the context for this store (the embedded-database role). One
//! instance is created per run and dropped at run end; it must not be
//! shared across runs.

use osiris_core::Table;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct InProcStore {
    tables: Arc<Mutex<BTreeMap<String, Table>>>,
}

impl InProcStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under a name, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, table: Table) {
        self.tables.lock().insert(name.into(), table);
    }

    pub fn get(&self, name: &str) -> Option<Table> {
        self.tables.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.lock().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
