// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory step results
//!
//! Drivers exchange data as [`Table`]s: ordered rows of named JSON values.
//! A step's return value is a [`StepOutput`] mapping output keys (`df`,
//! `table`, ...) to tables or scalar values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

/// One row: column name → cell value, in source column order.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("row {row} has {got} fields, header has {want}")]
    RaggedRow { row: usize, got: usize, want: usize },
    #[error("unterminated quoted field starting in row {row}")]
    UnterminatedQuote { row: usize },
    #[error("empty input: no header row")]
    EmptyInput,
}

/// An ordered, column-named table of JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in first-row order.
    pub fn columns(&self) -> Vec<String> {
        match self.rows.first() {
            Some(row) => row.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Union of column names across all rows, sorted lexicographically.
    pub fn sorted_columns(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for row in &self.rows {
            for key in row.keys() {
                set.insert(key.clone());
            }
        }
        set.into_iter().collect()
    }

    /// Encode as CSV with a lexicographically sorted header row.
    ///
    /// Missing cells render empty; nulls render empty; non-string values
    /// render via their JSON representation.
    pub fn to_csv(&self, delimiter: char) -> String {
        let columns = self.sorted_columns();
        let mut out = String::new();
        out.push_str(&csv_line(&columns, delimiter));
        for row in &self.rows {
            let fields: Vec<String> = columns
                .iter()
                .map(|col| match row.get(col) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect();
            out.push_str(&csv_line(&fields, delimiter));
        }
        out
    }

    /// Parse CSV text with a header row into a table.
    ///
    /// Cells that parse as JSON numbers or booleans become typed values;
    /// everything else stays a string.
    pub fn from_csv(text: &str, delimiter: char) -> Result<Self, TableError> {
        let mut records = parse_csv(text, delimiter)?;
        if records.is_empty() {
            return Err(TableError::EmptyInput);
        }
        let header = records.remove(0);
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            if record.len() != header.len() {
                return Err(TableError::RaggedRow {
                    row: i + 1,
                    got: record.len(),
                    want: header.len(),
                });
            }
            let mut row = Row::new();
            for (col, cell) in header.iter().zip(record) {
                row.insert(col.clone(), infer_cell(&cell));
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }
}

fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match cell {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

fn csv_line(fields: &[String], delimiter: char) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line.push('\n');
    line
}

fn parse_csv(text: &str, delimiter: char) -> Result<Vec<Vec<String>>, TableError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                c if c == delimiter => record.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }
    if in_quotes {
        return Err(TableError::UnterminatedQuote {
            row: records.len() + 1,
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// A single named output produced by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Table(Table),
    Value(Value),
}

impl OutputValue {
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            OutputValue::Table(t) => Some(t),
            OutputValue::Value(_) => None,
        }
    }
}

/// The mapping a driver returns from `run`: output key → result.
///
/// Writers that consume but do not produce return [`StepOutput::empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    #[serde(flatten)]
    outputs: IndexMap<String, OutputValue>,
}

impl StepOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_table(key: impl Into<String>, table: Table) -> Self {
        let mut outputs = IndexMap::new();
        outputs.insert(key.into(), OutputValue::Table(table));
        Self { outputs }
    }

    pub fn with_value(key: impl Into<String>, value: Value) -> Self {
        let mut outputs = IndexMap::new();
        outputs.insert(key.into(), OutputValue::Value(value));
        Self { outputs }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OutputValue) {
        self.outputs.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        self.outputs.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutputValue)> {
        self.outputs.iter()
    }

    /// The first table-valued output, if any.
    pub fn primary_table(&self) -> Option<&Table> {
        self.outputs.values().find_map(|v| v.as_table())
    }

    /// Derive a processed-row count from the output when possible.
    ///
    /// Prefers the first table's row count; falls back to a numeric `rows`
    /// output (the shape writers use to report without returning data).
    pub fn rows_processed(&self) -> Option<u64> {
        if let Some(table) = self.primary_table() {
            return Some(table.row_count());
        }
        match self.outputs.get("rows") {
            Some(OutputValue::Value(Value::Number(n))) => n.as_u64(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
