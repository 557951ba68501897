// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text and JSON output helpers
//!
//! Errors are a single concise line on stderr in text mode; JSON mode
//! prints a structured `{status, error_type, message}` object on stdout.
//! Full diagnostics always go to the session log.

use serde::Serialize;

pub fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("error: cannot render JSON output: {e}"),
        }
    } else {
        println!("{}", text());
    }
}

pub fn emit_error(json: bool, error_type: &str, message: &str) {
    if json {
        let value = serde_json::json!({
            "status": "error",
            "error_type": error_type,
            "message": message,
        });
        match serde_json::to_string_pretty(&value) {
            Ok(rendered) => println!("{rendered}"),
            Err(_) => eprintln!("error: {message}"),
        }
    } else {
        eprintln!("error: {message}");
    }
}
