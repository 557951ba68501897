// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret pointer evaluation
//!
//! Component specs declare secret locations as JSON Pointers into step
//! configs. The compiler rejects inline literals at those locations, the
//! runner masks them in the `cleaned_config.json` artifact, and the session
//! reader masks them when presenting raw text. All three share this module.

use serde_json::Value;

/// Replacement for secret values in audit artifacts.
pub const MASK: &str = "***MASKED***";

/// True when a config value is a reference expression rather than a literal:
/// a `@family.alias` connection reference or a `${...}` substitution.
pub fn is_reference(value: &Value) -> bool {
    match value {
        Value::String(s) => s.starts_with('@') || s.contains("${"),
        _ => false,
    }
}

/// Pointers from `pointers` whose addressed config value is a literal.
///
/// A pointer is fine when the value is absent or a reference expression;
/// anything else is an inline secret.
pub fn literal_secret_pointers(config: &Value, pointers: &[String]) -> Vec<String> {
    pointers
        .iter()
        .filter(|p| match config.pointer(p) {
            None | Some(Value::Null) => false,
            Some(v) => !is_reference(v),
        })
        .cloned()
        .collect()
}

/// Replace every value addressed by `pointers` with [`MASK`], in place.
///
/// Pointers that address nothing are ignored.
pub fn mask_secrets(config: &mut Value, pointers: &[String]) {
    for pointer in pointers {
        if let Some(v) = config.pointer_mut(pointer) {
            *v = Value::String(MASK.to_string());
        }
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
