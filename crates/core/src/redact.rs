// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-pattern text redaction
//!
//! Applied by tools that present raw session text to users. Secret-pointer
//! masking (see [`crate::secrets`]) handles structured configs; this module
//! catches credentials embedded in free-form strings.

use regex::Regex;
use std::sync::LazyLock;

static PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Database connection strings with user:password
        (r"mysql://[^:/\s]+:[^@\s]+@", "mysql://***@"),
        (r"postgresql://[^:/\s]+:[^@\s]+@", "postgresql://***@"),
        (r"postgres://[^:/\s]+:[^@\s]+@", "postgres://***@"),
        // JSON credential fields
        (r#""password"\s*:\s*"[^"]*""#, r#""password": "***""#),
        (r#""api_key"\s*:\s*"[^"]*""#, r#""api_key": "***""#),
        (
            r#""service_role_key"\s*:\s*"[^"]*""#,
            r#""service_role_key": "***""#,
        ),
        // Bearer tokens
        (r"Bearer\s+[A-Za-z0-9\-._~+/]+", "Bearer ***"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| {
        Regex::new(pattern).ok().map(|re| (re, replacement))
    })
    .collect()
});

/// Redact credential-shaped substrings from arbitrary text.
pub fn redact_text(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in PATTERNS.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
