// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical-JSON fingerprints
//!
//! Fingerprints are SHA-256 digests over canonical JSON: object keys
//! sorted, sequences in source order, no insignificant whitespace. Two
//! compilations with identical inputs therefore produce identical
//! fingerprints, which is what the manifest cache keys on.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Canonical JSON text for a serializable value.
///
/// `serde_json`'s map type stores keys sorted, so serializing through
/// `Value` yields a canonical ordering; compact encoding removes the rest
/// of the variance.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let normalized: Value = serde_json::to_value(value)?;
    serde_json::to_string(&normalized)
}

/// Lowercase-hex SHA-256 over the canonical JSON of `value`.
pub fn canonical_fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let text = canonical_json(value)?;
    let digest = Sha256::digest(text.as_bytes());
    Ok(format!("{digest:x}"))
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
