// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `@family.alias` connection references

use crate::store::ConnectError;

/// Parse a connection reference.
///
/// Returns `Ok(None)` for a missing or empty reference, or for a plain
/// string without the `@` prefix (the value is then not a reference at
/// all). Fails for `@family` (no dot), `@.alias`, and `@family.`. Splits
/// on the first dot only: `@mysql.db.prod` → `("mysql", "db.prod")`.
pub fn parse_reference(reference: Option<&str>) -> Result<Option<(String, String)>, ConnectError> {
    let Some(reference) = reference else {
        return Ok(None);
    };
    if reference.is_empty() {
        return Ok(None);
    }
    let Some(body) = reference.strip_prefix('@') else {
        return Ok(None);
    };

    let Some((family, alias)) = body.split_once('.') else {
        return Err(ConnectError::MalformedReference {
            reference: reference.to_string(),
        });
    };
    if family.is_empty() || alias.is_empty() {
        return Err(ConnectError::EmptyReferenceParts {
            reference: reference.to_string(),
        });
    }
    Ok(Some((family.to_string(), alias.to_string())))
}

#[cfg(test)]
#[path = "reference_tests.rs"]
mod tests;
