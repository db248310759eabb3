//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::constants::MAX_PATIENT_ID_LEN;
use crate::{PgxError, PgxResult};

/// Validates that a patient identifier is safe to use as an output file name.
///
/// Identifiers end up in `<output_dir>/<patient_id>.json`, so the character set is
/// restricted to a conservative ASCII subset:
/// - Rejects empty or whitespace-only strings
/// - Bounds the length
/// - Allows only alphanumerics, '.', '-' and '_', and rejects dot-only names
///
/// # Errors
///
/// Returns a `PgxError::InvalidInput` if the identifier is invalid.
pub fn validate_patient_id(patient_id: &str) -> PgxResult<()> {
    if patient_id.trim().is_empty() {
        return Err(PgxError::InvalidInput("patient_id cannot be empty".into()));
    }

    if patient_id.len() > MAX_PATIENT_ID_LEN {
        return Err(PgxError::InvalidInput(format!(
            "patient_id exceeds maximum length of {} characters",
            MAX_PATIENT_ID_LEN
        )));
    }

    let ok = patient_id
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(PgxError::InvalidInput(
            "patient_id contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    if patient_id.bytes().all(|b| b == b'.') {
        return Err(PgxError::InvalidInput(
            "patient_id cannot consist only of dots".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_identifiers() {
        for id in ["VAL_TC01", "PGX-2024.001", "p1"] {
            validate_patient_id(id).expect("identifier should be accepted");
        }
    }

    #[test]
    fn rejects_empty_and_path_like_identifiers() {
        for id in ["", "   ", "../etc/passwd", "a/b", "..", "name with space", "é"] {
            assert!(
                validate_patient_id(id).is_err(),
                "identifier {id:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong_identifiers() {
        let id = "x".repeat(MAX_PATIENT_ID_LEN + 1);
        let err = validate_patient_id(&id).expect_err("too long");
        assert!(err.to_string().contains("maximum length"));
    }
}
