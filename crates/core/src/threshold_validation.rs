//! Shared threshold validation helpers.
//!
//! Provides the range checks applied to alert definitions at load time.

use crate::error::CoreError;

/// Validate that a threshold value is a finite number.
///
/// Returns a `CoreError::Validation` naming the alert and field otherwise.
pub fn validate_finite(alert: &str, value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::validation(
            alert,
            format!("{name} must be a finite number, got {value}"),
        ));
    }
    Ok(())
}

/// Validate that the warning bound does not exceed the critical bound.
pub fn validate_ordered(alert: &str, warn: f64, critical: f64) -> Result<(), CoreError> {
    if warn > critical {
        return Err(CoreError::validation(
            alert,
            format!("warn.value ({warn}) must not exceed critical.value ({critical})"),
        ));
    }
    Ok(())
}
