//! Alert definition types as served by the backend's `/alerts` endpoint.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::threshold_validation::{validate_finite, validate_ordered};

/// Upper bound for `intervalSecs` and `repeatIntervalSecs` (one year).
pub const MAX_INTERVAL_SECS: i64 = 365 * 24 * 60 * 60;

/// One severity bound of an alert: the inclusive upper value and the
/// message sent when the bound is exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub message: String,
}

/// A named rule pairing a metrics query with warn/critical thresholds.
///
/// Immutable once loaded. Call [`AlertDefinition::validate`] before
/// starting an evaluation loop for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDefinition {
    /// Unique identifier, used as the key for notify/resolve calls.
    pub name: String,
    /// Opaque query string evaluated by the metrics backend.
    pub query: String,
    /// Seconds between evaluations. Must be positive.
    pub interval_secs: i64,
    /// Minimum seconds between repeated notifications while unhealthy.
    pub repeat_interval_secs: i64,
    /// Values up to and including `warn.value` are healthy.
    pub warn: Threshold,
    /// Values above `critical.value` are critical.
    pub critical: Threshold,
}

impl AlertDefinition {
    /// Check the invariants the evaluation loop relies on.
    ///
    /// Rejects an empty name, an interval outside `1..=MAX_INTERVAL_SECS`,
    /// a repeat interval outside `0..=MAX_INTERVAL_SECS`, non-finite
    /// thresholds and `warn.value > critical.value`.
    pub fn validate(&self) -> Result<(), CoreError> {
        let name = self.name.as_str();

        if name.trim().is_empty() {
            return Err(CoreError::validation(name, "name must not be empty"));
        }
        if self.interval_secs <= 0 {
            return Err(CoreError::validation(
                name,
                format!("intervalSecs must be positive, got {}", self.interval_secs),
            ));
        }
        if self.interval_secs > MAX_INTERVAL_SECS {
            return Err(CoreError::validation(
                name,
                format!(
                    "intervalSecs must not exceed {MAX_INTERVAL_SECS}, got {}",
                    self.interval_secs
                ),
            ));
        }
        if self.repeat_interval_secs < 0 {
            return Err(CoreError::validation(
                name,
                format!(
                    "repeatIntervalSecs must not be negative, got {}",
                    self.repeat_interval_secs
                ),
            ));
        }

        if self.repeat_interval_secs > MAX_INTERVAL_SECS {
            return Err(CoreError::validation(
                name,
                format!(
                    "repeatIntervalSecs must not exceed {MAX_INTERVAL_SECS}, got {}",
                    self.repeat_interval_secs
                ),
            ));
        }

        validate_finite(name, self.warn.value, "warn.value")?;
        validate_finite(name, self.critical.value, "critical.value")?;
        validate_ordered(name, self.warn.value, self.critical.value)
    }
}
