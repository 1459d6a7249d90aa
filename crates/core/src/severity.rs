//! Severity classification of a single observation.

use std::fmt;

use crate::alert::AlertDefinition;

/// Severity of the most recent observation of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// At or below the warning threshold. The healthy sentinel.
    Pass,
    /// Above the warning threshold, at or below the critical threshold.
    Warn,
    /// Above the critical threshold.
    Critical,
}

impl Severity {
    /// Classify an observed value against an alert's thresholds.
    ///
    /// Boundary values fall into the healthier bucket. A NaN observation
    /// satisfies neither bound and classifies as `Critical`.
    pub fn classify(definition: &AlertDefinition, value: f64) -> Self {
        if value <= definition.warn.value {
            Self::Pass
        } else if value <= definition.critical.value {
            Self::Warn
        } else {
            Self::Critical
        }
    }

    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
