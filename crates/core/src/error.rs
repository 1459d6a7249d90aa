#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed for alert '{alert}': {reason}")]
    Validation { alert: String, reason: String },
}

impl CoreError {
    pub(crate) fn validation(alert: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            alert: alert.to_string(),
            reason: reason.into(),
        }
    }
}
