use std::time::Duration;

use vigil_client::http::DEFAULT_ADDRESS;
use vigil_client::retry::{RetryConfig, RetryConfigError, RetryPolicy};

/// Agent configuration loaded from environment variables.
///
/// Every field has a default suitable for a local backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Base address of the metrics and alerting backend.
    pub backend_address: String,
    /// Timeout applied to every backend request.
    pub request_timeout: Duration,
    /// Backoff parameters for backend calls.
    pub retry: RetryConfig,
    /// How long shutdown waits for alert tasks before aborting them.
    pub shutdown_grace: Duration,
}

/// An environment variable that is set but cannot be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend_address: DEFAULT_ADDRESS.to_string(),
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `BACKEND_ADDRESS`        | `http://127.0.0.1:9001` |
    /// | `REQUEST_TIMEOUT_SECS`   | `10`                    |
    /// | `RETRY_INITIAL_DELAY_MS` | `100`                   |
    /// | `RETRY_FACTOR`           | `2.0`                   |
    /// | `RETRY_MAX_DELAY_MS`     | `1000`                  |
    /// | `RETRY_JITTER`           | `true`                  |
    /// | `RETRY_MAX_ATTEMPTS`     | `5`                     |
    /// | `SHUTDOWN_GRACE_SECS`    | `5`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of
    /// a variable or `None` when it is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend_address = lookup("BACKEND_ADDRESS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.backend_address);

        let request_timeout = match parse(&lookup, "REQUEST_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError {
                    var: "REQUEST_TIMEOUT_SECS",
                    value: "0".to_string(),
                    reason: "must be at least 1 second".to_string(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };

        let retry = RetryConfig {
            initial_delay: parse(&lookup, "RETRY_INITIAL_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.initial_delay),
            factor: parse(&lookup, "RETRY_FACTOR")?.unwrap_or(defaults.retry.factor),
            max_delay: parse(&lookup, "RETRY_MAX_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
            jitter: parse(&lookup, "RETRY_JITTER")?.unwrap_or(defaults.retry.jitter),
            max_attempts: parse(&lookup, "RETRY_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
        };

        let shutdown_grace = match parse(&lookup, "SHUTDOWN_GRACE_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.shutdown_grace,
        };

        Ok(Self {
            backend_address,
            request_timeout,
            retry,
            shutdown_grace,
        })
    }

    /// Validate the retry parameters and build the shared policy.
    pub fn retry_policy(&self) -> Result<RetryPolicy, RetryConfigError> {
        RetryPolicy::new(self.retry.clone())
    }
}

/// Parse an optional variable, treating an empty value as unset.
fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(|e: T::Err| ConfigError {
        var,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
