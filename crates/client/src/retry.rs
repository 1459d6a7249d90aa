//! Bounded exponential-backoff retry for backend calls.
//!
//! [`RetryPolicy::execute`] wraps one fallible async call. Failed attempts
//! are retried after an exponentially growing, jittered delay until the
//! attempt budget runs out or the [`CancellationToken`] is triggered. The
//! budget is counted in attempts, never in elapsed time, so an evaluation
//! tick always makes progress.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor by which the delay grows after each failure. Must exceed 1.
    pub factor: f64,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Draw each actual delay uniformly from `[0, delay]` (full jitter).
    pub jitter: bool,
    /// Total number of attempts, including the first call.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            factor: 2.0,
            max_delay: Duration::from_secs(1),
            jitter: true,
            max_attempts: 5,
        }
    }
}

/// Rejected [`RetryConfig`] values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryConfigError {
    #[error("Backoff factor must be a finite number greater than 1, got {0}")]
    Factor(f64),

    #[error("Max delay ({max:?}) must not be shorter than the initial delay ({initial:?})")]
    MaxDelayBelowInitial { initial: Duration, max: Duration },

    #[error("Attempt budget must be at least 1")]
    ZeroAttempts,
}

/// Why [`RetryPolicy::execute`] gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the error of the final attempt.
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The cancellation token fired before the call succeeded.
    #[error("Cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// The error of the final attempt, if the budget was exhausted.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A validated retry strategy, shared by every call an alert makes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Validate `config` and build a policy from it.
    pub fn new(config: RetryConfig) -> Result<Self, RetryConfigError> {
        if !config.factor.is_finite() || config.factor <= 1.0 {
            return Err(RetryConfigError::Factor(config.factor));
        }
        if config.max_delay < config.initial_delay {
            return Err(RetryConfigError::MaxDelayBelowInitial {
                initial: config.initial_delay,
                max: config.max_delay,
            });
        }
        if config.max_attempts == 0 {
            return Err(RetryConfigError::ZeroAttempts);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Un-jittered delay before retry number `retry` (0-based), clamped to
    /// [`RetryConfig::max_delay`].
    pub fn backoff_ceiling(&self, retry: u32) -> Duration {
        let initial = self.config.initial_delay.as_secs_f64();
        let max = self.config.max_delay.as_secs_f64();
        let scaled = initial * self.config.factor.powi(retry.min(64) as i32);
        // `f64::min` ignores a NaN operand, so an overflowing product clamps to `max`.
        Duration::from_secs_f64(scaled.min(max))
    }

    /// Actual delay before retry number `retry`, with jitter applied.
    pub fn next_delay(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_ceiling(retry);
        if !self.config.jitter {
            return ceiling;
        }
        let ceiling_ms = ceiling.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=ceiling_ms))
    }

    /// Run `call` until it succeeds, the attempt budget is spent, or
    /// `cancel` fires.
    ///
    /// `operation` names the call in log lines. Both the in-flight call and
    /// the backoff sleep are abandoned as soon as `cancel` is triggered.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = call() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= self.config.max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.next_delay(attempt - 1);
            tracing::warn!(
                operation,
                attempt,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying",
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
