#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vigil_client::backend::AlertBackend;
use vigil_client::error::BackendError;
use vigil_client::retry::{RetryConfig, RetryPolicy};
use vigil_core::alert::{AlertDefinition, Threshold};

/// One scripted response to a `query` call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Value(f64),
    Fail,
}

/// A backend call observed by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String),
    Notify { alert: String, message: String },
    Resolve { alert: String },
}

/// In-memory backend with scripted query results and injectable failures.
///
/// Each query target has its own script. Steps are consumed in order and
/// the final step repeats forever. A target without a script fails.
#[derive(Default)]
pub struct FakeBackend {
    alerts: Vec<AlertDefinition>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    /// Remaining `query_alerts` calls that fail before one succeeds.
    load_failures: AtomicU32,
    /// Remaining notify/resolve calls that fail before one succeeds.
    delivery_failures: AtomicU32,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(mut self, alerts: Vec<AlertDefinition>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_script(self, target: &str, steps: &[Step]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(target.to_string(), steps.iter().copied().collect());
        self
    }

    pub fn failing_loads(self, count: u32) -> Self {
        self.load_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn failing_deliveries(self, count: u32) -> Self {
        self.delivery_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Notify { alert, message } => Some((alert, message)),
                _ => None,
            })
            .collect()
    }

    pub fn resolutions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Resolve { alert } => Some(alert),
                _ => None,
            })
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Query(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable() -> BackendError {
        BackendError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
    }

    /// Decrement `counter` if positive; returns true when this call must fail.
    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AlertBackend for FakeBackend {
    async fn query_alerts(&self) -> Result<Vec<AlertDefinition>, BackendError> {
        if Self::take_failure(&self.load_failures) {
            return Err(Self::unavailable());
        }
        Ok(self.alerts.clone())
    }

    async fn query(&self, target: &str) -> Result<f64, BackendError> {
        self.record(Call::Query(target.to_string()));

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.get_mut(target);
            match script {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().copied(),
                None => None,
            }
        };

        match step {
            Some(Step::Value(value)) => Ok(value),
            Some(Step::Fail) | None => Err(Self::unavailable()),
        }
    }

    async fn notify(&self, alert_name: &str, message: &str) -> Result<(), BackendError> {
        self.record(Call::Notify {
            alert: alert_name.to_string(),
            message: message.to_string(),
        });
        if Self::take_failure(&self.delivery_failures) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    async fn resolve(&self, alert_name: &str) -> Result<(), BackendError> {
        self.record(Call::Resolve {
            alert: alert_name.to_string(),
        });
        if Self::take_failure(&self.delivery_failures) {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

/// Alert with warn=80, critical=95 evaluated every `interval_secs`.
pub fn alert(name: &str, interval_secs: i64, repeat_interval_secs: i64) -> AlertDefinition {
    AlertDefinition {
        name: name.to_string(),
        query: format!("{name}_query"),
        interval_secs,
        repeat_interval_secs,
        warn: Threshold {
            value: 80.0,
            message: format!("{name} warn"),
        },
        critical: Threshold {
            value: 95.0,
            message: format!("{name} critical"),
        },
    }
}

/// Deterministic retry policy: 3 attempts, 1s/2s backoff, no jitter.
pub fn retry_policy() -> RetryPolicy {
    RetryPolicy::new(RetryConfig {
        initial_delay: Duration::from_secs(1),
        factor: 2.0,
        max_delay: Duration::from_secs(4),
        jitter: false,
        max_attempts: 3,
    })
    .unwrap()
}
