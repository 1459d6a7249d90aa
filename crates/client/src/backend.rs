//! Capability trait for the metrics and alerting backend.
//!
//! The engine only ever talks to the backend through [`AlertBackend`], so
//! the retry policy and the evaluation loop can run against a fake in
//! tests. Implementations must be safe to share across every alert task.

use async_trait::async_trait;
use vigil_core::alert::AlertDefinition;

use crate::error::BackendError;

/// The four operations the engine needs from the backend.
///
/// Notify and resolve may be delivered more than once (the engine retries
/// them), so the backend must tolerate duplicates. Cancellation happens by
/// dropping the returned future.
#[async_trait]
pub trait AlertBackend: Send + Sync {
    /// Fetch every alert definition.
    async fn query_alerts(&self) -> Result<Vec<AlertDefinition>, BackendError>;

    /// Evaluate a query to a single scalar.
    async fn query(&self, target: &str) -> Result<f64, BackendError>;

    /// Send a notification for an alert.
    async fn notify(&self, alert_name: &str, message: &str) -> Result<(), BackendError>;

    /// Mark an alert as resolved.
    async fn resolve(&self, alert_name: &str) -> Result<(), BackendError>;
}
