//! Alert task supervisor.
//!
//! [`Supervisor`] loads the alert definitions once, spawns one
//! [`EvaluationLoop`] task per valid definition, and owns the master
//! [`CancellationToken`]. Each task runs under a child token so a single
//! cancel reaches every timer and in-flight backend call.
//!
//! Invalid definitions are logged and skipped; they never stop the other
//! alerts from running.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use vigil_client::backend::AlertBackend;
use vigil_client::error::BackendError;
use vigil_client::retry::{RetryError, RetryPolicy};
use vigil_core::alert::AlertDefinition;
use vigil_core::error::CoreError;

use crate::evaluation::{EvaluationLoop, LoopStats};

/// A definition that was not started, with the reason.
#[derive(Debug, Clone)]
pub struct RejectedAlert {
    pub name: String,
    pub error: CoreError,
}

/// Outcome of a supervisor run.
#[derive(Debug, Default)]
pub struct SupervisorReport {
    /// Tasks that exited on their own, with their counters.
    pub finished: Vec<(String, LoopStats)>,
    /// Tasks still running when the grace period ran out.
    pub aborted: Vec<String>,
    /// Tasks that panicked.
    pub panicked: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to load alert definitions: {0}")]
    Load(RetryError<BackendError>),

    #[error("Cancelled while loading alert definitions")]
    Cancelled,
}

/// Runs one evaluation task per alert.
pub struct Supervisor {
    tasks: JoinSet<LoopStats>,
    names: HashMap<Id, String>,
    rejected: Vec<RejectedAlert>,
    cancel: CancellationToken,
    grace: Duration,
}

impl Supervisor {
    /// Load definitions from `backend` (through `retry`) and start a task
    /// for each valid one.
    ///
    /// Fails only if the definitions cannot be loaded at all.
    pub async fn start(
        backend: Arc<dyn AlertBackend>,
        retry: RetryPolicy,
        grace: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, SupervisorError> {
        let loader = backend.as_ref();
        let definitions = retry
            .execute("query_alerts", &cancel, move || loader.query_alerts())
            .await
            .map_err(|e| match e {
                RetryError::Cancelled => SupervisorError::Cancelled,
                e => SupervisorError::Load(e),
            })?;

        tracing::info!(count = definitions.len(), "Loaded alert definitions");

        Ok(Self::spawn(definitions, backend, retry, grace, cancel))
    }

    /// Start a task for each valid definition in `definitions`.
    ///
    /// Duplicate names keep the first definition and reject the rest.
    pub fn spawn(
        definitions: Vec<AlertDefinition>,
        backend: Arc<dyn AlertBackend>,
        retry: RetryPolicy,
        grace: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let mut supervisor = Self {
            tasks: JoinSet::new(),
            names: HashMap::new(),
            rejected: Vec::new(),
            cancel,
            grace,
        };
        let mut seen = HashSet::new();

        for definition in definitions {
            let name = definition.name.clone();

            if !seen.insert(name.clone()) {
                supervisor.reject(
                    name.clone(),
                    CoreError::Validation {
                        alert: name,
                        reason: "duplicate alert name".to_string(),
                    },
                );
                continue;
            }

            let evaluation = EvaluationLoop::new(
                definition,
                Arc::clone(&backend),
                retry.clone(),
                supervisor.cancel.child_token(),
            );

            match evaluation {
                Ok(evaluation) => {
                    let interval_secs = evaluation.definition().interval_secs;
                    let handle = supervisor.tasks.spawn(evaluation.run());
                    tracing::info!(alert = %name, interval_secs, "Started alert task");
                    supervisor.names.insert(handle.id(), name);
                }
                Err(e) => supervisor.reject(name, e),
            }
        }

        tracing::info!(
            running = supervisor.names.len(),
            rejected = supervisor.rejected.len(),
            "Alert tasks started",
        );
        supervisor
    }

    fn reject(&mut self, name: String, error: CoreError) {
        tracing::error!(alert = %name, error = %error, "Rejected alert definition");
        self.rejected.push(RejectedAlert { name, error });
    }

    /// Names of the alerts that have a running task.
    pub fn running(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn rejected(&self) -> &[RejectedAlert] {
        &self.rejected
    }

    /// Handle to the master token. Cancelling it shuts every task down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for every task to finish, or for the master token to be
    /// cancelled, whichever comes first.
    ///
    /// Alert tasks normally never finish, so this returns after a shutdown:
    /// tasks get the grace period to observe cancellation and the rest are
    /// aborted.
    pub async fn run(mut self) -> SupervisorReport {
        let mut report = SupervisorReport::default();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                joined = self.tasks.join_next_with_id() => match joined {
                    Some(result) => self.record(result, &mut report),
                    None => return report,
                },
            }
        }

        self.drain(report).await
    }

    /// Cancel every task and wait for them within the grace period.
    pub async fn shutdown(self) -> SupervisorReport {
        self.drain(SupervisorReport::default()).await
    }

    async fn drain(mut self, mut report: SupervisorReport) -> SupervisorReport {
        tracing::info!(
            tasks = self.tasks.len(),
            grace_secs = self.grace.as_secs_f64(),
            "Stopping alert tasks",
        );
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + self.grace;
        loop {
            match tokio::time::timeout_at(deadline, self.tasks.join_next_with_id()).await {
                Ok(Some(result)) => self.record(result, &mut report),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        remaining = self.tasks.len(),
                        "Grace period elapsed, aborting alert tasks",
                    );
                    self.tasks.abort_all();
                    while let Some(result) = self.tasks.join_next_with_id().await {
                        self.record(result, &mut report);
                    }
                    break;
                }
            }
        }

        tracing::info!(
            finished = report.finished.len(),
            aborted = report.aborted.len(),
            panicked = report.panicked.len(),
            "Alert tasks stopped",
        );
        report
    }

    fn record(
        &mut self,
        result: Result<(Id, LoopStats), tokio::task::JoinError>,
        report: &mut SupervisorReport,
    ) {
        match result {
            Ok((id, stats)) => {
                let name = self.names.remove(&id).unwrap_or_default();
                report.finished.push((name, stats));
            }
            Err(e) => {
                let name = self.names.remove(&e.id()).unwrap_or_default();
                if e.is_cancelled() {
                    report.aborted.push(name);
                } else {
                    tracing::error!(alert = %name, error = %e, "Alert task panicked");
                    report.panicked.push(name);
                }
            }
        }
    }
}
