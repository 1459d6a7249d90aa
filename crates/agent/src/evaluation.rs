//! Per-alert evaluation loop.
//!
//! [`EvaluationLoop`] owns one alert's [`AlertStateMachine`] and drives it
//! on a fixed period: query the value, decide, and deliver the resulting
//! notify/resolve call. Every backend call goes through the shared
//! [`RetryPolicy`]. Failures are logged and the tick is abandoned; the
//! loop itself only stops when its [`CancellationToken`] is triggered.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use vigil_client::backend::AlertBackend;
use vigil_client::retry::{RetryError, RetryPolicy};
use vigil_core::alert::AlertDefinition;
use vigil_core::error::CoreError;
use vigil_core::state_machine::{Action, AlertStateMachine};

/// Counters reported when a loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub notifications: u64,
    pub resolutions: u64,
    pub failed_queries: u64,
    pub failed_deliveries: u64,
}

/// Epoch seconds derived from a monotonic clock anchored at loop start,
/// so repeat-interval arithmetic is unaffected by wall-clock jumps.
struct EpochClock {
    start_epoch: i64,
    started: Instant,
}

impl EpochClock {
    fn start() -> Self {
        Self {
            start_epoch: Utc::now().timestamp(),
            started: Instant::now(),
        }
    }

    fn now(&self) -> i64 {
        self.start_epoch + self.started.elapsed().as_secs() as i64
    }
}

/// Drives a single alert until cancelled.
pub struct EvaluationLoop {
    definition: AlertDefinition,
    backend: Arc<dyn AlertBackend>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl EvaluationLoop {
    /// Validate `definition` and prepare a loop for it.
    ///
    /// An invalid definition is rejected here, before any task is spawned.
    pub fn new(
        definition: AlertDefinition,
        backend: Arc<dyn AlertBackend>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        definition.validate()?;
        Ok(Self {
            definition,
            backend,
            retry,
            cancel,
        })
    }

    pub fn definition(&self) -> &AlertDefinition {
        &self.definition
    }

    /// Run until the cancellation token fires.
    ///
    /// The first evaluation happens one interval after start. Ticks missed
    /// while a slow tick was retrying are skipped, not queued.
    pub async fn run(self) -> LoopStats {
        let period = Duration::from_secs(self.definition.interval_secs.unsigned_abs());
        let clock = EpochClock::start();
        let mut machine = AlertStateMachine::new(clock.now());
        let mut stats = LoopStats::default();

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            alert = %self.definition.name,
            interval_secs = self.definition.interval_secs,
            repeat_interval_secs = self.definition.repeat_interval_secs,
            "Evaluation loop started",
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            stats.ticks += 1;
            if self.tick(&mut machine, &clock, &mut stats).await.is_break() {
                break;
            }
        }

        tracing::info!(
            alert = %self.definition.name,
            ticks = stats.ticks,
            notifications = stats.notifications,
            resolutions = stats.resolutions,
            "Evaluation loop stopped",
        );
        stats
    }

    /// One evaluation: query, decide, deliver.
    ///
    /// Breaks only when cancelled mid-call.
    async fn tick(
        &self,
        machine: &mut AlertStateMachine,
        clock: &EpochClock,
        stats: &mut LoopStats,
    ) -> ControlFlow<()> {
        let backend = self.backend.as_ref();
        let name = self.definition.name.as_str();
        let query = self.definition.query.as_str();

        let value = match self
            .retry
            .execute("query", &self.cancel, move || backend.query(query))
            .await
        {
            Ok(value) => value,
            Err(RetryError::Cancelled) => return ControlFlow::Break(()),
            Err(e) => {
                stats.failed_queries += 1;
                tracing::error!(alert = %name, query = %query, error = %e, "Query failed, skipping tick");
                return ControlFlow::Continue(());
            }
        };

        let now = clock.now();
        let transition = machine.observe(&self.definition, value, now);

        tracing::info!(
            alert = %name,
            query = %query,
            value,
            state = %transition.current,
            transition = %format_args!("{} -> {}", transition.previous, transition.current),
            timestamp = now,
            "Evaluated alert",
        );

        let delivery = match &transition.action {
            Action::None => return ControlFlow::Continue(()),
            Action::Notify { message } => {
                tracing::info!(alert = %name, severity = %transition.current, message = %message, "Sending notification");
                let result = self
                    .retry
                    .execute("notify", &self.cancel, move || backend.notify(name, message))
                    .await;
                if result.is_ok() {
                    stats.notifications += 1;
                }
                result
            }
            Action::Resolve => {
                tracing::info!(alert = %name, "Resolving alert");
                let result = self
                    .retry
                    .execute("resolve", &self.cancel, move || backend.resolve(name))
                    .await;
                if result.is_ok() {
                    stats.resolutions += 1;
                }
                result
            }
        };

        match delivery {
            Ok(()) => ControlFlow::Continue(()),
            Err(RetryError::Cancelled) => ControlFlow::Break(()),
            Err(e) => {
                // The state machine keeps the decided severity; only the
                // delivery is lost.
                stats.failed_deliveries += 1;
                tracing::error!(alert = %name, error = %e, "Delivery failed");
                ControlFlow::Continue(())
            }
        }
    }
}
