//! Per-alert notification state machine.
//!
//! Pure logic -- no I/O and no clock access. The caller supplies the
//! observed value and the current epoch seconds, and performs whatever
//! backend call the returned [`Action`] asks for.
//!
//! Notifications are edge-triggered on every severity change and
//! level-triggered every `repeat_interval_secs` while the alert stays
//! unhealthy. Returning to `Pass` resolves exactly once.

use crate::alert::AlertDefinition;
use crate::severity::Severity;

/// What the caller must do after an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing changed that warrants a backend call.
    None,
    /// Send a notification carrying the threshold's message.
    Notify { message: String },
    /// Resolve the alert.
    Resolve,
}

/// Outcome of feeding one observation into an [`AlertStateMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Severity recorded before this observation.
    pub previous: Severity,
    /// Severity of this observation.
    pub current: Severity,
    pub action: Action,
}

/// Runtime state of a single alert.
///
/// Owned by exactly one evaluation loop. `last_transition_epoch` moves
/// only when an action is decided (or at construction), never on a
/// no-op observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertStateMachine {
    previous_state: Severity,
    last_transition_epoch: i64,
}

impl AlertStateMachine {
    /// Start in `Pass` with the transition clock set to `start_epoch`.
    pub fn new(start_epoch: i64) -> Self {
        Self {
            previous_state: Severity::Pass,
            last_transition_epoch: start_epoch,
        }
    }

    pub fn previous_state(&self) -> Severity {
        self.previous_state
    }

    pub fn last_transition_epoch(&self) -> i64 {
        self.last_transition_epoch
    }

    /// Decide the action for an already-classified observation without
    /// mutating any state.
    pub fn decide(&self, definition: &AlertDefinition, current: Severity, now: i64) -> Action {
        if current.is_pass() {
            if self.previous_state.is_pass() {
                return Action::None;
            }
            return Action::Resolve;
        }

        let elapsed = now.saturating_sub(self.last_transition_epoch);
        if current != self.previous_state || elapsed >= definition.repeat_interval_secs {
            let message = match current {
                Severity::Critical => &definition.critical.message,
                _ => &definition.warn.message,
            };
            return Action::Notify {
                message: message.clone(),
            };
        }

        Action::None
    }

    /// Classify `value`, decide, and apply the decision.
    ///
    /// On `Notify` or `Resolve` the new severity and `now` are recorded
    /// unconditionally: the state reflects the decision, not whether the
    /// backend later accepted the call.
    pub fn observe(&mut self, definition: &AlertDefinition, value: f64, now: i64) -> Transition {
        let current = Severity::classify(definition, value);
        let previous = self.previous_state;
        let action = self.decide(definition, current, now);

        if action != Action::None {
            self.previous_state = current;
            self.last_transition_epoch = now;
        }

        Transition {
            previous,
            current,
            action,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Threshold;

    fn definition(repeat_interval_secs: i64) -> AlertDefinition {
        AlertDefinition {
            name: "disk".to_string(),
            query: "disk_used_percent".to_string(),
            interval_secs: 60,
            repeat_interval_secs,
            warn: Threshold {
                value: 80.0,
                message: "disk filling up".to_string(),
            },
            critical: Threshold {
                value: 95.0,
                message: "disk almost full".to_string(),
            },
        }
    }

    fn notify(message: &str) -> Action {
        Action::Notify {
            message: message.to_string(),
        }
    }

    #[test]
    fn starts_in_pass_at_start_epoch() {
        let machine = AlertStateMachine::new(1_000);
        assert_eq!(machine.previous_state(), Severity::Pass);
        assert_eq!(machine.last_transition_epoch(), 1_000);
    }

    #[test]
    fn pass_while_pass_is_silent() {
        let def = definition(300);
        let mut machine = AlertStateMachine::new(0);

        let t = machine.observe(&def, 10.0, 5_000);

        assert_eq!(t.action, Action::None);
        assert_eq!(machine.last_transition_epoch(), 0);
    }

    #[test]
    fn pass_to_warn_notifies_with_warn_message() {
        let def = definition(300);
        let mut machine = AlertStateMachine::new(0);

        let t = machine.observe(&def, 85.0, 10);

        assert_eq!(t.previous, Severity::Pass);
        assert_eq!(t.current, Severity::Warn);
        assert_eq!(t.action, notify("disk filling up"));
        assert_eq!(machine.previous_state(), Severity::Warn);
        assert_eq!(machine.last_transition_epoch(), 10);
    }

    #[test]
    fn repeated_warn_is_debounced_until_repeat_interval() {
        let def = definition(300);
        let mut machine = AlertStateMachine::new(0);
        machine.observe(&def, 85.0, 0);

        assert_eq!(machine.observe(&def, 85.0, 299).action, Action::None);
        assert_eq!(machine.last_transition_epoch(), 0);

        assert_eq!(
            machine.observe(&def, 85.0, 300).action,
            notify("disk filling up")
        );
        assert_eq!(machine.last_transition_epoch(), 300);
    }

    #[test]
    fn warn_to_critical_notifies_immediately() {
        let def = definition(3_600);
        let mut machine = AlertStateMachine::new(0);
        machine.observe(&def, 85.0, 0);

        let t = machine.observe(&def, 99.0, 1);

        assert_eq!(t.previous, Severity::Warn);
        assert_eq!(t.action, notify("disk almost full"));
    }

    #[test]
    fn critical_to_warn_notifies_with_warn_message() {
        let def = definition(3_600);
        let mut machine = AlertStateMachine::new(0);
        machine.observe(&def, 99.0, 0);

        assert_eq!(
            machine.observe(&def, 90.0, 1).action,
            notify("disk filling up")
        );
    }

    #[test]
    fn critical_to_pass_resolves_once() {
        let def = definition(300);
        let mut machine = AlertStateMachine::new(0);
        machine.observe(&def, 99.0, 0);

        let t = machine.observe(&def, 50.0, 30);
        assert_eq!(t.action, Action::Resolve);
        assert_eq!(machine.previous_state(), Severity::Pass);
        assert_eq!(machine.last_transition_epoch(), 30);

        assert_eq!(machine.observe(&def, 50.0, 1_000).action, Action::None);
        assert_eq!(machine.last_transition_epoch(), 30);
    }

    #[test]
    fn zero_repeat_interval_notifies_every_observation() {
        let def = definition(0);
        let mut machine = AlertStateMachine::new(0);

        for now in 0..5 {
            assert_eq!(
                machine.observe(&def, 85.0, now).action,
                notify("disk filling up")
            );
        }
    }

    #[test]
    fn decide_does_not_mutate() {
        let def = definition(300);
        let machine = AlertStateMachine::new(0);

        let action = machine.decide(&def, Severity::Critical, 10);

        assert_eq!(action, notify("disk almost full"));
        assert_eq!(machine, AlertStateMachine::new(0));
    }

    #[test]
    fn repeat_clock_counts_from_start_epoch_for_first_breach() {
        // The first breach is a severity change, so it fires regardless of
        // how long ago the loop started.
        let def = definition(300);
        let mut machine = AlertStateMachine::new(1_000);

        assert_eq!(
            machine.observe(&def, 85.0, 1_001).action,
            notify("disk filling up")
        );
    }
}
