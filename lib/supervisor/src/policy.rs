//! Per-step timeout policies.

use chrono::Duration;
use std::collections::HashMap;

/// What to do when an instance overstays a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTimeoutRule {
    /// Maximum dwell time before the rule fires.
    pub max_dwell: Duration,
    /// Action to fire through the dispatcher when the rule triggers.
    pub timeout_action: Option<String>,
    /// Step to force the instance into, as the system actor.
    pub auto_transition_target: Option<String>,
}

impl StepTimeoutRule {
    /// Creates a rule with no action and no auto-transition.
    #[must_use]
    pub fn new(max_dwell: Duration) -> Self {
        Self {
            max_dwell,
            timeout_action: None,
            auto_transition_target: None,
        }
    }

    /// Sets the timeout action.
    #[must_use]
    pub fn with_timeout_action(mut self, action: impl Into<String>) -> Self {
        self.timeout_action = Some(action.into());
        self
    }

    /// Sets the automatic transition target.
    #[must_use]
    pub fn with_auto_transition(mut self, target: impl Into<String>) -> Self {
        self.auto_transition_target = Some(target.into());
        self
    }
}

/// Timeout rules for one workflow type, keyed by step id.
///
/// A rule with a timeout action but no auto-transition target fires its
/// action on every sweep until something moves the instance along; the
/// supervisor does not remember which instances it has already nagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutPolicy {
    rules: HashMap<String, StepTimeoutRule>,
}

impl TimeoutPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for a step.
    #[must_use]
    pub fn with_rule(mut self, step_id: impl Into<String>, rule: StepTimeoutRule) -> Self {
        self.rules.insert(step_id.into(), rule);
        self
    }

    /// Returns the rule for a step, if one is configured.
    #[must_use]
    pub fn rule(&self, step_id: &str) -> Option<&StepTimeoutRule> {
        self.rules.get(step_id)
    }

    /// Returns true if no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
