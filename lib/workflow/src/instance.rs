//! Live workflow instance state.
//!
//! A `WorkflowState` is one running instance of a workflow definition,
//! tied to a business entity. It is created once, advanced only through
//! the engine's transition path, and never deleted by this crate.
//! History is append-only: one entry at creation, exactly one more per
//! successful transition.

use caseflow_core::{Actor, InstanceId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// The kind of event a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// The instance was created at the definition's entry step.
    WorkflowInitialized,
    /// The instance moved to a new step.
    StepTransition,
}

/// One entry in an instance's transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The step the instance was in after this event.
    pub step_id: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Who drove the event.
    pub actor: Actor,
    /// What kind of event this was.
    pub action: HistoryAction,
    /// Metadata supplied with the event.
    pub metadata: HashMap<String, JsonValue>,
}

/// The live state of one workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Unique instance id, immutable after creation.
    pub workflow_id: InstanceId,
    /// The workflow type this instance runs.
    pub workflow_type: String,
    /// The step the instance is currently in.
    pub current_step: String,
    /// The business entity this instance is attached to.
    pub entity_id: String,
    /// The kind of business entity (e.g. "order", "ticket").
    pub entity_type: String,
    /// Accumulated instance metadata; transition metadata merges in here.
    pub metadata: HashMap<String, JsonValue>,
    /// Append-only event history.
    pub history: Vec<HistoryEntry>,
    /// When the instance was created.
    pub created_at: DateTime<Utc>,
    /// When the instance last changed.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Creates a new instance at the given entry step, with the initial
    /// history entry attributed to the system actor.
    #[must_use]
    pub fn new(
        workflow_type: impl Into<String>,
        entry_step: impl Into<String>,
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
        initial_metadata: HashMap<String, JsonValue>,
    ) -> Self {
        let entry_step = entry_step.into();
        let now = Utc::now();
        let initial_entry = HistoryEntry {
            step_id: entry_step.clone(),
            timestamp: now,
            actor: Actor::System,
            action: HistoryAction::WorkflowInitialized,
            metadata: HashMap::new(),
        };

        Self {
            workflow_id: InstanceId::new(),
            workflow_type: workflow_type.into(),
            current_step: entry_step,
            entity_id: entity_id.into(),
            entity_type: entity_type.into(),
            metadata: initial_metadata,
            history: vec![initial_entry],
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances the instance to a new step.
    ///
    /// Updates the current step, merges the transition metadata into the
    /// instance metadata (overwriting overlapping keys), and appends a
    /// history entry, all stamped with the same timestamp so the history
    /// tail always matches the current step.
    pub fn advance(
        &mut self,
        target_step: impl Into<String>,
        actor: Actor,
        transition_metadata: HashMap<String, JsonValue>,
    ) {
        let target_step = target_step.into();
        let now = Utc::now();

        for (key, value) in &transition_metadata {
            self.metadata.insert(key.clone(), value.clone());
        }

        self.history.push(HistoryEntry {
            step_id: target_step.clone(),
            timestamp: now,
            actor,
            action: HistoryAction::StepTransition,
            metadata: transition_metadata,
        });
        self.current_step = target_step;
        self.updated_at = now;
    }

    /// Returns the timestamp of the most recent history entry.
    ///
    /// The newest entry is by construction the one that put the instance
    /// into its current step.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.history
            .last()
            .map_or(self.created_at, |entry| entry.timestamp)
    }

    /// Returns how long the instance has dwelled in its current step.
    #[must_use]
    pub fn current_dwell(&self) -> Duration {
        Utc::now() - self.last_activity()
    }

    /// Returns the number of successful transitions this instance has made.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }
}
