//! Workflow definition types.
//!
//! A workflow definition is a named, ordered list of steps. Each step
//! declares the actor kind responsible for it, the side-effect actions to
//! fire on entry, the step ids it may transition to, and the requirement
//! names checkable before entering it. The first step in the list is the
//! sole entry point.

use crate::error::DefinitionError;
use caseflow_core::StepActor;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single step in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step id, unique within the definition.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The kind of party responsible for acting on this step.
    pub actor: StepActor,
    /// Side-effect actions fired when an instance enters this step.
    #[serde(default)]
    pub on_enter: Vec<String>,
    /// Step ids an instance may transition to from this step.
    #[serde(default)]
    pub transitions: Vec<String>,
    /// Requirement names checkable before entering this step.
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl WorkflowStep {
    /// Creates a step with no actions, transitions, or requirements.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, actor: StepActor) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actor,
            on_enter: Vec::new(),
            transitions: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Adds on-enter actions.
    #[must_use]
    pub fn with_on_enter<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_enter.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Adds allowed outgoing transitions.
    #[must_use]
    pub fn with_transitions<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transitions.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Adds entry requirements.
    #[must_use]
    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements
            .extend(requirements.into_iter().map(Into::into));
        self
    }

    /// Returns true if this step has no outgoing transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Returns true if this step may transition to the target.
    #[must_use]
    pub fn allows_transition_to(&self, target: &str) -> bool {
        self.transitions.iter().any(|t| t == target)
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// The workflow type this definition is registered under.
    pub workflow_type: String,
    /// Ordered steps; the first is the entry point.
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    /// Creates a definition from an ordered step list.
    #[must_use]
    pub fn new(workflow_type: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            steps,
        }
    }

    /// Returns the entry step (the first step in the list).
    #[must_use]
    pub fn entry_step(&self) -> Option<&WorkflowStep> {
        self.steps.first()
    }

    /// Returns a step by id.
    #[must_use]
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Returns true if the step id exists and has no outgoing transitions.
    #[must_use]
    pub fn is_terminal(&self, step_id: &str) -> bool {
        self.step(step_id).is_some_and(WorkflowStep::is_terminal)
    }

    /// Validates the definition.
    ///
    /// Checks:
    /// - At least one step
    /// - Step ids unique within the definition
    /// - Every transition target resolves to an existing step id
    /// - Every step is reachable from the entry step
    ///
    /// # Errors
    ///
    /// Returns an error describing the first validation failure.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let Some(entry) = self.entry_step() else {
            return Err(DefinitionError::Empty {
                workflow_type: self.workflow_type.clone(),
            });
        };

        let mut ids = HashSet::new();
        for step in &self.steps {
            if !ids.insert(step.id.as_str()) {
                return Err(DefinitionError::DuplicateStep {
                    workflow_type: self.workflow_type.clone(),
                    step_id: step.id.clone(),
                });
            }
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for step in &self.steps {
            graph.add_node(step.id.as_str());
        }
        for step in &self.steps {
            for target in &step.transitions {
                if !ids.contains(target.as_str()) {
                    return Err(DefinitionError::UnknownTransitionTarget {
                        workflow_type: self.workflow_type.clone(),
                        step_id: step.id.clone(),
                        target: target.clone(),
                    });
                }
                // Self-transitions don't affect reachability.
                if step.id != *target {
                    graph.add_edge(step.id.as_str(), target.as_str(), ());
                }
            }
        }

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&graph, entry.id.as_str());
        while let Some(step_id) = dfs.next(&graph) {
            reachable.insert(step_id);
        }
        for step in &self.steps {
            if !reachable.contains(step.id.as_str()) {
                return Err(DefinitionError::UnreachableStep {
                    workflow_type: self.workflow_type.clone(),
                    step_id: step.id.clone(),
                });
            }
        }

        Ok(())
    }
}
