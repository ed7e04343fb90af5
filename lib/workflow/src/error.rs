//! Error types for the workflow crate.
//!
//! Two layers:
//! - `DefinitionError`: problems with a workflow definition itself,
//!   raised at registration or lookup time
//! - `EngineError`: failures of engine operations against live instances
//!
//! `PermissionDenied` is deliberately distinct from `InvalidTransition`
//! so callers can render "not allowed" differently from "not possible".

use caseflow_core::InstanceId;
use std::fmt;

/// Errors from workflow definition validation and lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// No definition registered for the workflow type.
    NotFound { workflow_type: String },
    /// The definition declares no steps.
    Empty { workflow_type: String },
    /// Two steps share the same id.
    DuplicateStep {
        workflow_type: String,
        step_id: String,
    },
    /// A transition points at a step id that does not exist.
    UnknownTransitionTarget {
        workflow_type: String,
        step_id: String,
        target: String,
    },
    /// A step cannot be reached from the entry step.
    UnreachableStep {
        workflow_type: String,
        step_id: String,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { workflow_type } => {
                write!(f, "workflow definition not found: {workflow_type}")
            }
            Self::Empty { workflow_type } => {
                write!(f, "workflow definition '{workflow_type}' has no steps")
            }
            Self::DuplicateStep {
                workflow_type,
                step_id,
            } => {
                write!(f, "duplicate step id '{step_id}' in workflow '{workflow_type}'")
            }
            Self::UnknownTransitionTarget {
                workflow_type,
                step_id,
                target,
            } => {
                write!(
                    f,
                    "step '{step_id}' in workflow '{workflow_type}' transitions to unknown step '{target}'"
                )
            }
            Self::UnreachableStep {
                workflow_type,
                step_id,
            } => {
                write!(
                    f,
                    "step '{step_id}' in workflow '{workflow_type}' is unreachable from the entry step"
                )
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

/// Errors from engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Definition lookup or validation failed.
    Definition(DefinitionError),
    /// No live instance with the given id.
    WorkflowNotFound { workflow_id: InstanceId },
    /// The step id does not exist in the instance's definition.
    UnknownStep {
        workflow_id: InstanceId,
        step_id: String,
    },
    /// The target step is not reachable from the current step.
    InvalidTransition { from: String, to: String },
    /// The actor lacks the transition permission.
    PermissionDenied { actor: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definition(e) => write!(f, "definition error: {e}"),
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "workflow not found: {workflow_id}")
            }
            Self::UnknownStep {
                workflow_id,
                step_id,
            } => {
                write!(f, "unknown step '{step_id}' for workflow {workflow_id}")
            }
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid transition from '{from}' to '{to}'")
            }
            Self::PermissionDenied { actor } => {
                write!(f, "actor '{actor}' is not permitted to transition workflows")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<DefinitionError> for EngineError {
    fn from(e: DefinitionError) -> Self {
        Self::Definition(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_error_display() {
        let err = DefinitionError::NotFound {
            workflow_type: "order_fulfillment".to_string(),
        };
        assert!(err.to_string().contains("order_fulfillment"));
    }

    #[test]
    fn invalid_transition_display() {
        let err = EngineError::InvalidTransition {
            from: "new".to_string(),
            to: "shipped".to_string(),
        };
        assert!(err.to_string().contains("'new'"));
        assert!(err.to_string().contains("'shipped'"));
    }

    #[test]
    fn engine_error_from_definition_error() {
        let err: EngineError = DefinitionError::Empty {
            workflow_type: "tickets".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Definition(_)));
    }
}
