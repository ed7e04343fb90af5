//! Per-type completion metrics.

use caseflow_workflow::{WorkflowDefinition, WorkflowState};
use serde::{Deserialize, Serialize};

/// The well-known terminal step id counted as a cancellation.
pub const CANCELLED_STEP: &str = "cancelled";

/// Completion counts for one workflow type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    /// All live instances of the type.
    pub total: usize,
    /// Instances sitting in a terminal step other than `cancelled`.
    pub completed: usize,
    /// Instances in a non-terminal step.
    pub in_progress: usize,
    /// Instances in the `cancelled` step.
    pub cancelled: usize,
}

/// Classifies instances by where they sit in the definition.
#[must_use]
pub(crate) fn classify(definition: &WorkflowDefinition, instances: &[WorkflowState]) -> WorkflowMetrics {
    let mut metrics = WorkflowMetrics {
        total: instances.len(),
        ..WorkflowMetrics::default()
    };

    for state in instances {
        if state.current_step == CANCELLED_STEP {
            metrics.cancelled += 1;
        } else if definition.is_terminal(&state.current_step) {
            metrics.completed += 1;
        } else {
            metrics.in_progress += 1;
        }
    }

    metrics
}
