//! Completion metrics and bottleneck analysis for caseflow workflows.
//!
//! The analytics engine reads instance snapshots asynchronously and
//! never mutates them; it can run on any cadence without interfering
//! with transitions.

mod bottleneck;
mod metrics;

pub use bottleneck::{OptimizationRecommendation, StepBottleneck};
pub use metrics::{CANCELLED_STEP, WorkflowMetrics};

use caseflow_workflow::{EngineError, WorkflowEngine};
use std::sync::Arc;
use tracing::debug;

/// Aggregates instance history into per-type metrics and bottlenecks.
pub struct AnalyticsEngine {
    engine: Arc<WorkflowEngine>,
}

impl AnalyticsEngine {
    /// Creates an analytics engine over the workflow engine.
    #[must_use]
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }

    /// Returns completion metrics for a workflow type.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::NotFound` (wrapped) for an unknown type.
    pub async fn workflow_metrics(
        &self,
        workflow_type: &str,
    ) -> Result<WorkflowMetrics, EngineError> {
        let definition = self.engine.registry().definition(workflow_type)?;
        let instances = self.engine.instances_of_type(workflow_type).await;
        let metrics = metrics::classify(definition, &instances);

        debug!(
            workflow_type,
            total = metrics.total,
            completed = metrics.completed,
            "workflow metrics computed"
        );
        Ok(metrics)
    }

    /// Returns per-step dwell statistics for a workflow type, worst
    /// offenders first.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::NotFound` (wrapped) for an unknown type.
    pub async fn analyze_bottlenecks(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<StepBottleneck>, EngineError> {
        self.engine.registry().definition(workflow_type)?;
        let instances = self.engine.instances_of_type(workflow_type).await;
        Ok(bottleneck::analyze(&instances))
    }

    /// Flags bottleneck steps whose average dwell exceeds 24 hours.
    #[must_use]
    pub fn optimization_recommendations(
        &self,
        bottlenecks: &[StepBottleneck],
    ) -> Vec<OptimizationRecommendation> {
        bottleneck::recommendations(bottlenecks)
    }
}
