//! The timeout supervisor.
//!
//! Supervision is a cron-like periodic sweep: [`TimeoutSupervisor::run`]
//! ticks on a fixed interval and calls [`TimeoutSupervisor::sweep`],
//! which scans every live instance of each supervised workflow type
//! once. `sweep` is public so tests and embedders can drive supervision
//! deterministically without the interval loop.
//!
//! Forced moves go through `WorkflowEngine::transition_workflow` with the
//! system actor, over the same locked path request-driven callers use, so
//! a sweep racing a real caller resolves like any other transition race.

use crate::policy::TimeoutPolicy;
use caseflow_core::Actor;
use caseflow_workflow::{WorkflowEngine, WorkflowState};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters from one supervision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Instances found past their step's dwell budget.
    pub timed_out: usize,
    /// Forced transitions that succeeded.
    pub transitioned: usize,
    /// Forced transitions that failed (e.g. lost a race to a caller).
    pub failed: usize,
}

/// Periodically forces timeout actions and transitions on overstayed steps.
pub struct TimeoutSupervisor {
    engine: Arc<WorkflowEngine>,
    policies: HashMap<String, TimeoutPolicy>,
    sweep_interval: std::time::Duration,
}

impl TimeoutSupervisor {
    /// Default interval between sweeps.
    pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

    /// Creates a supervisor over the engine with no policies.
    #[must_use]
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            engine,
            policies: HashMap::new(),
            sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Adds a timeout policy for a workflow type.
    #[must_use]
    pub fn with_policy(mut self, workflow_type: impl Into<String>, policy: TimeoutPolicy) -> Self {
        self.policies.insert(workflow_type.into(), policy);
        self
    }

    /// Sets the interval between sweeps.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: std::time::Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Runs the supervision loop forever.
    ///
    /// Callers spawn this on the runtime; it never returns.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = self.sweep().await;
            if report.timed_out > 0 {
                info!(
                    timed_out = report.timed_out,
                    transitioned = report.transitioned,
                    failed = report.failed,
                    "timeout sweep complete"
                );
            }
        }
    }

    /// Scans every supervised instance once and enforces timeout rules.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for (workflow_type, policy) in &self.policies {
            if policy.is_empty() {
                continue;
            }
            let instances = self.engine.instances_of_type(workflow_type).await;
            for state in instances {
                self.supervise_instance(&state, policy, &mut report).await;
            }
        }

        report
    }

    async fn supervise_instance(
        &self,
        state: &WorkflowState,
        policy: &TimeoutPolicy,
        report: &mut SweepReport,
    ) {
        let Some(rule) = policy.rule(&state.current_step) else {
            return;
        };
        let dwell = state.current_dwell();
        if dwell <= rule.max_dwell {
            return;
        }

        report.timed_out += 1;
        debug!(
            workflow_id = %state.workflow_id,
            step = %state.current_step,
            dwell_minutes = dwell.num_minutes(),
            "step exceeded dwell budget"
        );

        if let Some(action) = &rule.timeout_action {
            self.engine.dispatcher().execute(action, state).await;
        }

        if let Some(target) = &rule.auto_transition_target {
            let metadata = HashMap::from([("timed_out".to_string(), json!(true))]);
            match self
                .engine
                .transition_workflow(state.workflow_id, target, &Actor::System, metadata)
                .await
            {
                Ok(after) => {
                    report.transitioned += 1;
                    info!(
                        workflow_id = %after.workflow_id,
                        from = %state.current_step,
                        to = %after.current_step,
                        "timed-out step auto-transitioned"
                    );
                }
                Err(error) => {
                    // Most likely the instance moved between snapshot and
                    // transition; the next sweep sees the fresh state.
                    report.failed += 1;
                    warn!(
                        workflow_id = %state.workflow_id,
                        target = %target,
                        %error,
                        "timeout auto-transition failed"
                    );
                }
            }
        }
    }
}
