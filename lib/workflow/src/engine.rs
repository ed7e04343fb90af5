//! The workflow engine.
//!
//! Orchestrates definitions, permissions, instance storage, requirement
//! checks, and on-enter actions. The engine is a plain value constructed
//! once at process start and shared (typically as `Arc<WorkflowEngine>`)
//! with every caller; there is no global instance.
//!
//! Transition semantics: validation (permission gate, then edge check),
//! state mutation, and history append happen as one critical section
//! under the per-instance lock. Two callers racing to transition the
//! same instance cannot both succeed from the same prior state; the
//! loser is validated against the winner's committed state. On-enter
//! actions run after the lock is released, so slow or failing side
//! effects never stall other transitions.

use crate::action::ActionDispatcher;
use crate::definition::WorkflowStep;
use crate::error::EngineError;
use crate::instance::{HistoryEntry, WorkflowState};
use crate::registry::DefinitionRegistry;
use crate::requirement::{RequirementContext, RequirementEvaluator, RequirementOutcome};
use crate::store::InstanceStore;
use caseflow_authz::{PermissionEvaluator, TRANSITION_PERMISSION};
use caseflow_core::{Actor, InstanceId};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The workflow engine.
pub struct WorkflowEngine {
    registry: DefinitionRegistry,
    permissions: PermissionEvaluator,
    dispatcher: ActionDispatcher,
    requirements: RequirementEvaluator,
    store: Arc<dyn InstanceStore>,
}

impl WorkflowEngine {
    /// Creates an engine over the given collaborators.
    ///
    /// The requirement evaluator starts with the built-in predicates;
    /// use [`WorkflowEngine::with_requirement_evaluator`] to customize.
    #[must_use]
    pub fn new(
        registry: DefinitionRegistry,
        permissions: PermissionEvaluator,
        dispatcher: ActionDispatcher,
        store: Arc<dyn InstanceStore>,
    ) -> Self {
        Self {
            registry,
            permissions,
            dispatcher,
            requirements: RequirementEvaluator::new(),
            store,
        }
    }

    /// Replaces the requirement evaluator.
    #[must_use]
    pub fn with_requirement_evaluator(mut self, requirements: RequirementEvaluator) -> Self {
        self.requirements = requirements;
        self
    }

    /// Returns the definition registry.
    #[must_use]
    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Returns the action dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Returns the instance store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn InstanceStore> {
        &self.store
    }

    /// Creates a new workflow instance at the definition's entry step.
    ///
    /// Writes the initial history entry with the system actor, then runs
    /// the entry step's on-enter actions against the committed state.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::NotFound` (wrapped) for an unknown
    /// workflow type, or `DefinitionError::Empty` for a definition with
    /// no steps.
    pub async fn initialize_workflow(
        &self,
        workflow_type: &str,
        entity_id: &str,
        entity_type: &str,
        initial_metadata: HashMap<String, JsonValue>,
    ) -> Result<WorkflowState, EngineError> {
        let definition = self.registry.definition(workflow_type)?;
        let entry_step = definition
            .entry_step()
            .ok_or_else(|| crate::error::DefinitionError::Empty {
                workflow_type: workflow_type.to_string(),
            })?
            .clone();

        let state = WorkflowState::new(
            workflow_type,
            &entry_step.id,
            entity_id,
            entity_type,
            initial_metadata,
        );
        let snapshot = state.clone();
        self.store.insert(state).await;

        info!(
            workflow_id = %snapshot.workflow_id,
            workflow_type,
            entity_id,
            entry_step = %entry_step.id,
            "workflow initialized"
        );

        self.dispatcher.execute_on_enter(&entry_step, &snapshot).await;

        Ok(snapshot)
    }

    /// Transitions a workflow instance to a target step.
    ///
    /// Validation, mutation, and history append happen atomically under
    /// the instance lock; on any validation failure the state is left
    /// unchanged. On-enter actions for the entered step run after the
    /// lock is released and never undo the committed transition.
    ///
    /// # Errors
    ///
    /// - `WorkflowNotFound` for an unknown instance id
    /// - `PermissionDenied` if the actor lacks the transition permission
    /// - `InvalidTransition` if the target is not reachable from the
    ///   current step
    pub async fn transition_workflow(
        &self,
        workflow_id: InstanceId,
        target_step: &str,
        actor: &Actor,
        transition_metadata: HashMap<String, JsonValue>,
    ) -> Result<WorkflowState, EngineError> {
        let handle = self
            .store
            .handle(workflow_id)
            .await
            .ok_or(EngineError::WorkflowNotFound { workflow_id })?;

        let (entered_step, snapshot) = {
            let mut state = handle.lock().await;
            let definition = self.registry.definition(&state.workflow_type)?;

            let current_id = state.current_step.clone();
            let from_step = definition
                .step(&current_id)
                .ok_or_else(|| EngineError::UnknownStep {
                    workflow_id,
                    step_id: current_id.clone(),
                })?;
            self.validate_transition(from_step, target_step, actor)?;

            let entered_step = definition
                .step(target_step)
                .ok_or_else(|| EngineError::UnknownStep {
                    workflow_id,
                    step_id: target_step.to_string(),
                })?
                .clone();

            state.advance(target_step, actor.clone(), transition_metadata);
            (entered_step, state.clone())
        };

        info!(
            workflow_id = %workflow_id,
            to = target_step,
            actor = %actor,
            "workflow transitioned"
        );

        self.dispatcher
            .execute_on_enter(&entered_step, &snapshot)
            .await;

        Ok(snapshot)
    }

    /// Validates a transition without mutating anything.
    ///
    /// The permission gate runs before the edge check so a caller without
    /// the transition permission learns nothing about the step graph.
    fn validate_transition(
        &self,
        from_step: &WorkflowStep,
        to_step: &str,
        actor: &Actor,
    ) -> Result<(), EngineError> {
        if !self.permissions.has_permission(actor, TRANSITION_PERMISSION) {
            return Err(EngineError::PermissionDenied {
                actor: actor.to_string(),
            });
        }

        if !from_step.allows_transition_to(to_step) {
            return Err(EngineError::InvalidTransition {
                from: from_step.id.clone(),
                to: to_step.to_string(),
            });
        }

        Ok(())
    }

    /// Returns a point-in-time copy of an instance, if it exists.
    pub async fn workflow_state(&self, workflow_id: InstanceId) -> Option<WorkflowState> {
        self.store.snapshot(workflow_id).await
    }

    /// Returns the transition history of an instance.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` for an unknown instance id.
    pub async fn workflow_history(
        &self,
        workflow_id: InstanceId,
    ) -> Result<Vec<HistoryEntry>, EngineError> {
        self.store
            .snapshot(workflow_id)
            .await
            .map(|state| state.history)
            .ok_or(EngineError::WorkflowNotFound { workflow_id })
    }

    /// Returns the requirement names declared on a step of an instance's
    /// definition.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` for an unknown instance id, or
    /// `UnknownStep` if the step is not part of the definition.
    pub async fn step_requirements(
        &self,
        workflow_id: InstanceId,
        step_id: &str,
    ) -> Result<Vec<String>, EngineError> {
        let step = self.instance_step(workflow_id, step_id).await?;
        Ok(step.requirements)
    }

    /// Evaluates a step's requirements against the instance metadata
    /// merged with caller-supplied context (caller fields win).
    ///
    /// Advisory: the transition path does not consult this. Callers check
    /// before attempting a transition and act on `missing`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowNotFound` for an unknown instance id, or
    /// `UnknownStep` if the step is not part of the definition.
    pub async fn check_step_requirements(
        &self,
        workflow_id: InstanceId,
        step_id: &str,
        extra_context: RequirementContext,
    ) -> Result<RequirementOutcome, EngineError> {
        let state = self
            .store
            .snapshot(workflow_id)
            .await
            .ok_or(EngineError::WorkflowNotFound { workflow_id })?;
        let definition = self.registry.definition(&state.workflow_type)?;
        let step = definition
            .step(step_id)
            .ok_or_else(|| EngineError::UnknownStep {
                workflow_id,
                step_id: step_id.to_string(),
            })?;

        let mut context = state.metadata;
        context.extend(extra_context);

        let outcome = self.requirements.validate(&step.requirements, &context);
        debug!(
            workflow_id = %workflow_id,
            step_id,
            valid = outcome.valid,
            "step requirements checked"
        );
        Ok(outcome)
    }

    /// Returns point-in-time copies of every instance of a workflow type.
    pub async fn instances_of_type(&self, workflow_type: &str) -> Vec<WorkflowState> {
        self.store.snapshots_of_type(workflow_type).await
    }

    async fn instance_step(
        &self,
        workflow_id: InstanceId,
        step_id: &str,
    ) -> Result<WorkflowStep, EngineError> {
        let state = self
            .store
            .snapshot(workflow_id)
            .await
            .ok_or(EngineError::WorkflowNotFound { workflow_id })?;
        let definition = self.registry.definition(&state.workflow_type)?;
        definition
            .step(step_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownStep {
                workflow_id,
                step_id: step_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionError, ActionHandler};
    use crate::definition::WorkflowDefinition;
    use crate::error::DefinitionError;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use caseflow_authz::{RolePolicy, SecurityPolicies};
    use caseflow_core::StepActor;
    use serde_json::json;
    use std::sync::Mutex;

    /// Counts invocations per action name.
    struct CountingHandler {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ActionHandler for CountingHandler {
        async fn execute(&self, _state: &WorkflowState) -> Result<(), ActionError> {
            self.calls.lock().unwrap().push(self.name.to_string());
            Ok(())
        }
    }

    fn order_fulfillment() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "order_fulfillment",
            vec![
                WorkflowStep::new("new", "New order", StepActor::InternalStaff)
                    .with_on_enter(["send_confirmation_email"])
                    .with_transitions(["design", "cancelled"]),
                WorkflowStep::new("design", "Design", StepActor::InternalStaff)
                    .with_on_enter(["notify_design_team"])
                    .with_transitions(["production", "cancelled"])
                    .with_requirements(["designer_assigned"]),
                WorkflowStep::new("production", "Production", StepActor::InternalStaff)
                    .with_on_enter(["schedule_production"])
                    .with_transitions(["shipped"])
                    .with_requirements(["payment_confirmation"]),
                WorkflowStep::new("shipped", "Shipped", StepActor::System),
                WorkflowStep::new("cancelled", "Cancelled", StepActor::System),
            ],
        )
    }

    fn policies() -> SecurityPolicies {
        SecurityPolicies::default()
            .with_role("admin", RolePolicy::new(["*"]))
            .with_role("coordinator", RolePolicy::new(["workflow:transition"]))
            .with_role(
                "salesperson",
                RolePolicy::new(["create_orders", "edit_orders"]),
            )
    }

    fn engine_with_calls() -> (WorkflowEngine, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut registry = DefinitionRegistry::new();
        registry.register(order_fulfillment()).expect("valid");

        let mut dispatcher = ActionDispatcher::new();
        for name in [
            "send_confirmation_email",
            "notify_design_team",
            "schedule_production",
        ] {
            dispatcher.register(
                name,
                Arc::new(CountingHandler {
                    name,
                    calls: calls.clone(),
                }),
            );
        }

        let engine = WorkflowEngine::new(
            registry,
            PermissionEvaluator::new(policies()),
            dispatcher,
            Arc::new(InMemoryStore::new()),
        );
        (engine, calls)
    }

    async fn initialized(engine: &WorkflowEngine) -> WorkflowState {
        engine
            .initialize_workflow("order_fulfillment", "order-1", "order", HashMap::new())
            .await
            .expect("initialize")
    }

    #[tokio::test]
    async fn initialize_starts_at_entry_step() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;

        assert_eq!(state.current_step, "new");
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            state.history[0].action,
            crate::instance::HistoryAction::WorkflowInitialized
        );
        assert_eq!(state.history[0].actor, Actor::System);
        assert_eq!(state.entity_id, "order-1");
    }

    #[tokio::test]
    async fn initialize_unknown_type_fails() {
        let (engine, _calls) = engine_with_calls();
        let result = engine
            .initialize_workflow("returns", "order-1", "order", HashMap::new())
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Definition(DefinitionError::NotFound { .. }))
        ));
        assert_eq!(engine.store().count().await, 0);
    }

    #[tokio::test]
    async fn initialize_fires_entry_actions() {
        let (engine, calls) = engine_with_calls();
        initialized(&engine).await;

        assert_eq!(*calls.lock().unwrap(), vec!["send_confirmation_email"]);
    }

    #[tokio::test]
    async fn transition_by_system_succeeds_and_fires_actions() {
        let (engine, calls) = engine_with_calls();
        let state = initialized(&engine).await;
        calls.lock().unwrap().clear();

        let after = engine
            .transition_workflow(state.workflow_id, "design", &Actor::System, HashMap::new())
            .await
            .expect("transition");

        assert_eq!(after.current_step, "design");
        assert_eq!(after.history.len(), 2);
        assert_eq!(after.history[1].step_id, "design");
        assert_eq!(
            after.history[1].action,
            crate::instance::HistoryAction::StepTransition
        );
        // notify_design_team fired exactly once.
        assert_eq!(*calls.lock().unwrap(), vec!["notify_design_team"]);
    }

    #[tokio::test]
    async fn transition_without_permission_is_denied_and_state_unchanged() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;

        let result = engine
            .transition_workflow(
                state.workflow_id,
                "design",
                &Actor::role("salesperson"),
                HashMap::new(),
            )
            .await;

        assert!(matches!(result, Err(EngineError::PermissionDenied { .. })));
        let unchanged = engine.workflow_state(state.workflow_id).await.expect("exists");
        assert_eq!(unchanged, state);
    }

    #[tokio::test]
    async fn transition_to_unreachable_step_is_invalid_and_state_unchanged() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;

        let result = engine
            .transition_workflow(state.workflow_id, "shipped", &Actor::System, HashMap::new())
            .await;

        assert!(matches!(
            result,
            Err(EngineError::InvalidTransition { ref from, ref to })
                if from == "new" && to == "shipped"
        ));
        let unchanged = engine.workflow_state(state.workflow_id).await.expect("exists");
        assert_eq!(unchanged.current_step, "new");
        assert_eq!(unchanged.history.len(), 1);
    }

    #[tokio::test]
    async fn permission_gate_runs_before_edge_check() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;

        // Invalid edge AND missing permission: the denial wins.
        let result = engine
            .transition_workflow(
                state.workflow_id,
                "shipped",
                &Actor::role("salesperson"),
                HashMap::new(),
            )
            .await;

        assert!(matches!(result, Err(EngineError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn transition_unknown_workflow_fails() {
        let (engine, _calls) = engine_with_calls();
        let result = engine
            .transition_workflow(InstanceId::new(), "design", &Actor::System, HashMap::new())
            .await;

        assert!(matches!(result, Err(EngineError::WorkflowNotFound { .. })));
    }

    #[tokio::test]
    async fn transition_merges_metadata() {
        let (engine, _calls) = engine_with_calls();
        let state = engine
            .initialize_workflow(
                "order_fulfillment",
                "order-1",
                "order",
                HashMap::from([("channel".to_string(), json!("web"))]),
            )
            .await
            .expect("initialize");

        let after = engine
            .transition_workflow(
                state.workflow_id,
                "design",
                &Actor::role("admin"),
                HashMap::from([("assigned_designer".to_string(), json!({"id": "dsg-7"}))]),
            )
            .await
            .expect("transition");

        assert_eq!(after.metadata.get("channel"), Some(&json!("web")));
        assert_eq!(
            after.metadata.get("assigned_designer"),
            Some(&json!({"id": "dsg-7"}))
        );
    }

    #[tokio::test]
    async fn history_grows_by_one_per_successful_transition() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;
        let id = state.workflow_id;

        engine
            .transition_workflow(id, "design", &Actor::System, HashMap::new())
            .await
            .expect("to design");
        // A failed attempt must not append history.
        let _ = engine
            .transition_workflow(id, "shipped", &Actor::System, HashMap::new())
            .await
            .expect_err("invalid");
        engine
            .transition_workflow(id, "production", &Actor::System, HashMap::new())
            .await
            .expect("to production");

        let history = engine.workflow_history(id).await.expect("history");
        assert_eq!(history.len(), 3); // initialized + 2 successful transitions
    }

    #[tokio::test]
    async fn racing_transitions_have_exactly_one_winner() {
        let (engine, _calls) = engine_with_calls();
        let engine = Arc::new(engine);
        let state = initialized(&engine).await;
        let id = state.workflow_id;

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .transition_workflow(id, "design", &Actor::System, HashMap::new())
                    .await
            })
        };
        let second = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .transition_workflow(id, "design", &Actor::System, HashMap::new())
                    .await
            })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);

        // The loser was validated against the winner's committed state.
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loser,
            Err(EngineError::InvalidTransition { from, .. }) if from == "design"
        ));

        let final_state = engine.workflow_state(id).await.expect("exists");
        assert_eq!(final_state.current_step, "design");
        assert_eq!(final_state.history.len(), 2);
    }

    #[tokio::test]
    async fn step_requirements_reads_definition() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;

        let requirements = engine
            .step_requirements(state.workflow_id, "production")
            .await
            .expect("step exists");
        assert_eq!(requirements, vec!["payment_confirmation"]);

        let missing = engine
            .step_requirements(state.workflow_id, "refunds")
            .await;
        assert!(matches!(missing, Err(EngineError::UnknownStep { .. })));
    }

    #[tokio::test]
    async fn check_step_requirements_merges_instance_and_caller_context() {
        let (engine, _calls) = engine_with_calls();
        let state = initialized(&engine).await;

        let unmet = engine
            .check_step_requirements(state.workflow_id, "design", HashMap::new())
            .await
            .expect("checkable");
        assert!(!unmet.valid);
        assert_eq!(unmet.missing, vec!["designer_assigned"]);

        let met = engine
            .check_step_requirements(
                state.workflow_id,
                "design",
                HashMap::from([("assigned_designer".to_string(), json!({"id": "dsg-7"}))]),
            )
            .await
            .expect("checkable");
        assert!(met.valid);
    }

    #[tokio::test]
    async fn workflow_state_absent_for_unknown_id() {
        let (engine, _calls) = engine_with_calls();
        assert!(engine.workflow_state(InstanceId::new()).await.is_none());
    }

    #[tokio::test]
    async fn instances_of_type_lists_snapshots() {
        let (engine, _calls) = engine_with_calls();
        initialized(&engine).await;
        initialized(&engine).await;

        assert_eq!(engine.instances_of_type("order_fulfillment").await.len(), 2);
        assert!(engine.instances_of_type("support_ticket").await.is_empty());
    }
}
