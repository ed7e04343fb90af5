//! Step-entry requirement evaluation.
//!
//! Requirements are named preconditions checked against a context map
//! (instance metadata plus caller-supplied fields). Each name resolves to
//! a registered predicate; an unrecognized name falls back to truthy
//! presence of a context field of the same name.
//!
//! Evaluation is advisory: the engine exposes it to callers but the
//! transition path does not block on unmet requirements. Whether it
//! should is a product decision deliberately left open.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Context a requirement is evaluated against.
pub type RequirementContext = HashMap<String, JsonValue>;

/// A named predicate over the requirement context.
pub type RequirementPredicate = Arc<dyn Fn(&RequirementContext) -> bool + Send + Sync>;

/// Result of evaluating a step's requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementOutcome {
    /// True if every requirement was satisfied.
    pub valid: bool,
    /// The requirement names that were not satisfied.
    pub missing: Vec<String>,
}

impl RequirementOutcome {
    /// An outcome with nothing missing.
    #[must_use]
    pub fn satisfied() -> Self {
        Self {
            valid: true,
            missing: Vec::new(),
        }
    }
}

/// Evaluates named requirements against workflow metadata.
#[derive(Clone)]
pub struct RequirementEvaluator {
    predicates: HashMap<String, RequirementPredicate>,
}

impl RequirementEvaluator {
    /// Creates an evaluator with the built-in predicates registered.
    #[must_use]
    pub fn new() -> Self {
        let mut evaluator = Self {
            predicates: HashMap::new(),
        };
        evaluator.register("payment_confirmation", Arc::new(payment_confirmed));
        evaluator.register("designer_assigned", Arc::new(designer_assigned));
        evaluator
    }

    /// Registers a predicate under a requirement name.
    pub fn register(&mut self, name: impl Into<String>, predicate: RequirementPredicate) {
        self.predicates.insert(name.into(), predicate);
    }

    /// Evaluates a list of requirement names against a context.
    #[must_use]
    pub fn validate(
        &self,
        requirements: &[String],
        context: &RequirementContext,
    ) -> RequirementOutcome {
        let missing: Vec<String> = requirements
            .iter()
            .filter(|name| !self.is_satisfied(name, context))
            .cloned()
            .collect();

        RequirementOutcome {
            valid: missing.is_empty(),
            missing,
        }
    }

    fn is_satisfied(&self, name: &str, context: &RequirementContext) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(context),
            // Unknown requirement: a truthy context field of the same name.
            None => context.get(name).is_some_and(is_truthy),
        }
    }
}

impl Default for RequirementEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequirementEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RequirementEvaluator")
            .field("predicates", &names)
            .finish()
    }
}

/// `payment_status` must be `"confirmed"`.
fn payment_confirmed(context: &RequirementContext) -> bool {
    context
        .get("payment_status")
        .and_then(JsonValue::as_str)
        .is_some_and(|status| status == "confirmed")
}

/// `assigned_designer` must be present and carry a non-empty id.
///
/// Accepts either an object with an `id` field or a bare string id.
fn designer_assigned(context: &RequirementContext) -> bool {
    match context.get("assigned_designer") {
        Some(JsonValue::Object(designer)) => designer
            .get("id")
            .and_then(JsonValue::as_str)
            .is_some_and(|id| !id.is_empty()),
        Some(JsonValue::String(id)) => !id.is_empty(),
        _ => false,
    }
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requirements(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_requirement_list_is_satisfied() {
        let outcome = RequirementEvaluator::new().validate(&[], &HashMap::new());
        assert_eq!(outcome, RequirementOutcome::satisfied());
    }

    #[test]
    fn payment_confirmation_requires_confirmed_status() {
        let evaluator = RequirementEvaluator::new();
        let reqs = requirements(&["payment_confirmation"]);

        let confirmed =
            HashMap::from([("payment_status".to_string(), json!("confirmed"))]);
        assert!(evaluator.validate(&reqs, &confirmed).valid);

        let pending = HashMap::from([("payment_status".to_string(), json!("pending"))]);
        let outcome = evaluator.validate(&reqs, &pending);
        assert!(!outcome.valid);
        assert_eq!(outcome.missing, vec!["payment_confirmation"]);

        assert!(!evaluator.validate(&reqs, &HashMap::new()).valid);
    }

    #[test]
    fn designer_assigned_accepts_object_or_string_id() {
        let evaluator = RequirementEvaluator::new();
        let reqs = requirements(&["designer_assigned"]);

        let object = HashMap::from([(
            "assigned_designer".to_string(),
            json!({"id": "dsg-7", "name": "Sam"}),
        )]);
        assert!(evaluator.validate(&reqs, &object).valid);

        let string = HashMap::from([("assigned_designer".to_string(), json!("dsg-7"))]);
        assert!(evaluator.validate(&reqs, &string).valid);

        let empty_id =
            HashMap::from([("assigned_designer".to_string(), json!({"id": ""}))]);
        assert!(!evaluator.validate(&reqs, &empty_id).valid);
    }

    #[test]
    fn unknown_requirement_falls_back_to_truthy_field() {
        let evaluator = RequirementEvaluator::new();
        let reqs = requirements(&["artwork_approved"]);

        let truthy = HashMap::from([("artwork_approved".to_string(), json!(true))]);
        assert!(evaluator.validate(&reqs, &truthy).valid);

        let falsy = HashMap::from([("artwork_approved".to_string(), json!(false))]);
        assert!(!evaluator.validate(&reqs, &falsy).valid);

        assert!(!evaluator.validate(&reqs, &HashMap::new()).valid);
    }

    #[test]
    fn custom_predicate_overrides_fallback() {
        let mut evaluator = RequirementEvaluator::new();
        evaluator.register(
            "minimum_quantity",
            Arc::new(|context: &RequirementContext| {
                context
                    .get("quantity")
                    .and_then(JsonValue::as_u64)
                    .is_some_and(|quantity| quantity >= 10)
            }),
        );

        let reqs = requirements(&["minimum_quantity"]);
        let enough = HashMap::from([("quantity".to_string(), json!(25))]);
        let short = HashMap::from([("quantity".to_string(), json!(3))]);

        assert!(evaluator.validate(&reqs, &enough).valid);
        assert!(!evaluator.validate(&reqs, &short).valid);
    }

    #[test]
    fn missing_lists_every_unmet_requirement() {
        let evaluator = RequirementEvaluator::new();
        let reqs = requirements(&["payment_confirmation", "designer_assigned"]);

        let outcome = evaluator.validate(&reqs, &HashMap::new());
        assert_eq!(
            outcome.missing,
            vec!["payment_confirmation", "designer_assigned"]
        );
    }
}
