//! Permission evaluation against the configured RBAC policies.

use crate::error::AuthzError;
use crate::policy::SecurityPolicies;
use caseflow_core::Actor;
use rootcause::prelude::Report;
use tracing::debug;

/// The permission gating workflow transitions.
pub const TRANSITION_PERMISSION: &str = "workflow:transition";

/// Decides whether an actor is allowed to perform an action.
///
/// The system actor always passes; any other actor resolves through the
/// role table. An unknown role holds no permissions.
#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator {
    policies: SecurityPolicies,
}

impl PermissionEvaluator {
    /// Creates an evaluator over the given policies.
    #[must_use]
    pub fn new(policies: SecurityPolicies) -> Self {
        Self { policies }
    }

    /// Returns the permission set for a role, if the role is defined.
    #[must_use]
    pub fn permissions_for(&self, role: &str) -> Option<&[String]> {
        self.policies
            .role(role)
            .map(|policy| policy.permissions.as_slice())
    }

    /// Checks whether an actor holds a permission.
    #[must_use]
    pub fn has_permission(&self, actor: &Actor, permission: &str) -> bool {
        let allowed = match actor {
            Actor::System => true,
            Actor::Role(role) => self
                .permissions_for(role)
                .is_some_and(|granted| granted.iter().any(|g| permission_matches(g, permission))),
        };

        debug!(actor = %actor, permission, allowed, "permission check");
        allowed
    }

    /// Checks the transition permission and returns an error if denied.
    pub fn require_transition(&self, actor: &Actor) -> Result<(), Report<AuthzError>> {
        if self.has_permission(actor, TRANSITION_PERMISSION) {
            return Ok(());
        }
        Err(AuthzError::PermissionDenied {
            actor: actor.to_string(),
            permission: TRANSITION_PERMISSION.to_string(),
        }
        .into())
    }
}

/// Matches a granted permission string against a requested permission.
///
/// `*` grants everything; `prefix:*` grants the whole namespace; anything
/// else must match exactly.
fn permission_matches(granted: &str, requested: &str) -> bool {
    if granted == "*" || granted == requested {
        return true;
    }
    granted
        .strip_suffix(":*")
        .is_some_and(|prefix| requested.strip_prefix(prefix).is_some_and(|rest| rest.starts_with(':')))
}
