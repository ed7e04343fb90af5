//! RBAC policy types supplied by external configuration.
//!
//! Mirrors the `SecurityPolicies.rbac.roles[role].permissions` shape of
//! the configuration collaborator. Permission strings are either exact
//! (`workflow:transition`), namespace wildcards (`workflow:*`), or the
//! global wildcard (`*`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Security policies for the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicies {
    /// Role-based access control configuration.
    #[serde(default)]
    pub rbac: RbacConfig,
}

/// Role-based access control configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Permission policies keyed by role name.
    #[serde(default)]
    pub roles: HashMap<String, RolePolicy>,
}

/// The permission set granted to a single role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// Permission strings granted to this role.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RolePolicy {
    /// Creates a policy from a list of permission strings.
    #[must_use]
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

impl SecurityPolicies {
    /// Adds a role policy.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, policy: RolePolicy) -> Self {
        self.rbac.roles.insert(role.into(), policy);
        self
    }

    /// Returns the policy for a role, if one is defined.
    #[must_use]
    pub fn role(&self, role: &str) -> Option<&RolePolicy> {
        self.rbac.roles.get(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_builder() {
        let policies = SecurityPolicies::default()
            .with_role("admin", RolePolicy::new(["*"]))
            .with_role("salesperson", RolePolicy::new(["create_orders", "edit_orders"]));

        assert_eq!(policies.role("admin").unwrap().permissions, vec!["*"]);
        assert!(policies.role("missing").is_none());
    }

    #[test]
    fn policies_deserialize_from_json() {
        let json = r#"{
            "rbac": {
                "roles": {
                    "production_manager": { "permissions": ["workflow:*"] }
                }
            }
        }"#;

        let policies: SecurityPolicies = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            policies.role("production_manager").unwrap().permissions,
            vec!["workflow:*"]
        );
    }
}
