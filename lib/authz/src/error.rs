//! Error types for the authz crate.

use std::fmt;

/// Errors from permission evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The actor's role does not appear in the policy set.
    RoleNotFound { role: String },
    /// The actor's permission set does not grant the requested permission.
    PermissionDenied { actor: String, permission: String },
}

impl fmt::Display for AuthzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleNotFound { role } => {
                write!(f, "role not found in RBAC policies: {role}")
            }
            Self::PermissionDenied { actor, permission } => {
                write!(f, "actor '{actor}' lacks permission '{permission}'")
            }
        }
    }
}

impl std::error::Error for AuthzError {}
