//! Actor types for workflow attribution and permission gating.
//!
//! Two related concepts:
//! - [`Actor`]: who is driving a concrete transition, either the platform
//!   itself or a caller identified by an RBAC role name.
//! - [`StepActor`]: which kind of party a workflow step is assigned to
//!   in its definition (customer, internal staff, or the system).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity driving a workflow transition.
///
/// Serialized as a plain string: `"system"` for the platform, the role
/// name for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Actor {
    /// The platform itself (initialization, timeout supervision).
    System,
    /// A caller identified by their RBAC role name.
    Role(String),
}

impl Actor {
    /// Creates a role actor.
    #[must_use]
    pub fn role(name: impl Into<String>) -> Self {
        Self::Role(name.into())
    }

    /// Returns the string form of this actor.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::Role(role) => role,
        }
    }

    /// Returns true if this actor is the platform itself.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl From<String> for Actor {
    fn from(value: String) -> Self {
        if value == "system" {
            Self::System
        } else {
            Self::Role(value)
        }
    }
}

impl From<&str> for Actor {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.as_str().to_string()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of party a workflow step is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepActor {
    /// The customer the business entity belongs to.
    Customer,
    /// Staff operating the platform.
    InternalStaff,
    /// The platform itself (automated steps).
    System,
}

impl StepActor {
    /// Returns the configuration name of this step actor.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::InternalStaff => "internal_staff",
            Self::System => "system",
        }
    }
}

impl fmt::Display for StepActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
