//! Strongly-typed identifier for workflow instances.
//!
//! Instance ids use ULID (Universally Unique Lexicographically Sortable
//! Identifier) format, providing both uniqueness under concurrent creation
//! and temporal ordering. Entities the workflows are attached to (orders,
//! tickets, production jobs) are identified by caller-supplied strings and
//! do not get a typed id here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an [`InstanceId`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInstanceIdError {
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseInstanceIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse instance id: {}", self.reason)
    }
}

impl std::error::Error for ParseInstanceIdError {}

/// Unique identifier for a running workflow instance.
///
/// Generated once at `initialize_workflow` time and immutable for the
/// lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Ulid);

impl InstanceId {
    /// Display prefix for instance ids.
    pub const PREFIX: &'static str = "wfi";

    /// Creates a new id with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates an id from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for InstanceId {
    type Err = ParseInstanceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both the prefixed display form and a raw ULID.
        let ulid_str = s.strip_prefix("wfi_").unwrap_or(s);

        Ulid::from_str(ulid_str)
            .map(Self)
            .map_err(|e| ParseInstanceIdError {
                reason: e.to_string(),
            })
    }
}

impl From<Ulid> for InstanceId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl From<InstanceId> for Ulid {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}
