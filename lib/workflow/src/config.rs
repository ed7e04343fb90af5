//! Engine configuration loading.
//!
//! Workflow definitions and security policies come from an external
//! configuration collaborator. This module provides the strongly-typed
//! shapes and a loader over the `config` crate: a file source (TOML,
//! YAML, or JSON by extension) with `CASEFLOW_`-prefixed,
//! `__`-separated environment overrides.

use crate::definition::{WorkflowDefinition, WorkflowStep};
use crate::error::DefinitionError;
use crate::registry::DefinitionRegistry;
use caseflow_authz::SecurityPolicies;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Named workflow definitions as supplied by configuration.
///
/// Keys are workflow types; values are the ordered step lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowRoutesConfig {
    /// Step lists keyed by workflow type.
    #[serde(default)]
    pub definitions: HashMap<String, Vec<WorkflowStep>>,
}

impl WorkflowRoutesConfig {
    /// Builds a validated definition registry from this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure among the definitions.
    pub fn into_registry(self) -> Result<DefinitionRegistry, DefinitionError> {
        let mut registry = DefinitionRegistry::new();
        for (workflow_type, steps) in self.definitions {
            registry.register(WorkflowDefinition::new(workflow_type, steps))?;
        }
        Ok(registry)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Named workflow definitions.
    #[serde(default)]
    pub workflows: WorkflowRoutesConfig,
    /// RBAC security policies.
    #[serde(default)]
    pub security: SecurityPolicies,
}

impl EngineConfig {
    /// Loads configuration from a file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the contents do not
    /// deserialize into the expected shape.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CASEFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from environment variables alone.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CASEFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
