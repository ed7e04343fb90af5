//! Registry of named workflow definitions.
//!
//! Definitions are validated on registration and read-only for the
//! process lifetime. Reloading means re-running the configuration loader
//! and constructing a fresh registry.

use crate::definition::WorkflowDefinition;
use crate::error::DefinitionError;
use std::collections::HashMap;

/// Validated workflow definitions keyed by workflow type.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, WorkflowDefinition>,
}

impl DefinitionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a definition.
    ///
    /// A definition registered under a type it already holds replaces the
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition fails validation.
    pub fn register(&mut self, definition: WorkflowDefinition) -> Result<(), DefinitionError> {
        definition.validate()?;
        self.definitions
            .insert(definition.workflow_type.clone(), definition);
        Ok(())
    }

    /// Returns the definition for a workflow type.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::NotFound` for an unknown type.
    pub fn definition(&self, workflow_type: &str) -> Result<&WorkflowDefinition, DefinitionError> {
        self.definitions
            .get(workflow_type)
            .ok_or_else(|| DefinitionError::NotFound {
                workflow_type: workflow_type.to_string(),
            })
    }

    /// Returns true if a definition is registered for the type.
    #[must_use]
    pub fn contains(&self, workflow_type: &str) -> bool {
        self.definitions.contains_key(workflow_type)
    }

    /// Returns the registered workflow types.
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
