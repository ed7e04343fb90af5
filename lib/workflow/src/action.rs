//! Side-effect actions fired on step entry.
//!
//! Actions are registered in a handler table by name, so new actions can
//! be added without modifying the engine core. Execution is best-effort
//! and fire-and-continue: an unregistered name is logged and skipped, a
//! failing handler is logged and the remaining actions still run, and
//! nothing ever rolls back a transition that has already been committed.
//! Handlers may perform blocking I/O (email, downstream writes); the
//! engine invokes the dispatcher only after the instance lock has been
//! released.

use crate::definition::WorkflowStep;
use crate::instance::WorkflowState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Errors from action handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The handler could not complete its side effect.
    Failed { message: String },
    /// A downstream service rejected or dropped the call.
    ExternalService { service: String, message: String },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { message } => write!(f, "action failed: {message}"),
            Self::ExternalService { service, message } => {
                write!(f, "external service error ({service}): {message}")
            }
        }
    }
}

impl std::error::Error for ActionError {}

/// A named side effect executed when an instance enters a step.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Executes the side effect against the committed instance state.
    async fn execute(&self, state: &WorkflowState) -> Result<(), ActionError>;
}

/// Registered handler table for on-enter actions.
#[derive(Default)]
pub struct ActionDispatcher {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    /// Creates a dispatcher with no registered handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under an action name.
    ///
    /// Registering a name twice replaces the previous handler.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    /// Returns true if a handler is registered for the name.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Executes a single named action against an instance.
    ///
    /// Unregistered names and handler failures are logged and swallowed.
    pub async fn execute(&self, name: &str, state: &WorkflowState) {
        let Some(handler) = self.handlers.get(name) else {
            warn!(
                action = name,
                workflow_id = %state.workflow_id,
                "no handler registered for action, skipping"
            );
            return;
        };

        match handler.execute(state).await {
            Ok(()) => {
                debug!(action = name, workflow_id = %state.workflow_id, "action executed");
            }
            Err(error) => {
                warn!(
                    action = name,
                    workflow_id = %state.workflow_id,
                    %error,
                    "action failed, continuing"
                );
            }
        }
    }

    /// Executes a step's on-enter actions in declared order.
    pub async fn execute_on_enter(&self, step: &WorkflowStep, state: &WorkflowState) {
        for name in &step.on_enter {
            self.execute(name, state).await;
        }
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ActionDispatcher")
            .field("handlers", &names)
            .finish()
    }
}
