//! Instance storage.
//!
//! The engine talks to storage through the [`InstanceStore`] trait so a
//! database-backed implementation can be substituted without touching
//! engine logic. The in-memory implementation shipped here is the only
//! one provided: all instance state is volatile and lost on process
//! restart. That durability gap is a known limitation of the current
//! design, not something this crate papers over.
//!
//! Each instance is guarded by its own async mutex. The engine performs
//! validation, mutation, and history append under that lock, so a reader
//! never observes a current step that disagrees with the history tail.

use crate::instance::WorkflowState;
use async_trait::async_trait;
use caseflow_core::InstanceId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A live instance together with its per-instance lock.
pub type InstanceHandle = Arc<Mutex<WorkflowState>>;

/// Storage for live workflow instances.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Stores a newly created instance.
    async fn insert(&self, state: WorkflowState);

    /// Returns the lockable handle for an instance.
    async fn handle(&self, workflow_id: InstanceId) -> Option<InstanceHandle>;

    /// Returns a point-in-time copy of an instance.
    async fn snapshot(&self, workflow_id: InstanceId) -> Option<WorkflowState>;

    /// Returns point-in-time copies of every instance of a workflow type.
    async fn snapshots_of_type(&self, workflow_type: &str) -> Vec<WorkflowState>;

    /// Returns the number of live instances.
    async fn count(&self) -> usize;
}

/// In-memory instance store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    instances: RwLock<HashMap<InstanceId, InstanceHandle>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryStore {
    async fn insert(&self, state: WorkflowState) {
        let workflow_id = state.workflow_id;
        let handle = Arc::new(Mutex::new(state));
        self.instances.write().await.insert(workflow_id, handle);
    }

    async fn handle(&self, workflow_id: InstanceId) -> Option<InstanceHandle> {
        self.instances.read().await.get(&workflow_id).cloned()
    }

    async fn snapshot(&self, workflow_id: InstanceId) -> Option<WorkflowState> {
        let handle = self.handle(workflow_id).await?;
        let state = handle.lock().await;
        Some(state.clone())
    }

    async fn snapshots_of_type(&self, workflow_type: &str) -> Vec<WorkflowState> {
        // Collect handles under the map lock, then snapshot each instance
        // under its own lock so a slow instance doesn't block the map.
        let handles: Vec<InstanceHandle> =
            self.instances.read().await.values().cloned().collect();

        let mut snapshots = Vec::new();
        for handle in handles {
            let state = handle.lock().await;
            if state.workflow_type == workflow_type {
                snapshots.push(state.clone());
            }
        }
        snapshots
    }

    async fn count(&self) -> usize {
        self.instances.read().await.len()
    }
}
