//! The process-wide set of active workflows.
//!
//! The index mirrors the store's `is_active` flag so callers can list what
//! is switched on without a round trip. It is informational only: runs are
//! never gated on it.

use crate::definition::{Workflow, WorkflowSummary};
use crate::error::StoreError;
use crate::store::ExecutionStore;
use nodeflow_core::{Result, WorkflowId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Active workflows keyed by id.
///
/// Share it behind an `Arc`; reads proceed concurrently and every write
/// takes the lock exclusively.
#[derive(Debug, Default)]
pub struct ActiveWorkflowIndex {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl ActiveWorkflowIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index contents with the store's active workflows.
    ///
    /// Returns how many workflows are active.
    pub async fn load(&self, store: &dyn ExecutionStore) -> Result<usize, StoreError> {
        let active = store.load_active_workflows().await?;
        let count = active.len();

        let mut workflows = self.workflows.write().await;
        *workflows = active.into_iter().map(|w| (w.id, w)).collect();
        info!(count, "loaded active workflows");
        Ok(count)
    }

    /// Brings the entry for `workflow` in line with its active flag.
    pub async fn sync(&self, workflow: &Workflow) {
        let mut workflows = self.workflows.write().await;
        if workflow.is_active {
            debug!(workflow_id = %workflow.id, "workflow activated");
            workflows.insert(workflow.id, workflow.clone());
        } else if workflows.remove(&workflow.id).is_some() {
            debug!(workflow_id = %workflow.id, "workflow deactivated");
        }
    }

    /// Drops `id` from the index. Returns true if it was present.
    pub async fn remove(&self, id: WorkflowId) -> bool {
        self.workflows.write().await.remove(&id).is_some()
    }

    pub async fn contains(&self, id: WorkflowId) -> bool {
        self.workflows.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }

    /// Lists the active workflows in creation order.
    pub async fn summaries(&self) -> Vec<WorkflowSummary> {
        let workflows = self.workflows.read().await;
        let mut summaries: Vec<_> = workflows.values().map(Workflow::summary).collect();
        // ULIDs sort by creation time.
        summaries.sort_by_key(|s| s.id);
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryExecutionStore;
    use std::sync::Arc;
    use ulid::Ulid;

    #[tokio::test]
    async fn load_picks_only_active_workflows() {
        let on = Workflow::new("on").with_active(true);
        let off = Workflow::new("off");
        let store = InMemoryExecutionStore::with_workflows([on.clone(), off.clone()]);

        let index = ActiveWorkflowIndex::new();
        assert_eq!(index.load(&store).await.expect("load"), 1);
        assert!(index.contains(on.id).await);
        assert!(!index.contains(off.id).await);
    }

    #[tokio::test]
    async fn sync_follows_the_flag() {
        let index = ActiveWorkflowIndex::new();
        let mut workflow = Workflow::new("toggle").with_active(true);

        index.sync(&workflow).await;
        assert_eq!(index.len().await, 1);

        workflow.is_active = false;
        index.sync(&workflow).await;
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let index = ActiveWorkflowIndex::new();
        let workflow = Workflow::new("gone").with_active(true);
        index.sync(&workflow).await;

        assert!(index.remove(workflow.id).await);
        assert!(!index.remove(workflow.id).await);
    }

    #[tokio::test]
    async fn summaries_are_in_creation_order() {
        let index = ActiveWorkflowIndex::new();
        let first = Workflow {
            id: WorkflowId::from_ulid(Ulid::from_parts(1, 0)),
            ..Workflow::new("first").with_active(true)
        };
        let second = Workflow {
            id: WorkflowId::from_ulid(Ulid::from_parts(2, 0)),
            ..Workflow::new("second").with_active(true)
        };
        index.sync(&second).await;
        index.sync(&first).await;

        let names: Vec<_> = index.summaries().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[tokio::test]
    async fn concurrent_updates_are_all_applied() {
        let index = Arc::new(ActiveWorkflowIndex::new());
        let workflows: Vec<_> = (0..20)
            .map(|i| Workflow::new(format!("w{i}")).with_active(true))
            .collect();

        let handles: Vec<_> = workflows
            .iter()
            .cloned()
            .map(|w| {
                let index = Arc::clone(&index);
                tokio::spawn(async move { index.sync(&w).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(index.len().await, workflows.len());
    }
}
