//! Persistence seam for workflows and execution records.
//!
//! The coordinator and the CRUD service only talk to storage through
//! [`ExecutionStore`]. [`InMemoryExecutionStore`] keeps everything in
//! process and is what the tests and embedded uses run against; the
//! server provides a PostgreSQL implementation.

use crate::definition::Workflow;
use crate::error::{ExecutionError, StoreError};
use crate::execution::{ExecutionRecord, ExecutionStatus};
use async_trait::async_trait;
use nodeflow_core::{ExecutionId, Result, WorkflowId};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::instrument;

/// Storage for workflows and their execution records.
///
/// Writes to one record are awaited in order by their caller; an
/// implementation must not reorder them.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Loads a workflow, returning `None` if it does not exist.
    async fn load_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError>;

    /// Loads every workflow whose active flag is set.
    async fn load_active_workflows(&self) -> Result<Vec<Workflow>, StoreError>;

    /// Creates a new execution record with no data.
    async fn create_execution_record(
        &self,
        id: ExecutionId,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
    ) -> Result<(), StoreError>;

    /// Moves a running record to `completed` with its final data.
    async fn complete_execution_record(
        &self,
        id: ExecutionId,
        data: JsonValue,
    ) -> Result<(), StoreError>;

    /// Moves a running record to `failed` with an error message.
    async fn fail_execution_record(&self, id: ExecutionId, message: &str)
    -> Result<(), StoreError>;

    /// Lists execution records, newest first, optionally for one workflow.
    async fn list_executions(
        &self,
        workflow_id: Option<WorkflowId>,
    ) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Fetches one execution record.
    async fn get_execution(&self, id: ExecutionId)
    -> Result<Option<ExecutionRecord>, StoreError>;

    /// Stores a new workflow.
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Lists every workflow, newest first.
    async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError>;

    /// Overwrites a stored workflow. Returns false if it does not exist.
    async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, StoreError>;

    /// Deletes a workflow. Returns false if it did not exist.
    ///
    /// Execution records of the workflow are kept.
    async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, StoreError>;
}

/// An [`ExecutionStore`] held entirely in memory.
///
/// Insertion order stands in for timestamps when listing newest first, so
/// records created within the same clock tick still list deterministically.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    workflows: RwLock<Vec<Workflow>>,
    executions: RwLock<Vec<ExecutionRecord>>,
}

impl InMemoryExecutionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `workflows`.
    #[must_use]
    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        Self {
            workflows: RwLock::new(workflows.into_iter().collect()),
            executions: RwLock::default(),
        }
    }

    /// Returns the number of execution records.
    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    async fn transition(
        &self,
        id: ExecutionId,
        apply: impl FnOnce(&mut ExecutionRecord) -> std::result::Result<(), ExecutionError>,
    ) -> Result<(), StoreError> {
        let mut executions = self.executions.write().await;
        let record = executions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::ExecutionNotFound { execution_id: id })?;
        apply(record).map_err(StoreError::from)?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn load_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.iter().find(|w| w.id == id).cloned())
    }

    async fn load_active_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.iter().filter(|w| w.is_active).cloned().collect())
    }

    #[instrument(skip(self), fields(execution_id = %id))]
    async fn create_execution_record(
        &self,
        id: ExecutionId,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
    ) -> Result<(), StoreError> {
        let record = ExecutionRecord::new(id, workflow_id, status);
        self.executions.write().await.push(record);
        Ok(())
    }

    #[instrument(skip(self, data), fields(execution_id = %id))]
    async fn complete_execution_record(
        &self,
        id: ExecutionId,
        data: JsonValue,
    ) -> Result<(), StoreError> {
        self.transition(id, |record| record.complete(data)).await
    }

    #[instrument(skip(self), fields(execution_id = %id))]
    async fn fail_execution_record(
        &self,
        id: ExecutionId,
        message: &str,
    ) -> Result<(), StoreError> {
        self.transition(id, |record| record.fail(message)).await
    }

    async fn list_executions(
        &self,
        workflow_id: Option<WorkflowId>,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        let executions = self.executions.read().await;
        Ok(executions
            .iter()
            .rev()
            .filter(|r| workflow_id.is_none_or(|id| r.workflow_id == id))
            .cloned()
            .collect())
    }

    async fn get_execution(
        &self,
        id: ExecutionId,
    ) -> Result<Option<ExecutionRecord>, StoreError> {
        let executions = self.executions.read().await;
        Ok(executions.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.workflows.write().await.push(workflow.clone());
        Ok(())
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.iter().rev().cloned().collect())
    }

    async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, StoreError> {
        let mut workflows = self.workflows.write().await;
        match workflows.iter_mut().find(|w| w.id == workflow.id) {
            Some(stored) => {
                *stored = workflow.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, StoreError> {
        let mut workflows = self.workflows.write().await;
        let before = workflows.len();
        workflows.retain(|w| w.id != id);
        Ok(workflows.len() != before)
    }
}
