//! PostgreSQL persistence.
//!
//! The repositories speak `sqlx` and return `sqlx::Error`;
//! [`PgExecutionStore`] wraps them behind the engine's store trait.

pub mod execution;
pub mod workflow;

pub use execution::ExecutionRepository;
pub use workflow::WorkflowRepository;

use async_trait::async_trait;
use nodeflow_core::{ExecutionId, Result, WorkflowId};
use nodeflow_workflow::{
    ExecutionError, ExecutionRecord, ExecutionStatus, ExecutionStore, StoreError, Workflow,
};
use sqlx::PgPool;
use tracing::instrument;

/// A decode failure for a value read back from the database.
pub(crate) fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Decode(_) | sqlx::Error::Encode(_) | sqlx::Error::ColumnDecode { .. } => {
            StoreError::Serialization {
                message: e.to_string(),
            }
        }
        other => StoreError::Backend {
            message: other.to_string(),
        },
    }
}

/// [`ExecutionStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgExecutionStore {
    workflows: WorkflowRepository,
    executions: ExecutionRepository,
}

impl PgExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            workflows: WorkflowRepository::new(pool.clone()),
            executions: ExecutionRepository::new(pool),
        }
    }

    /// Explains why a guarded transition matched no running record.
    async fn rejected_transition(&self, id: ExecutionId, to: ExecutionStatus) -> StoreError {
        match self.executions.find_by_id(id).await {
            Ok(Some(record)) => StoreError::Lifecycle(ExecutionError::InvalidTransition {
                from: record.status,
                to,
            }),
            Ok(None) => StoreError::ExecutionNotFound { execution_id: id },
            Err(e) => store_error(e),
        }
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn load_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.find_by_id(id).await.map_err(store_error)?)
    }

    async fn load_active_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        Ok(self.workflows.list_active().await.map_err(store_error)?)
    }

    #[instrument(skip(self), fields(execution_id = %id))]
    async fn create_execution_record(
        &self,
        id: ExecutionId,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
    ) -> Result<(), StoreError> {
        let record = ExecutionRecord::new(id, workflow_id, status);
        Ok(self.executions.create(&record).await.map_err(store_error)?)
    }

    #[instrument(skip(self, data), fields(execution_id = %id))]
    async fn complete_execution_record(
        &self,
        id: ExecutionId,
        data: serde_json::Value,
    ) -> Result<(), StoreError> {
        let updated = self
            .executions
            .complete(id, &data)
            .await
            .map_err(store_error)?;
        if !updated {
            return Err(self
                .rejected_transition(id, ExecutionStatus::Completed)
                .await
                .into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(execution_id = %id))]
    async fn fail_execution_record(
        &self,
        id: ExecutionId,
        message: &str,
    ) -> Result<(), StoreError> {
        let updated = self
            .executions
            .fail(id, message)
            .await
            .map_err(store_error)?;
        if !updated {
            return Err(self
                .rejected_transition(id, ExecutionStatus::Failed)
                .await
                .into());
        }
        Ok(())
    }

    async fn list_executions(
        &self,
        workflow_id: Option<WorkflowId>,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self.executions.list(workflow_id).await.map_err(store_error)?)
    }

    async fn get_execution(
        &self,
        id: ExecutionId,
    ) -> Result<Option<ExecutionRecord>, StoreError> {
        Ok(self.executions.find_by_id(id).await.map_err(store_error)?)
    }

    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.id))]
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        Ok(self.workflows.create(workflow).await.map_err(store_error)?)
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        Ok(self.workflows.list().await.map_err(store_error)?)
    }

    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.id))]
    async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, StoreError> {
        Ok(self.workflows.update(workflow).await.map_err(store_error)?)
    }

    #[instrument(skip(self), fields(workflow_id = %id))]
    async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, StoreError> {
        Ok(self.workflows.delete(id).await.map_err(store_error)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_serialization_errors() {
        let err = store_error(decode_error("bad id".to_string()));
        assert!(matches!(err, StoreError::Serialization { ref message } if message.contains("bad id")));
    }

    #[test]
    fn other_failures_are_backend_errors() {
        let err = store_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Backend { .. }));
    }
}
