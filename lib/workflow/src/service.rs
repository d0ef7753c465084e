//! Workflow CRUD and run entry point.
//!
//! Every write goes through here so the graph is validated before it is
//! stored and the active-workflow index stays in step with the store.
//! A store write and the index change that follows it happen under one
//! lock, so index changes land in the same order as the store writes.

use crate::active::ActiveWorkflowIndex;
use crate::coordinator::ExecutionCoordinator;
use crate::definition::{NewWorkflow, Workflow, WorkflowSummary, WorkflowUpdate};
use crate::error::{RunError, ServiceError, StoreError};
use crate::execution::{ExecutionRecord, ExecutionResult};
use crate::store::ExecutionStore;
use nodeflow_core::{ExecutionId, Result, WorkflowId};
use rootcause::Report;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// The operations behind the HTTP API.
#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn ExecutionStore>,
    index: Arc<ActiveWorkflowIndex>,
    coordinator: ExecutionCoordinator,
    writes: Arc<Mutex<()>>,
}

fn from_store(report: Report<StoreError>) -> Report<ServiceError> {
    let context = ServiceError::Store(report.current_context().clone());
    report.context(context)
}

fn from_run(report: Report<RunError>) -> Report<ServiceError> {
    let context = ServiceError::from(report.current_context().clone());
    report.context(context)
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        index: Arc<ActiveWorkflowIndex>,
        coordinator: ExecutionCoordinator,
    ) -> Self {
        Self {
            store,
            index,
            coordinator,
            writes: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn index(&self) -> &Arc<ActiveWorkflowIndex> {
        &self.index
    }

    /// Lists every workflow, newest first.
    pub async fn list_workflows(&self) -> Result<Vec<Workflow>, ServiceError> {
        self.store.list_workflows().await.map_err(from_store)
    }

    /// Fetches one workflow.
    pub async fn get_workflow(&self, id: WorkflowId) -> Result<Workflow, ServiceError> {
        let workflow = self.store.load_workflow(id).await.map_err(from_store)?;
        Ok(workflow.ok_or(ServiceError::WorkflowNotFound { workflow_id: id })?)
    }

    /// Validates and stores a new, inactive workflow.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_workflow(&self, new: NewWorkflow) -> Result<Workflow, ServiceError> {
        new.graph.validate().map_err(ServiceError::from)?;

        let workflow = Workflow::create(new);
        let _writes = self.writes.lock().await;
        self.store
            .insert_workflow(&workflow)
            .await
            .map_err(from_store)?;
        self.index.sync(&workflow).await;

        info!(workflow_id = %workflow.id, "workflow created");
        Ok(workflow)
    }

    /// Replaces a workflow's editable fields.
    #[instrument(skip(self, update), fields(workflow_id = %id))]
    pub async fn update_workflow(
        &self,
        id: WorkflowId,
        update: WorkflowUpdate,
    ) -> Result<Workflow, ServiceError> {
        update.graph.validate().map_err(ServiceError::from)?;

        let _writes = self.writes.lock().await;
        let mut workflow = self.get_workflow(id).await?;
        workflow.apply(update);
        let updated = self
            .store
            .update_workflow(&workflow)
            .await
            .map_err(from_store)?;
        if !updated {
            return Err(ServiceError::WorkflowNotFound { workflow_id: id }.into());
        }
        self.index.sync(&workflow).await;

        info!(is_active = workflow.is_active, "workflow updated");
        Ok(workflow)
    }

    /// Deletes a workflow. Returns false if there was nothing to delete.
    #[instrument(skip(self), fields(workflow_id = %id))]
    pub async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, ServiceError> {
        let _writes = self.writes.lock().await;
        let deleted = self.store.delete_workflow(id).await.map_err(from_store)?;
        self.index.remove(id).await;
        if deleted {
            info!("workflow deleted");
        }
        Ok(deleted)
    }

    /// Runs a workflow with `payload` as its trigger data.
    ///
    /// The active flag is not consulted: inactive workflows run too.
    pub async fn run_workflow(
        &self,
        id: WorkflowId,
        payload: JsonValue,
    ) -> Result<ExecutionResult, ServiceError> {
        self.coordinator.run(id, payload).await.map_err(from_run)
    }

    /// Lists execution records, newest first.
    pub async fn list_executions(
        &self,
        workflow_id: Option<WorkflowId>,
    ) -> Result<Vec<ExecutionRecord>, ServiceError> {
        self.store
            .list_executions(workflow_id)
            .await
            .map_err(from_store)
    }

    /// Fetches one execution record.
    pub async fn get_execution(&self, id: ExecutionId) -> Result<ExecutionRecord, ServiceError> {
        let record = self.store.get_execution(id).await.map_err(from_store)?;
        Ok(record.ok_or(ServiceError::ExecutionNotFound { execution_id: id })?)
    }

    /// Lists the workflows currently in the active index.
    pub async fn active_workflows(&self) -> Vec<WorkflowSummary> {
        self.index.summaries().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::error::GraphError;
    use crate::event::RecordingEventSink;
    use crate::execution::ExecutionStatus;
    use crate::executor::SimulatedExecutor;
    use crate::graph::WorkflowGraph;
    use crate::node::{Node, NodeKind};
    use crate::store::InMemoryExecutionStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn service() -> WorkflowService {
        service_with(Arc::new(InMemoryExecutionStore::new()))
    }

    fn service_with(store: Arc<dyn ExecutionStore>) -> WorkflowService {
        let coordinator = ExecutionCoordinator::new(
            Arc::clone(&store),
            Arc::new(RecordingEventSink::new()),
            Arc::new(SimulatedExecutor::new()),
        );
        WorkflowService::new(store, Arc::new(ActiveWorkflowIndex::new()), coordinator)
    }

    fn graph() -> WorkflowGraph {
        WorkflowGraph::from_parts(
            vec![
                Node::new("t", NodeKind::Trigger, "Start"),
                Node::new("a", NodeKind::Action, "Act"),
            ],
            vec![Connection::new("t", "a")],
        )
    }

    fn new_workflow(name: &str) -> NewWorkflow {
        NewWorkflow {
            name: name.to_string(),
            description: None,
            graph: graph(),
        }
    }

    fn activate(workflow: &Workflow) -> WorkflowUpdate {
        WorkflowUpdate {
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            graph: workflow.graph.clone(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let service = service();
        let created = service.create_workflow(new_workflow("one")).await.expect("create");

        assert!(!created.is_active);
        let fetched = service.get_workflow(created.id).await.expect("get");
        assert_eq!(fetched, created);
        assert!(service.active_workflows().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_graph_is_rejected_before_storage() {
        let service = service();
        let mut bad = new_workflow("bad");
        bad.graph.add_connection(Connection::new("a", "ghost"));

        let err = service.create_workflow(bad).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            ServiceError::InvalidGraph(GraphError::DanglingConnection { .. })
        ));
        assert!(service.list_workflows().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn update_keeps_index_in_step() {
        let service = service();
        let created = service.create_workflow(new_workflow("toggle")).await.expect("create");

        let active = service
            .update_workflow(created.id, activate(&created))
            .await
            .expect("activate");
        assert!(active.is_active);
        assert!(service.index().contains(created.id).await);

        let mut off = activate(&active);
        off.is_active = false;
        service.update_workflow(created.id, off).await.expect("deactivate");
        assert!(!service.index().contains(created.id).await);
    }

    #[tokio::test]
    async fn update_of_missing_workflow_is_not_found() {
        let service = service();
        let missing = WorkflowId::new();
        let err = service
            .update_workflow(missing, activate(&Workflow::new("x")))
            .await
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &ServiceError::WorkflowNotFound {
                workflow_id: missing
            }
        );
    }

    #[tokio::test]
    async fn delete_removes_from_index() {
        let service = service();
        let created = service.create_workflow(new_workflow("gone")).await.expect("create");
        service
            .update_workflow(created.id, activate(&created))
            .await
            .expect("activate");

        assert!(service.delete_workflow(created.id).await.expect("delete"));
        assert!(!service.index().contains(created.id).await);
        assert!(!service.delete_workflow(created.id).await.expect("delete"));
    }

    #[tokio::test]
    async fn inactive_workflows_still_run() {
        let service = service();
        let created = service.create_workflow(new_workflow("idle")).await.expect("create");

        let result = service
            .run_workflow(created.id, json!({ "k": "v" }))
            .await
            .expect("run");
        assert_eq!(result.data["processed"], json!(true));

        let executions = service.list_executions(Some(created.id)).await.expect("list");
        assert_eq!(executions.len(), 1);
        let record = service.get_execution(result.execution_id).await.expect("get");
        assert_eq!(record.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn running_missing_workflow_is_not_found() {
        let service = service();
        let missing = WorkflowId::new();
        let err = service.run_workflow(missing, json!({})).await.unwrap_err();
        assert_eq!(
            err.current_context(),
            &ServiceError::WorkflowNotFound {
                workflow_id: missing
            }
        );
        assert!(service.list_executions(None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_execution_is_not_found() {
        let service = service();
        let id = ExecutionId::new();
        let err = service.get_execution(id).await.unwrap_err();
        assert_eq!(
            err.current_context(),
            &ServiceError::ExecutionNotFound { execution_id: id }
        );
    }

    #[tokio::test]
    async fn unrecognized_node_type_survives_a_save() {
        let service = service();
        let new: NewWorkflow = serde_json::from_value(json!({
            "name": "newer editor",
            "nodes": [
                { "id": "t", "type": "trigger", "name": "Start" },
                { "id": "w", "type": "webhook", "name": "Hook" }
            ],
            "connections": [{ "source": "t", "target": "w" }]
        }))
        .expect("deserialize");

        let created = service.create_workflow(new).await.expect("create");
        let loaded = service.get_workflow(created.id).await.expect("get");
        let value = serde_json::to_value(&loaded).expect("serialize");
        assert_eq!(value["nodes"][1]["type"], "webhook");

        let result = service.run_workflow(created.id, json!({})).await.expect("run");
        assert_eq!(result.data["unknown"], json!(true));
    }

    /// In-memory store that can hold one workflow update open after it has
    /// been written.
    #[derive(Default)]
    struct PausingStore {
        inner: InMemoryExecutionStore,
        pause: AtomicBool,
        written: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ExecutionStore for PausingStore {
        async fn load_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
            self.inner.load_workflow(id).await
        }

        async fn load_active_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
            self.inner.load_active_workflows().await
        }

        async fn create_execution_record(
            &self,
            id: ExecutionId,
            workflow_id: WorkflowId,
            status: ExecutionStatus,
        ) -> Result<(), StoreError> {
            self.inner.create_execution_record(id, workflow_id, status).await
        }

        async fn complete_execution_record(
            &self,
            id: ExecutionId,
            data: JsonValue,
        ) -> Result<(), StoreError> {
            self.inner.complete_execution_record(id, data).await
        }

        async fn fail_execution_record(
            &self,
            id: ExecutionId,
            message: &str,
        ) -> Result<(), StoreError> {
            self.inner.fail_execution_record(id, message).await
        }

        async fn list_executions(
            &self,
            workflow_id: Option<WorkflowId>,
        ) -> Result<Vec<ExecutionRecord>, StoreError> {
            self.inner.list_executions(workflow_id).await
        }

        async fn get_execution(
            &self,
            id: ExecutionId,
        ) -> Result<Option<ExecutionRecord>, StoreError> {
            self.inner.get_execution(id).await
        }

        async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
            self.inner.insert_workflow(workflow).await
        }

        async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
            self.inner.list_workflows().await
        }

        async fn update_workflow(&self, workflow: &Workflow) -> Result<bool, StoreError> {
            let updated = self.inner.update_workflow(workflow).await?;
            if self.pause.swap(false, Ordering::SeqCst) {
                self.written.notify_one();
                self.release.notified().await;
            }
            Ok(updated)
        }

        async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, StoreError> {
            self.inner.delete_workflow(id).await
        }
    }

    #[tokio::test]
    async fn delete_during_update_leaves_index_clean() {
        let store = Arc::new(PausingStore::default());
        let service = service_with(store.clone());
        let created = service.create_workflow(new_workflow("racy")).await.expect("create");

        store.pause.store(true, Ordering::SeqCst);
        let update = tokio::spawn({
            let service = service.clone();
            let activation = activate(&created);
            async move { service.update_workflow(created.id, activation).await }
        });
        store.written.notified().await;

        let delete = tokio::spawn({
            let service = service.clone();
            async move { service.delete_workflow(created.id).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!delete.is_finished());

        store.release.notify_one();
        update.await.expect("join").expect("update");
        assert!(delete.await.expect("join").expect("delete"));

        assert!(!service.index().contains(created.id).await);
        assert!(service.active_workflows().await.is_empty());
        assert!(service.list_workflows().await.expect("list").is_empty());
    }
}
