//! Execution coordinator.
//!
//! Runs one workflow end to end:
//! 1. Load the workflow (a missing workflow fails before any record exists)
//! 2. Create a `running` execution record
//! 3. Seed the context from the trigger payload
//! 4. Plan the node order
//! 5. Execute each planned node, publishing an event after each one
//! 6. Complete the record with the final context
//! 7. Return the result
//!
//! Nodes run one after another. Separate runs share nothing but the store,
//! the sink and the executor, so they may proceed concurrently.

use crate::context::ExecutionContext;
use crate::definition::Workflow;
use crate::error::{RunError, StoreError};
use crate::event::{EventSink, NodeExecuted};
use crate::execution::{ExecutionResult, ExecutionStatus};
use crate::executor::NodeExecutor;
use crate::planner;
use crate::store::ExecutionStore;
use nodeflow_core::{ExecutionId, Result, WorkflowId};
use rootcause::Report;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, debug, info, instrument, warn};

/// Message stored on a record whose run was cancelled.
pub const CANCELLED_MESSAGE: &str = "execution cancelled";

/// A shared flag that asks a run to stop before its next node.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives workflow runs against a store, an event sink and an executor.
#[derive(Clone)]
pub struct ExecutionCoordinator {
    store: Arc<dyn ExecutionStore>,
    events: Arc<dyn EventSink>,
    executor: Arc<dyn NodeExecutor>,
}

impl ExecutionCoordinator {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        events: Arc<dyn EventSink>,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        Self {
            store,
            events,
            executor,
        }
    }

    /// Runs `workflow_id` with `payload` as the initial context.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::WorkflowNotFound`] if the workflow does not
    /// exist and [`RunError::Store`] if a store write fails. When the
    /// failing write comes after the record was created, the record is
    /// marked failed first.
    #[instrument(skip(self, payload), fields(workflow_id = %workflow_id))]
    pub async fn run(
        &self,
        workflow_id: WorkflowId,
        payload: JsonValue,
    ) -> Result<ExecutionResult, RunError> {
        self.execute(workflow_id, payload, None).await
    }

    /// Like [`run`](Self::run), but stops before the next node once
    /// `cancel` is set.
    ///
    /// # Errors
    ///
    /// In addition to the errors of `run`, returns [`RunError::Cancelled`]
    /// after marking the record failed with [`CANCELLED_MESSAGE`].
    #[instrument(skip(self, payload, cancel), fields(workflow_id = %workflow_id))]
    pub async fn run_with_cancel(
        &self,
        workflow_id: WorkflowId,
        payload: JsonValue,
        cancel: &CancelFlag,
    ) -> Result<ExecutionResult, RunError> {
        self.execute(workflow_id, payload, Some(cancel)).await
    }

    async fn execute(
        &self,
        workflow_id: WorkflowId,
        payload: JsonValue,
        cancel: Option<&CancelFlag>,
    ) -> Result<ExecutionResult, RunError> {
        let workflow = self
            .store
            .load_workflow(workflow_id)
            .await
            .map_err(|report| store_failure(workflow_id, report))?
            .ok_or(RunError::WorkflowNotFound { workflow_id })?;

        let execution_id = ExecutionId::new();
        self.store
            .create_execution_record(execution_id, workflow_id, ExecutionStatus::Running)
            .await
            .map_err(|report| store_failure(workflow_id, report))?;
        info!(%execution_id, workflow = %workflow.name, "execution started");

        let context = ExecutionContext::from_payload(payload);
        let Some(context) = self.drive(&workflow, execution_id, context, cancel) else {
            info!(%execution_id, "execution cancelled");
            self.mark_failed(execution_id, CANCELLED_MESSAGE).await;
            return Err(RunError::Cancelled { execution_id }.into());
        };

        let data = context.into_value();
        if let Err(report) = self
            .store
            .complete_execution_record(execution_id, data.clone())
            .await
        {
            let report = store_failure(workflow_id, report);
            self.mark_failed(execution_id, &report.current_context().to_string())
                .await;
            return Err(report);
        }
        info!(%execution_id, "execution completed");

        Ok(ExecutionResult {
            execution_id,
            workflow_id,
            status: ExecutionStatus::Completed,
            data,
        })
    }

    /// Executes the planned nodes in order. Returns `None` if cancelled.
    fn drive(
        &self,
        workflow: &Workflow,
        execution_id: ExecutionId,
        mut context: ExecutionContext,
        cancel: Option<&CancelFlag>,
    ) -> Option<ExecutionContext> {
        let graph = &workflow.graph;
        let plan = planner::plan(graph);

        if tracing::enabled!(Level::DEBUG) {
            if graph.is_cyclic() {
                debug!(%execution_id, "workflow graph contains a cycle");
            }
            for node in plan.unscheduled(graph) {
                debug!(%execution_id, node_id = %node.id, "node not reachable from any trigger");
            }
        }

        for node_id in &plan {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                return None;
            }
            let Some(node) = graph.node_by_id(node_id) else {
                continue;
            };

            context = self.executor.execute(node, &context);
            debug!(%execution_id, node_id = %node.id, kind = %node.kind, "node executed");

            self.events.publish(NodeExecuted {
                execution_id,
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                data: context.to_value(),
            });
        }

        Some(context)
    }

    /// Best-effort transition to `failed`; a failure here is only logged.
    async fn mark_failed(&self, execution_id: ExecutionId, message: &str) {
        if let Err(report) = self.store.fail_execution_record(execution_id, message).await {
            warn!(
                %execution_id,
                error = %report.current_context(),
                "could not mark execution as failed"
            );
        }
    }
}

/// Layers a run error over a store report, keeping the store cause.
fn store_failure(workflow_id: WorkflowId, report: Report<StoreError>) -> Report<RunError> {
    let source = report.current_context().clone();
    report.context(RunError::Store {
        workflow_id,
        source,
    })
}
