//! Error types for the workflow crate.
//!
//! Errors are layered:
//! - `GraphError`: graph checks on the write path (never raised at run time)
//! - `ExecutionError`: execution record lifecycle violations
//! - `StoreError`: persistence failures reported by an [`ExecutionStore`](crate::store::ExecutionStore)
//! - `RunError`: why a single run did not complete
//! - `ServiceError`: outcomes of the CRUD surface

use crate::connection::ConnectionId;
use crate::execution::ExecutionStatus;
use crate::node::NodeId;
use nodeflow_core::{ExecutionId, WorkflowId};
use std::fmt;

/// Structural defects in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two nodes share the same id.
    DuplicateNode { node_id: NodeId },
    /// A connection references a node that is not in the graph.
    DanglingConnection {
        connection_id: ConnectionId,
        node_id: NodeId,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::DanglingConnection {
                connection_id,
                node_id,
            } => write!(
                f,
                "connection {connection_id} references missing node {node_id}"
            ),
        }
    }
}

impl std::error::Error for GraphError {}

/// Violations of the execution record lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The record is not in a state that allows the requested transition.
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid execution transition from {from} to {to}")
            }
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Errors from execution store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage failed.
    Backend { message: String },
    /// A stored value could not be encoded or decoded.
    Serialization { message: String },
    /// The execution record to update does not exist.
    ExecutionNotFound { execution_id: ExecutionId },
    /// The record exists but refused the transition.
    Lifecycle(ExecutionError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { message } => write!(f, "storage backend error: {message}"),
            Self::Serialization { message } => write!(f, "serialization error: {message}"),
            Self::ExecutionNotFound { execution_id } => {
                write!(f, "execution record not found: {execution_id}")
            }
            Self::Lifecycle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<ExecutionError> for StoreError {
    fn from(e: ExecutionError) -> Self {
        Self::Lifecycle(e)
    }
}

/// Reasons a workflow run did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// No workflow with the requested id exists. No record was created.
    WorkflowNotFound { workflow_id: WorkflowId },
    /// Writing the execution record failed.
    Store {
        workflow_id: WorkflowId,
        source: StoreError,
    },
    /// The run was cancelled between two nodes.
    Cancelled { execution_id: ExecutionId },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "workflow not found: {workflow_id}")
            }
            Self::Store {
                workflow_id,
                source,
            } => write!(f, "run of workflow {workflow_id} failed: {source}"),
            Self::Cancelled { execution_id } => write!(f, "execution cancelled: {execution_id}"),
        }
    }
}

impl std::error::Error for RunError {}

/// Errors from the workflow CRUD surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The workflow does not exist.
    WorkflowNotFound { workflow_id: WorkflowId },
    /// The execution record does not exist.
    ExecutionNotFound { execution_id: ExecutionId },
    /// The submitted graph failed validation.
    InvalidGraph(GraphError),
    /// The store failed.
    Store(StoreError),
    /// The run failed after it started.
    Run(RunError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "workflow not found: {workflow_id}")
            }
            Self::ExecutionNotFound { execution_id } => {
                write!(f, "execution not found: {execution_id}")
            }
            Self::InvalidGraph(e) => write!(f, "invalid workflow graph: {e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Run(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<GraphError> for ServiceError {
    fn from(e: GraphError) -> Self {
        Self::InvalidGraph(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<RunError> for ServiceError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::WorkflowNotFound { workflow_id } => Self::WorkflowNotFound { workflow_id },
            other => Self::Run(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let err = GraphError::DanglingConnection {
            connection_id: ConnectionId::new("c1"),
            node_id: NodeId::new("ghost"),
        };
        assert_eq!(err.to_string(), "connection c1 references missing node ghost");
    }

    #[test]
    fn transition_error_display() {
        let err = ExecutionError::InvalidTransition {
            from: ExecutionStatus::Completed,
            to: ExecutionStatus::Failed,
        };
        assert_eq!(
            err.to_string(),
            "invalid execution transition from completed to failed"
        );
    }

    #[test]
    fn run_not_found_maps_to_service_not_found() {
        let workflow_id = WorkflowId::new();
        let err = ServiceError::from(RunError::WorkflowNotFound { workflow_id });
        assert_eq!(err, ServiceError::WorkflowNotFound { workflow_id });
    }

    #[test]
    fn store_failure_stays_a_run_error() {
        let workflow_id = WorkflowId::new();
        let err = ServiceError::from(RunError::Store {
            workflow_id,
            source: StoreError::Backend {
                message: "disk full".to_string(),
            },
        });
        assert!(matches!(err, ServiceError::Run(RunError::Store { .. })));
        assert!(err.to_string().contains("disk full"));
    }
}
