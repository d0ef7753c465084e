//! Workflow engine for nodeflow.
//!
//! This crate holds everything needed to run a stored workflow:
//!
//! - **Graph Model**: nodes, connections and id lookups
//! - **Planner**: depth-first execution order from the trigger nodes
//! - **Executor**: the built-in behavior of each node kind
//! - **Coordinator**: runs a workflow, records its lifecycle and publishes
//!   per-node events
//! - **Store and event seams**: traits the coordinator writes through, with
//!   in-memory and broadcast implementations
//! - **Service**: workflow CRUD that keeps the active-workflow index current

pub mod active;
pub mod connection;
pub mod context;
pub mod coordinator;
pub mod definition;
pub mod envelope;
pub mod error;
pub mod event;
pub mod execution;
pub mod executor;
pub mod graph;
pub mod node;
pub mod planner;
pub mod service;
pub mod store;

pub use active::ActiveWorkflowIndex;
pub use connection::{Connection, ConnectionId};
pub use context::ExecutionContext;
pub use coordinator::{CancelFlag, ExecutionCoordinator};
pub use definition::{NewWorkflow, Workflow, WorkflowSummary, WorkflowUpdate};
pub use envelope::Envelope;
pub use error::{ExecutionError, GraphError, RunError, ServiceError, StoreError};
pub use event::{BroadcastEventSink, EventSink, NodeExecuted};
pub use execution::{ExecutionRecord, ExecutionResult, ExecutionStatus};
pub use executor::{NodeExecutor, SimulatedExecutor};
pub use graph::WorkflowGraph;
pub use node::{Node, NodeId, NodeKind, Position};
pub use planner::{ExecutionPlan, plan};
pub use service::WorkflowService;
pub use store::{ExecutionStore, InMemoryExecutionStore};
