//! Core types shared across the nodeflow workspace.
//!
//! This crate provides the strongly-typed identifiers for persisted
//! entities and the `Result` alias used by every other crate.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ExecutionId, ParseIdError, WorkflowId};
