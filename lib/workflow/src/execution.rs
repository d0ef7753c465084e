//! Execution records and their lifecycle.
//!
//! A record is created `running` when a run starts and moves exactly once
//! to a terminal status:
//!
//! ```text
//! running ──► completed   (final data stored)
//!    │
//!    └──────► failed      (error message stored)
//! ```
//!
//! Terminal records are never modified again.

use crate::error::ExecutionError;
use chrono::{DateTime, Utc};
use nodeflow_core::{ExecutionId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Status of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The run is in progress.
    Running,
    /// The run finished and its data is stored.
    Completed,
    /// The run stopped with an error.
    Failed,
}

impl ExecutionStatus {
    /// Returns the stored name of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown execution status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ExecutionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The durable record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique identifier for this run.
    pub id: ExecutionId,
    /// The workflow that was run.
    pub workflow_id: WorkflowId,
    /// Current status.
    pub status: ExecutionStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Why the run failed.
    pub error_message: Option<String>,
    /// Final context of a completed run.
    pub data: Option<JsonValue>,
}

impl ExecutionRecord {
    /// Creates a record in the given initial status, started now.
    #[must_use]
    pub fn new(id: ExecutionId, workflow_id: WorkflowId, status: ExecutionStatus) -> Self {
        Self {
            id,
            workflow_id,
            status,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
            data: None,
        }
    }

    /// Moves a running record to `completed`, storing `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidTransition`] if the record is
    /// already terminal.
    pub fn complete(&mut self, data: JsonValue) -> Result<(), ExecutionError> {
        self.ensure_running(ExecutionStatus::Completed)?;
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.data = Some(data);
        Ok(())
    }

    /// Moves a running record to `failed`, storing `message`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidTransition`] if the record is
    /// already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ExecutionError> {
        self.ensure_running(ExecutionStatus::Failed)?;
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Returns how long the run took, if it has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    fn ensure_running(&self, to: ExecutionStatus) -> Result<(), ExecutionError> {
        if self.status == ExecutionStatus::Running {
            Ok(())
        } else {
            Err(ExecutionError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}

/// What a successful run returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// The execution record id.
    pub execution_id: ExecutionId,
    /// The workflow that was run.
    pub workflow_id: WorkflowId,
    /// Terminal status of the run.
    pub status: ExecutionStatus,
    /// Final context.
    pub data: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running() -> ExecutionRecord {
        ExecutionRecord::new(ExecutionId::new(), WorkflowId::new(), ExecutionStatus::Running)
    }

    #[test]
    fn status_terminal() {
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
    }

    #[test]
    fn status_parses_stored_names() {
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ExecutionStatus>(), Ok(status));
        }
        assert!("queued".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn completes_once() {
        let mut record = running();
        record.complete(json!({ "ok": true })).expect("first completion");

        assert_eq!(record.status, ExecutionStatus::Completed);
        assert!(record.completed_at.is_some());
        assert_eq!(record.data, Some(json!({ "ok": true })));
        assert!(record.duration().is_some());

        let err = record.complete(json!({})).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::InvalidTransition {
                from: ExecutionStatus::Completed,
                to: ExecutionStatus::Completed,
            }
        );
        assert_eq!(record.data, Some(json!({ "ok": true })));
    }

    #[test]
    fn failed_record_is_frozen() {
        let mut record = running();
        record.fail("boom").expect("first failure");

        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert!(record.complete(json!({})).is_err());
        assert!(record.data.is_none());
    }

    #[test]
    fn result_uses_camel_case_keys() {
        let result = ExecutionResult {
            execution_id: ExecutionId::new(),
            workflow_id: WorkflowId::new(),
            status: ExecutionStatus::Completed,
            data: json!({}),
        };
        let value = serde_json::to_value(&result).expect("serialize");
        assert!(value.get("executionId").is_some());
        assert!(value.get("workflowId").is_some());
        assert_eq!(value["status"], "completed");
    }
}
