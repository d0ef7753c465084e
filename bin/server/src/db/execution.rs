//! Database repository for execution records.

use chrono::{DateTime, Utc};
use nodeflow_core::{ExecutionId, WorkflowId};
use nodeflow_workflow::{ExecutionRecord, ExecutionStatus};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use super::decode_error;

/// Row type for execution queries.
#[derive(FromRow)]
struct ExecutionRow {
    id: String,
    workflow_id: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    data: Option<serde_json::Value>,
}

impl ExecutionRow {
    fn try_into_record(self) -> Result<ExecutionRecord, sqlx::Error> {
        let id = ExecutionId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid execution id '{}': {}", self.id, e)))?;
        let workflow_id = WorkflowId::from_str(&self.workflow_id).map_err(|e| {
            decode_error(format!("invalid workflow id '{}': {}", self.workflow_id, e))
        })?;
        let status = ExecutionStatus::from_str(&self.status).map_err(|e| decode_error(e.to_string()))?;

        Ok(ExecutionRecord {
            id,
            workflow_id,
            status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error_message: self.error_message,
            data: self.data,
        })
    }
}

/// Repository for execution record operations.
#[derive(Clone)]
pub struct ExecutionRepository {
    pool: PgPool,
}

impl ExecutionRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new record.
    pub async fn create(&self, record: &ExecutionRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO workflow_executions
                (id, workflow_id, status, started_at, completed_at, error_message, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.workflow_id.to_string())
        .bind(record.status.as_str())
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(&record.error_message)
        .bind(&record.data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a running record completed. Returns false if no running
    /// record matched.
    pub async fn complete(
        &self,
        id: ExecutionId,
        data: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_executions
            SET status = 'completed', completed_at = NOW(), data = $2
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id.to_string())
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a running record failed. Returns false if no running record
    /// matched.
    pub async fn fail(&self, id: ExecutionId, message: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_executions
            SET status = 'failed', completed_at = NOW(), error_message = $2
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id.to_string())
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds a record by ID.
    pub async fn find_by_id(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, sqlx::Error> {
        let row: Option<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, status, started_at, completed_at, error_message, data
            FROM workflow_executions
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExecutionRow::try_into_record).transpose()
    }

    /// Lists records newest first, optionally for one workflow.
    pub async fn list(
        &self,
        workflow_id: Option<WorkflowId>,
    ) -> Result<Vec<ExecutionRecord>, sqlx::Error> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, status, started_at, completed_at, error_message, data
            FROM workflow_executions
            WHERE $1::TEXT IS NULL OR workflow_id = $1
            ORDER BY started_at DESC, id DESC
            "#,
        )
        .bind(workflow_id.map(|id| id.to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExecutionRow::try_into_record).collect()
    }
}
