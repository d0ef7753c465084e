//! Database repository for workflows.

use chrono::{DateTime, Utc};
use nodeflow_core::WorkflowId;
use nodeflow_workflow::{Connection, Node, Workflow, WorkflowGraph};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use super::decode_error;

/// Row type for workflow queries.
#[derive(FromRow)]
struct WorkflowRow {
    id: String,
    name: String,
    description: Option<String>,
    nodes: serde_json::Value,
    connections: serde_json::Value,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    fn try_into_workflow(self) -> Result<Workflow, sqlx::Error> {
        let id = WorkflowId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid workflow id '{}': {}", self.id, e)))?;
        let nodes: Vec<Node> = serde_json::from_value(self.nodes)
            .map_err(|e| decode_error(format!("invalid nodes of workflow {id}: {e}")))?;
        let connections: Vec<Connection> = serde_json::from_value(self.connections)
            .map_err(|e| decode_error(format!("invalid connections of workflow {id}: {e}")))?;

        Ok(Workflow {
            id,
            name: self.name,
            description: self.description,
            graph: WorkflowGraph::from_parts(nodes, connections),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Node and connection lists as JSONB values.
fn graph_columns(
    graph: &WorkflowGraph,
) -> Result<(serde_json::Value, serde_json::Value), sqlx::Error> {
    let encode = |e: serde_json::Error| sqlx::Error::Encode(Box::new(e));
    Ok((
        serde_json::to_value(graph.nodes()).map_err(encode)?,
        serde_json::to_value(graph.connections()).map_err(encode)?,
    ))
}

/// Repository for workflow operations.
#[derive(Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

impl WorkflowRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all workflows, newest first.
    pub async fn list(&self) -> Result<Vec<Workflow>, sqlx::Error> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, nodes, connections, is_active, created_at, updated_at
            FROM workflows
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkflowRow::try_into_workflow).collect()
    }

    /// Lists workflows with the active flag set.
    pub async fn list_active(&self) -> Result<Vec<Workflow>, sqlx::Error> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, nodes, connections, is_active, created_at, updated_at
            FROM workflows
            WHERE is_active
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkflowRow::try_into_workflow).collect()
    }

    /// Finds a workflow by ID.
    pub async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, sqlx::Error> {
        let row: Option<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, nodes, connections, is_active, created_at, updated_at
            FROM workflows
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkflowRow::try_into_workflow).transpose()
    }

    /// Creates a new workflow.
    pub async fn create(&self, workflow: &Workflow) -> Result<(), sqlx::Error> {
        let (nodes, connections) = graph_columns(&workflow.graph)?;
        sqlx::query(
            r#"
            INSERT INTO workflows
                (id, name, description, nodes, connections, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(nodes)
        .bind(connections)
        .bind(workflow.is_active)
        .bind(workflow.created_at)
        .bind(workflow.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a workflow. Returns false if no row matched.
    pub async fn update(&self, workflow: &Workflow) -> Result<bool, sqlx::Error> {
        let (nodes, connections) = graph_columns(&workflow.graph)?;
        let result = sqlx::query(
            r#"
            UPDATE workflows
            SET name = $2, description = $3, nodes = $4, connections = $5,
                is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(nodes)
        .bind(connections)
        .bind(workflow.is_active)
        .bind(workflow.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a workflow. Returns false if no row matched.
    pub async fn delete(&self, id: WorkflowId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
