//! Workflow definition types.
//!
//! A workflow is a named graph plus an activation flag. The graph is
//! flattened into the workflow's JSON so `nodes` and `connections` sit
//! beside `name` exactly as the editor submits them.

use crate::graph::WorkflowGraph;
use chrono::{DateTime, Utc};
use nodeflow_core::WorkflowId;
use serde::{Deserialize, Serialize};

/// A stored workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier, fixed at creation.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// What this workflow does.
    #[serde(default)]
    pub description: Option<String>,
    /// Nodes and connections.
    #[serde(flatten)]
    pub graph: WorkflowGraph,
    /// Whether the workflow is in the active set.
    #[serde(default)]
    pub is_active: bool,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates an inactive workflow from `new`, stamped now.
    #[must_use]
    pub fn create(new: NewWorkflow) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            name: new.name,
            description: new.description,
            graph: new.graph,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an empty inactive workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::create(NewWorkflow {
            name: name.into(),
            description: None,
            graph: WorkflowGraph::new(),
        })
    }

    /// Replaces the graph.
    #[must_use]
    pub fn with_graph(mut self, graph: WorkflowGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Sets the activation flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Replaces every editable field with `update` and bumps `updated_at`.
    ///
    /// The id and creation time never change.
    pub fn apply(&mut self, update: WorkflowUpdate) {
        self.name = update.name;
        self.description = update.description;
        self.graph = update.graph;
        self.is_active = update.is_active;
        self.updated_at = Utc::now();
    }

    /// Returns the short form listed by the active-workflow endpoint.
    #[must_use]
    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Input for creating a workflow. New workflows start inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub graph: WorkflowGraph,
}

/// Full replacement of a workflow's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub graph: WorkflowGraph,
    #[serde(default)]
    pub is_active: bool,
}

/// Id and name of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use serde_json::json;

    #[test]
    fn created_workflows_are_inactive() {
        let workflow = Workflow::create(NewWorkflow {
            name: "Onboarding".to_string(),
            description: Some("Welcome new users".to_string()),
            graph: WorkflowGraph::new(),
        });

        assert!(!workflow.is_active);
        assert_eq!(workflow.created_at, workflow.updated_at);
    }

    #[test]
    fn apply_replaces_fields_and_keeps_identity() {
        let mut workflow = Workflow::new("Old");
        let id = workflow.id;
        let created_at = workflow.created_at;

        let mut graph = WorkflowGraph::new();
        graph.add_node(Node::new("t", NodeKind::Trigger, "Start"));
        workflow.apply(WorkflowUpdate {
            name: "New".to_string(),
            description: None,
            graph,
            is_active: true,
        });

        assert_eq!(workflow.id, id);
        assert_eq!(workflow.created_at, created_at);
        assert_eq!(workflow.name, "New");
        assert!(workflow.is_active);
        assert_eq!(workflow.graph.node_count(), 1);
        assert!(workflow.updated_at >= created_at);
    }

    #[test]
    fn graph_is_flattened_in_json() {
        let workflow = Workflow::new("Flat");
        let value = serde_json::to_value(&workflow).expect("serialize");

        assert_eq!(value["nodes"], json!([]));
        assert_eq!(value["connections"], json!([]));
        assert!(value.get("graph").is_none());
        assert!(value["id"].as_str().is_some_and(|id| id.starts_with("wf_")));
    }

    #[test]
    fn new_workflow_accepts_editor_body() {
        let new: NewWorkflow = serde_json::from_value(json!({
            "name": "From editor",
            "nodes": [{ "id": "t", "type": "trigger", "name": "Start", "position": { "x": 10, "y": 20 } }],
            "connections": []
        }))
        .expect("deserialize");

        assert_eq!(new.name, "From editor");
        assert!(new.description.is_none());
        assert_eq!(new.graph.trigger_nodes().count(), 1);
    }

    #[test]
    fn update_without_flag_deactivates() {
        let update: WorkflowUpdate =
            serde_json::from_value(json!({ "name": "x" })).expect("deserialize");
        assert!(!update.is_active);
        assert_eq!(update.graph.node_count(), 0);
    }
}
