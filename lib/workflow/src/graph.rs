//! The in-memory graph of a workflow.
//!
//! A workflow graph is the node list and the connection list exactly as
//! the editor supplied them. Order matters: trigger roots are visited in
//! node order and outgoing connections in connection order, so both lists
//! are kept as-is and a side index provides id lookups.

use crate::connection::Connection;
use crate::error::GraphError;
use crate::node::{Node, NodeId};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Serialized shape of a graph: two always-present lists.
#[derive(Deserialize)]
struct GraphParts {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    connections: Vec<Connection>,
}

/// Nodes and connections of a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphParts")]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    /// Position of the first node with each id.
    #[serde(skip)]
    node_index: HashMap<NodeId, usize>,
    /// Positions of the connections leaving each source id.
    #[serde(skip)]
    outgoing: HashMap<NodeId, Vec<usize>>,
}

impl From<GraphParts> for WorkflowGraph {
    fn from(parts: GraphParts) -> Self {
        Self::from_parts(parts.nodes, parts.connections)
    }
}

impl PartialEq for WorkflowGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.connections == other.connections
    }
}

impl WorkflowGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from node and connection lists, keeping their order.
    #[must_use]
    pub fn from_parts(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            node_index.entry(node.id.clone()).or_insert(position);
        }
        let mut outgoing: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (position, connection) in connections.iter().enumerate() {
            outgoing
                .entry(connection.source.clone())
                .or_default()
                .push(position);
        }
        Self {
            nodes,
            connections,
            node_index,
            outgoing,
        }
    }

    /// Appends a node.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.node_index
            .entry(id.clone())
            .or_insert(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Appends a connection. Endpoints are not checked here.
    pub fn add_connection(&mut self, connection: Connection) {
        self.outgoing
            .entry(connection.source.clone())
            .or_default()
            .push(self.connections.len());
        self.connections.push(connection);
    }

    /// Returns the node with the given id, if present.
    #[must_use]
    pub fn node_by_id(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).map(|&position| &self.nodes[position])
    }

    /// Returns the connections leaving `id`, in the order they were supplied.
    pub fn connections_from(&self, id: &NodeId) -> impl Iterator<Item = &Connection> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&position| &self.connections[position])
    }

    /// Returns the trigger nodes, in node order.
    pub fn trigger_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_trigger())
    }

    /// Returns all nodes, in the order they were supplied.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all connections, in the order they were supplied.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Checks the graph before it is written.
    ///
    /// The planner tolerates both conditions checked here, but a graph
    /// containing them is a data-quality defect that should not be stored.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] when two nodes share an id and
    /// [`GraphError::DanglingConnection`] when a connection references a
    /// node that does not exist.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(GraphError::DuplicateNode {
                    node_id: node.id.clone(),
                });
            }
        }

        for connection in &self.connections {
            for endpoint in [&connection.source, &connection.target] {
                if !self.node_index.contains_key(endpoint) {
                    return Err(GraphError::DanglingConnection {
                        connection_id: connection.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns true if the connections form at least one cycle.
    ///
    /// Cycles are legal; the planner visits each node once regardless.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        let mut graph = DiGraph::<(), ()>::with_capacity(self.nodes.len(), self.connections.len());
        let indices: Vec<_> = self.nodes.iter().map(|_| graph.add_node(())).collect();

        for connection in &self.connections {
            let (Some(&source), Some(&target)) = (
                self.node_index.get(&connection.source),
                self.node_index.get(&connection.target),
            ) else {
                continue;
            };
            graph.add_edge(indices[source], indices[target], ());
        }

        petgraph::algo::is_cyclic_directed(&graph)
    }
}
