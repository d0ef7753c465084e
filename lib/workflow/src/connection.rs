//! Connections between workflow nodes.
//!
//! A connection is a directed edge from a source node to a target node.
//! It names the output and input ports it joins, but the engine treats
//! every connection as a plain edge and ignores port identity.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Port name used when a connection does not specify one.
pub const DEFAULT_PORT: &str = "main";

/// Identifier of a connection within a single workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates a connection id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, unique connection id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("conn_{}", Ulid::new()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Identifier of this connection.
    #[serde(default)]
    pub id: ConnectionId,
    /// The node data flows out of.
    pub source: NodeId,
    /// The node data flows into.
    pub target: NodeId,
    /// Output port on the source node.
    #[serde(default = "default_port")]
    pub source_output: String,
    /// Input port on the target node.
    #[serde(default = "default_port")]
    pub target_input: String,
}

impl Connection {
    /// Creates a connection between the default ports of two nodes.
    #[must_use]
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: ConnectionId::generate(),
            source: source.into(),
            target: target.into(),
            source_output: default_port(),
            target_input: default_port(),
        }
    }
}
