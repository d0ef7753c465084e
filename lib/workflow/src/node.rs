//! Workflow node types.
//!
//! Nodes are the building blocks of workflows. Each node has:
//! - An identifier chosen by the editor, unique within the workflow
//! - A kind that selects its execution behavior
//! - A display name and a canvas position
//! - Free-form parameters reserved for per-kind configuration

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Identifier of a node within a single workflow.
///
/// Node ids are assigned by whoever authors the graph, so they are opaque
/// strings rather than generated ULIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of a workflow node.
///
/// Serialized as a lowercase string. Any other `type` value deserializes
/// to [`NodeKind::Unknown`] instead of failing and is written back exactly
/// as it was read, so graphs authored by newer editors load, run and save
/// without losing their node types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Entry point; traversal starts only from these.
    Trigger,
    /// Performs an action on the data.
    Action,
    /// Makes a decision about the data.
    Logic,
    /// Talks to an external system.
    Integration,
    /// Anything else, holding the `type` value as supplied.
    Unknown(JsonValue),
}

impl NodeKind {
    /// Creates an unrecognized kind from its raw `type` value.
    #[must_use]
    pub fn unknown(raw: impl Into<JsonValue>) -> Self {
        Self::Unknown(raw.into())
    }

    /// Returns the wire name of this kind, or `"unknown"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Logic => "logic",
            Self::Integration => "integration",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Maps a raw `type` value to a kind, falling back to `Unknown`.
    #[must_use]
    pub fn from_raw(raw: JsonValue) -> Self {
        match raw.as_str() {
            Some("trigger") => Self::Trigger,
            Some("action") => Self::Action,
            Some("logic") => Self::Logic,
            Some("integration") => Self::Integration,
            _ => Self::Unknown(raw),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(JsonValue::String(raw)) => write!(f, "unknown ({raw})"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
            known => f.write_str(known.as_str()),
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unknown(raw) => raw.serialize(serializer),
            known => serializer.serialize_str(known.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Self::from_raw)
    }
}

/// Position of a node on the editor canvas. Never read by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset.
    #[serde(default)]
    pub x: f64,
    /// Vertical offset.
    #[serde(default)]
    pub y: f64,
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// Selects the execution behavior.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Human-readable name for this node.
    pub name: String,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// Per-kind configuration, opaque to the engine.
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
}

impl Node {
    /// Creates a node with no parameters at the canvas origin.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            position: Position::default(),
            parameters: Map::new(),
        }
    }

    /// Returns true if this node starts a traversal.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.kind == NodeKind::Trigger
    }
}
