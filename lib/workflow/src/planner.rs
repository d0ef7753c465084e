//! Execution order planning.
//!
//! The order is a pre-order depth-first traversal rooted at the trigger
//! nodes:
//!
//! 1. Roots are the trigger nodes, taken in node-list order.
//! 2. A node is emitted the first time it is reached, then each outgoing
//!    connection is followed in connection order.
//! 3. A node already visited is never emitted again, so cycles and
//!    diamonds are safe and every node appears at most once.
//! 4. Connections to ids that are not in the graph are not followed.
//! 5. Nodes no trigger reaches are never scheduled.
//!
//! This is deliberately not a topological sort. In a graph where a node
//! has several predecessors at different depths, the node runs at its
//! first discovery, which may be before some of its predecessors.
//! Switching to dependency-respecting order would change observable node
//! order for non-tree graphs.

use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeId};
use std::collections::HashSet;

/// The ordered list of nodes a run will execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    order: Vec<NodeId>,
    scheduled: HashSet<NodeId>,
}

impl ExecutionPlan {
    fn from_order(order: Vec<NodeId>) -> Self {
        let scheduled = order.iter().cloned().collect();
        Self { order, scheduled }
    }

    /// Returns the planned node ids in execution order.
    #[must_use]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns the number of scheduled nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true if `id` is scheduled.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.scheduled.contains(id)
    }

    /// Returns the nodes of `graph` this plan never reaches.
    pub fn unscheduled<'a>(&'a self, graph: &'a WorkflowGraph) -> impl Iterator<Item = &'a Node> {
        graph.nodes().iter().filter(|n| !self.contains(&n.id))
    }
}

impl<'a> IntoIterator for &'a ExecutionPlan {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

/// Computes the execution order of `graph`.
#[must_use]
pub fn plan(graph: &WorkflowGraph) -> ExecutionPlan {
    let mut order = Vec::new();
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut stack: Vec<&NodeId> = Vec::new();

    for root in graph.trigger_nodes() {
        stack.push(&root.id);

        while let Some(id) = stack.pop() {
            if graph.node_by_id(id).is_none() || !visited.insert(id) {
                continue;
            }
            order.push(id.clone());

            // Reversed so the first connection is popped, and fully
            // explored, before the second.
            let children: Vec<&NodeId> = graph.connections_from(id).map(|c| &c.target).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    ExecutionPlan::from_order(order)
}
