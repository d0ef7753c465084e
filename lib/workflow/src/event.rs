//! Per-node progress events.

use nodeflow_core::ExecutionId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::node::NodeId;

/// Name under which node events are published to clients.
pub const NODE_EXECUTED: &str = "nodeExecuted";

/// Emitted once per executed node, after the node's context is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecuted {
    pub execution_id: ExecutionId,
    pub node_id: NodeId,
    pub node_name: String,
    /// The full context after the node ran.
    pub data: JsonValue,
}

/// Receives node events from running executions.
///
/// Publishing is fire-and-forget: a sink must not block the run and
/// cannot fail it.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: NodeExecuted);
}

/// Fans events out to any number of subscribers over a broadcast channel.
///
/// Subscribers that fall more than `capacity` events behind lose the
/// oldest ones. Publishing with no subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<NodeExecuted>,
}

impl BroadcastEventSink {
    /// Creates a sink buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns a new receiver that sees every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NodeExecuted> {
        self.tx.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: NodeExecuted) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<NodeExecuted>>,
}

impl RecordingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events published so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<NodeExecuted> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, event: NodeExecuted) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: NodeExecuted) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(node: &str) -> NodeExecuted {
        NodeExecuted {
            execution_id: ExecutionId::new(),
            node_id: NodeId::new(node),
            node_name: node.to_uppercase(),
            data: json!({ "node": node }),
        }
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let sink = BroadcastEventSink::new(4);
        assert_eq!(sink.subscriber_count(), 0);
        sink.publish(event("a"));
    }

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let sink = BroadcastEventSink::new(16);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        for node in ["a", "b", "c"] {
            sink.publish(event(node));
        }

        for rx in [&mut first, &mut second] {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(rx.recv().await.expect("event").node_id.to_string());
            }
            assert_eq!(seen, ["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let sink = BroadcastEventSink::new(2);
        let mut rx = sink.subscribe();

        for node in ["a", "b", "c", "d"] {
            sink.publish(event(node));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.expect("event").node_id.as_str(), "c");
    }

    #[test]
    fn event_uses_camel_case_keys() {
        let value = serde_json::to_value(event("a")).expect("serialize");
        assert!(value.get("executionId").is_some());
        assert_eq!(value["nodeId"], "a");
        assert_eq!(value["nodeName"], "A");
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        sink.publish(event("x"));
        sink.publish(event("y"));
        let ids: Vec<_> = sink.events().into_iter().map(|e| e.node_id).collect();
        assert_eq!(ids, [NodeId::new("x"), NodeId::new("y")]);
    }
}
