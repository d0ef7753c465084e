//! Node execution.
//!
//! A node executor turns one node and the current context into the next
//! context. Execution is a pure function of the node and the context: the
//! input context is never modified in place.

use crate::context::ExecutionContext;
use crate::node::{Node, NodeKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

/// Trait for node execution.
///
/// This abstraction lets the coordinator run against any behavior table;
/// [`SimulatedExecutor`] is the built-in one.
pub trait NodeExecutor: Send + Sync {
    /// Executes `node` against `context`, returning the next context.
    fn execute(&self, node: &Node, context: &ExecutionContext) -> ExecutionContext;
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The built-in simulated behaviors, one per node kind.
///
/// | kind | keys written |
/// |---|---|
/// | trigger | `triggered = true`, `timestamp = <now, RFC 3339>` |
/// | action | `action = <name>`, `processed = true` |
/// | logic | `logic = <name>`, `decision = "approved"` |
/// | integration | `integration = <name>`, `status = "connected"` |
/// | unknown | `unknown = true` |
#[derive(Clone)]
pub struct SimulatedExecutor {
    clock: Clock,
}

impl SimulatedExecutor {
    /// Creates an executor that stamps triggers with the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(Utc::now),
        }
    }

    /// Creates an executor with a custom clock.
    #[must_use]
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }

    fn timestamp(&self) -> JsonValue {
        JsonValue::String((self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimulatedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedExecutor").finish_non_exhaustive()
    }
}

impl NodeExecutor for SimulatedExecutor {
    fn execute(&self, node: &Node, context: &ExecutionContext) -> ExecutionContext {
        match node.kind {
            NodeKind::Trigger => {
                context.merged([("triggered", json!(true)), ("timestamp", self.timestamp())])
            }
            NodeKind::Action => {
                context.merged([("action", json!(node.name)), ("processed", json!(true))])
            }
            NodeKind::Logic => {
                context.merged([("logic", json!(node.name)), ("decision", json!("approved"))])
            }
            NodeKind::Integration => context.merged([
                ("integration", json!(node.name)),
                ("status", json!("connected")),
            ]),
            NodeKind::Unknown(_) => context.merged([("unknown", json!(true))]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_executor() -> SimulatedExecutor {
        SimulatedExecutor::with_clock(|| {
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
                .single()
                .expect("valid date")
        })
    }

    fn run(kind: NodeKind, name: &str, payload: JsonValue) -> JsonValue {
        let node = Node::new("n", kind, name);
        fixed_executor()
            .execute(&node, &ExecutionContext::from_payload(payload))
            .into_value()
    }

    #[test]
    fn trigger_marks_triggered_with_timestamp() {
        assert_eq!(
            run(NodeKind::Trigger, "Start", json!({ "x": 1 })),
            json!({ "x": 1, "triggered": true, "timestamp": "2024-05-01T12:00:00.000Z" })
        );
    }

    #[test]
    fn action_records_name() {
        assert_eq!(
            run(NodeKind::Action, "Send", json!({})),
            json!({ "action": "Send", "processed": true })
        );
    }

    #[test]
    fn logic_approves() {
        assert_eq!(
            run(NodeKind::Logic, "Check", json!({})),
            json!({ "logic": "Check", "decision": "approved" })
        );
    }

    #[test]
    fn integration_connects() {
        assert_eq!(
            run(NodeKind::Integration, "CRM", json!({})),
            json!({ "integration": "CRM", "status": "connected" })
        );
    }

    #[test]
    fn unknown_is_tagged() {
        assert_eq!(
            run(NodeKind::unknown("webhook"), "Mystery", json!({ "keep": "me" })),
            json!({ "keep": "me", "unknown": true })
        );
    }

    #[test]
    fn payload_keys_are_overridden_by_node_keys() {
        assert_eq!(
            run(NodeKind::Integration, "CRM", json!({ "status": "pending", "id": 9 })),
            json!({ "status": "connected", "id": 9, "integration": "CRM" })
        );
    }

    #[test]
    fn input_context_is_untouched() {
        let context = ExecutionContext::from_payload(json!({ "x": 1 }));
        let node = Node::new("n", NodeKind::Action, "Act");
        let next = fixed_executor().execute(&node, &context);

        assert_eq!(context.into_value(), json!({ "x": 1 }));
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn default_clock_produces_parseable_timestamp() {
        let node = Node::new("t", NodeKind::Trigger, "Start");
        let next = SimulatedExecutor::new().execute(&node, &ExecutionContext::new());
        let stamp = next
            .get("timestamp")
            .and_then(JsonValue::as_str)
            .expect("timestamp present");
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
