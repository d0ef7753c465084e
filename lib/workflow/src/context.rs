//! The execution context threaded through a run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Ordered key/value data accumulated while a run executes.
///
/// Seeded from the trigger payload, extended by every executed node, and
/// stored as the execution record's `data` when the run completes. Keys
/// keep their insertion order; overwriting a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext(Map<String, JsonValue>);

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a context from a trigger payload.
    ///
    /// Only object payloads contribute keys; `null`, arrays and scalars
    /// seed an empty context.
    #[must_use]
    pub fn from_payload(payload: JsonValue) -> Self {
        match payload {
            JsonValue::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Returns a copy of this context with `entries` merged over it.
    ///
    /// Entries override existing keys of the same name; every other key is
    /// preserved. `self` is left untouched.
    #[must_use]
    pub fn merged<I, K>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, JsonValue)>,
        K: Into<String>,
    {
        let mut next = self.0.clone();
        for (key, value) in entries {
            next.insert(key.into(), value);
        }
        Self(next)
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the context holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the context as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }

    /// Consumes the context, returning it as a JSON object.
    #[must_use]
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}
