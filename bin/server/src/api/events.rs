//! Server-sent stream of node events.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use nodeflow_workflow::{Envelope, event::NODE_EXECUTED};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use super::AppState;

/// Streams every node event published after the client connects.
///
/// Each event is sent as `nodeExecuted` with an enveloped JSON payload.
/// A client that falls behind skips the events it missed.
pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(state.events.subscribe()).filter_map(|received| {
        let event = match received {
            Ok(event) => event,
            Err(lagged) => {
                tracing::debug!(error = %lagged, "event stream subscriber lagged");
                return None;
            }
        };
        match Envelope::new(event).to_json() {
            Ok(data) => Some(Ok(Event::default().event(NODE_EXECUTED).data(data))),
            Err(e) => {
                tracing::warn!(error = %e, "could not encode node event");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
