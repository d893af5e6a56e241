//! `GET /api/v1/events/vms`: subscribes to the event bus and streams one SSE
//! frame per `VmEvent` until the client disconnects.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::AppState;

pub async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.events().subscribe();

    let events = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(event.event_type.as_str()).data(data)))
        }
        // A slow subscriber that lagged behind the broadcast buffer just
        // misses the events it couldn't keep up with; the stream itself
        // keeps running rather than terminating on it.
        Err(_) => None,
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}
