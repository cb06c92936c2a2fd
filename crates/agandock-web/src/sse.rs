//! Server-Sent Events (SSE) streaming of pipeline progress.
//!
//! `/api/events?experiment=<name>` narrows the stream to one experiment's
//! pipeline events; general notifications are always delivered.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::state::{AppEvent, SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    pub experiment: Option<String>,
}

/// Events from `rx` that concern `experiment` (all of them when `None`).
/// A lagging subscriber gets a warning in place of the events it missed.
fn relevant_events(
    rx: broadcast::Receiver<AppEvent>,
    experiment: Option<String>,
) -> impl Stream<Item = AppEvent> {
    BroadcastStream::new(rx).filter_map(move |result| {
        let event = match result {
            Ok(event) => event,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                debug!("SSE subscriber lagged by {} events", missed);
                AppEvent::Notification {
                    level: "warning".into(),
                    message: format!("Missed {missed} pipeline events, refresh to catch up"),
                }
            }
        };
        match experiment.as_deref() {
            Some(name) if !event.concerns(name) => None,
            _ => Some(event),
        }
    })
}

fn to_sse(event: &AppEvent) -> Option<Event> {
    let sse = Event::default().json_data(event).ok()?;
    Some(match event.run_id() {
        Some(run_id) => sse.id(run_id.to_string()),
        None => sse,
    })
}

/// SSE endpoint - clients subscribe here for pipeline updates.
pub async fn sse_handler(
    State(state): State<SharedState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let experiment = filter.experiment.filter(|name| !name.trim().is_empty());
    let stream = relevant_events(state.subscribe(), experiment)
        .filter_map(|event| to_sse(&event).map(Ok));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
