use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

/// GET /api/v1/events
///
/// Streams `setsChanged`, `wordsChanged` and `uploadProgress` events. Payloads
/// carry ids only. A lagging client gets a `resync` event and should re-read.
/// Idle connections receive a `heartbeat` comment from the keep-alive.
pub async fn handle_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("SSE client connected");
    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            debug!("SSE: sending {event_type}");
                            yield Ok(Event::default().event(event_type).data(json));
                        }
                        Err(e) => warn!("SSE: failed to serialize {event_type}: {e}"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, {skipped} events dropped");
                    yield Ok(Event::default().event("resync").data("{}"));
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("SSE stream closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("heartbeat"))
}
