//! Server-Sent Events (SSE) utilities
//!
//! Frames pipeline events as named SSE events. The stream ends after the
//! first terminal event, or when the producer drops its sender.

use crate::events::RankEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Convert a pipeline event into a named SSE event with a JSON payload
pub fn to_sse_event(event: &RankEvent) -> Event {
    Event::default()
        .event(event.event_type())
        .data(event.payload().to_string())
}

/// Build an SSE response that forwards events from a pipeline channel
///
/// # Example
/// ```rust,ignore
/// let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
/// tokio::spawn(async move { pipeline.run(query, &ChannelSink::new(tx)).await });
/// return rank_event_stream(rx);
/// ```
pub fn rank_event_stream(
    mut rx: mpsc::UnboundedReceiver<RankEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("SSE: rank event stream opened");

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            debug!("SSE: sending {} event", event.event_type());
            let terminal = event.is_terminal();
            yield Ok(to_sse_event(&event));
            if terminal {
                break;
            }
        }
        info!("SSE: rank event stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
