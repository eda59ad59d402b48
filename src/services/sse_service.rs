//! Server-sent events: forwards the store's per-game subscription to HTTP
//! clients as public record snapshots.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{public::PublicGameSnapshot, sse::ServerEvent},
    error::ServiceError,
    state::{SharedState, record::GameRecord},
};

/// Event name used for record snapshots.
const EVENT_RECORD: &str = "record";

/// Subscribe to a game's record through the installed store.
pub async fn subscribe_game(
    state: &SharedState,
    game_id: Uuid,
) -> Result<watch::Receiver<GameRecord>, ServiceError> {
    let store = state.require_record_store().await?;
    store
        .subscribe(game_id)
        .await?
        .ok_or(ServiceError::GameNotFound)
}

/// Convert a record subscription into an SSE response: the current value is
/// delivered immediately, every merged record afterwards, spoiler-free.
pub fn to_sse_stream(
    mut receiver: watch::Receiver<GameRecord>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from the watch channel and pushes into mpsc
    tokio::spawn(async move {
        loop {
            let snapshot = PublicGameSnapshot::from(receiver.borrow_and_update().clone());
            match ServerEvent::json(Some(EVENT_RECORD.to_string()), &snapshot) {
                Ok(payload) => {
                    let mut event = Event::default().data(payload.data);
                    if let Some(name) = payload.event {
                        event = event.event(name);
                    }
                    if tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to serialize record snapshot");
                }
            }

            tokio::select! {
                _ = tx.closed() => break,
                changed = receiver.changed() => {
                    if changed.is_err() {
                        // The publishing side is gone; end the stream.
                        break;
                    }
                }
            }
        }

        tracing::info!("game SSE stream disconnected");
    });

    // response stream reads from mpsc; when the client disconnects axum
    // drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
