//! Per-game SSE stream pushing the merged record to every subscriber.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/games/{id}/events",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Public record snapshots", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown game"),
    ),
    tag = "sse"
)]
/// Stream realtime record snapshots for one game.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe_game(&state, id).await?;
    info!(game_id = %id, "new game SSE connection");
    Ok(sse_service::to_sse_stream(receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{id}/events", get(game_stream))
}
