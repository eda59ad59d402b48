//! Game bootstrap and lookup routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{
        CreateGameRequest, CreateGameResponse, GameSummary, JoinGameRequest, JoinGameResponse,
        LookupQuery, LookupResponse,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/games",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = CreateGameResponse),
        (status = 400, description = "Invalid settings"),
    ),
    tag = "games"
)]
/// Create a new game and return its join code.
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let response = game_service::create_game(&state, request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/games/join",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined the lobby", body = JoinGameResponse),
        (status = 404, description = "No joinable game with that code"),
        (status = 409, description = "Game is full"),
    ),
    tag = "games"
)]
/// Join a lobby by its code.
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<JoinGameResponse>, AppError> {
    let response = game_service::join_game(&state, request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/games/lookup",
    params(("code" = String, Query, description = "Join code to resolve")),
    responses(
        (status = 200, description = "Matching active game", body = LookupResponse),
        (status = 404, description = "No active game with that code"),
    ),
    tag = "games"
)]
/// Resolve a join code without joining (spectator flow).
pub async fn lookup_game(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<LookupQuery>>,
) -> Result<Json<LookupResponse>, AppError> {
    let response = game_service::lookup_game(&state, query.code).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/games/{id}",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Full game state", body = GameSummary),
        (status = 404, description = "Unknown game"),
    ),
    tag = "games"
)]
/// Full moderator-side view of a game, answer included.
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSummary>, AppError> {
    let response = game_service::get_game(&state, id).await?;
    Ok(Json(response))
}

/// Configure the game bootstrap routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games", post(create_game))
        .route("/games/join", post(join_game))
        .route("/games/lookup", get(lookup_game))
        .route("/games/{id}", get(get_game))
}
