//! Gameplay command routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::play::{
        ActionResponse, BuzzRequest, BuzzResponse, JudgeRequest, JudgeResponse,
        PostQuestionResponse, SelectPlayerRequest,
    },
    error::AppError,
    services::play_service,
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/games/{id}/start",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game started", body = ActionResponse),
        (status = 409, description = "Game already started"),
    ),
    tag = "play"
)]
/// Start the game (one-way transition out of the lobby).
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(play_service::start_game(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/games/{id}/question",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Question posted", body = PostQuestionResponse),
        (status = 409, description = "A question is already active"),
    ),
    tag = "play"
)]
/// Generate and post the next question.
pub async fn post_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostQuestionResponse>, AppError> {
    Ok(Json(play_service::post_question(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/games/{id}/judge",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = JudgeRequest,
    responses(
        (status = 200, description = "Verdict applied", body = JudgeResponse),
        (status = 409, description = "Nothing to judge in the current state"),
    ),
    tag = "play"
)]
/// Judge the current answer.
pub async fn judge_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<JudgeRequest>,
) -> Result<Json<JudgeResponse>, AppError> {
    Ok(Json(
        play_service::judge_answer(&state, id, request.correct).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/games/{id}/buzzer/press",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = BuzzRequest,
    responses(
        (status = 200, description = "Press resolved; losing the race is not an error", body = BuzzResponse),
    ),
    tag = "play"
)]
/// Claim buzzer priority; first claim wins.
pub async fn press_buzzer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BuzzRequest>,
) -> Result<Json<BuzzResponse>, AppError> {
    Ok(Json(
        play_service::press_buzzer(&state, id, request.player_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/games/{id}/buzzer/select",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = SelectPlayerRequest,
    responses(
        (status = 200, description = "Player selected", body = ActionResponse),
        (status = 409, description = "Race already resolved or wrong buzzer mode"),
    ),
    tag = "play"
)]
/// Moderator designates who buzzed first.
pub async fn select_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectPlayerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        play_service::moderator_select_player(&state, id, request.player_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/games/{id}/buzzer/give-up",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Round conceded", body = ActionResponse),
    ),
    tag = "play"
)]
/// Concede the current question and advance without scoring.
pub async fn buzzer_give_up(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(play_service::buzzer_give_up(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/games/{id}/skip",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Question skipped without burning a round", body = ActionResponse),
    ),
    tag = "play"
)]
/// Discard the current question, keeping the round counter.
pub async fn skip_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(play_service::skip_question(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/games/{id}/end",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game finished", body = ActionResponse),
        (status = 409, description = "Game already finished"),
    ),
    tag = "play"
)]
/// Finish the game early.
pub async fn end_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(play_service::end_game(&state, id).await?))
}

/// Configure the gameplay command routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/question", post(post_question))
        .route("/games/{id}/judge", post(judge_answer))
        .route("/games/{id}/buzzer/press", post(press_buzzer))
        .route("/games/{id}/buzzer/select", post(select_player))
        .route("/games/{id}/buzzer/give-up", post(buzzer_give_up))
        .route("/games/{id}/skip", post(skip_question))
        .route("/games/{id}/end", post(end_game))
}
