//! OpenAPI documentation generation.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia party backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::lookup_game,
        crate::routes::game::get_game,
        crate::routes::play::start_game,
        crate::routes::play::post_question,
        crate::routes::play::judge_answer,
        crate::routes::play::press_buzzer,
        crate::routes::play::select_player,
        crate::routes::play::buzzer_give_up,
        crate::routes::play::skip_question,
        crate::routes::play::end_game,
        crate::routes::sse::game_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::CreateGameResponse,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::JoinGameResponse,
            crate::dto::game::LookupResponse,
            crate::dto::game::GameSummary,
            crate::dto::play::ActionResponse,
            crate::dto::play::PostQuestionResponse,
            crate::dto::play::JudgeRequest,
            crate::dto::play::JudgeResponse,
            crate::dto::play::BuzzRequest,
            crate::dto::play::BuzzResponse,
            crate::dto::play::SelectPlayerRequest,
            crate::dto::public::PublicGameSnapshot,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game bootstrap and lookup"),
        (name = "play", description = "Gameplay commands"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
