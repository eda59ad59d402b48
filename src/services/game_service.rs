//! Business logic for game bootstrap, joining, and lookups.

use std::sync::Arc;

use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::record_store::{ConditionalWrite, RecordPredicate},
    dto::game::{
        CreateGameRequest, CreateGameResponse, GameSummary, JoinGameRequest, JoinGameResponse,
        LookupResponse,
    },
    error::ServiceError,
    state::{
        SharedState, machine,
        record::{GameRecord, GameSettings, GameStatus, Player},
    },
};

/// Characters join codes are drawn from. Uppercase alphanumerics read well
/// when shouted across a room.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Length of a join code.
const CODE_LENGTH: usize = 6;
/// Give up allocating a unique code after this many collisions.
const CODE_ALLOCATION_ATTEMPTS: u32 = 10;

/// Generate a random join code.
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Bootstrap a fresh game record in the lobby state.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<CreateGameResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let settings: GameSettings = request.settings.into();

    // Codes must be unique among active games; finished games free theirs up.
    let mut code = generate_join_code();
    let mut attempts = 0;
    while store.find_by_code(code.clone()).await?.is_some() {
        attempts += 1;
        if attempts >= CODE_ALLOCATION_ATTEMPTS {
            return Err(ServiceError::InvalidState(
                "could not allocate a unique join code".into(),
            ));
        }
        code = generate_join_code();
    }

    let moderator_id = Uuid::new_v4();
    let record = GameRecord::new(moderator_id, code.clone(), settings);
    let game_id = record.id;
    store.create(record).await?;

    info!(%game_id, code, "created game");
    Ok(CreateGameResponse {
        game_id,
        code,
        moderator_id,
    })
}

/// Add a player to a lobby found by its join code.
///
/// The capacity check runs twice: once against the record we read, and again
/// inside the store's conditional write, so two players racing for the last
/// seat cannot both squeeze in.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<JoinGameResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = store
        .find_by_code(request.code.clone())
        .await?
        .ok_or(ServiceError::GameNotFound)?;

    let player = Player::new(request.name.trim().to_string());
    let player_id = player.id;
    let patch = machine::join_game(&record, player)?;

    let predicate: RecordPredicate = Arc::new(|rec: &GameRecord| {
        rec.status == GameStatus::Lobby && rec.settings.max_players.admits(rec.players.len())
    });

    match store.update_if(record.id, predicate, patch).await? {
        ConditionalWrite::Applied => {
            info!(game_id = %record.id, %player_id, "player joined");
            Ok(JoinGameResponse {
                game_id: record.id,
                player_id,
            })
        }
        ConditionalWrite::Rejected => {
            // Distinguish a lobby that filled up from a game that started
            // while the request was in flight.
            match store.read(record.id).await? {
                Some(latest) if latest.status == GameStatus::Lobby => Err(ServiceError::GameFull),
                _ => Err(ServiceError::GameNotFound),
            }
        }
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Resolve a join code for a spectator without joining.
pub async fn lookup_game(state: &SharedState, code: String) -> Result<LookupResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = store
        .find_by_code(code)
        .await?
        .ok_or(ServiceError::GameNotFound)?;

    Ok(LookupResponse {
        game_id: record.id,
        status: record.status,
    })
}

/// Full moderator-side view of a game.
pub async fn get_game(state: &SharedState, game_id: Uuid) -> Result<GameSummary, ServiceError> {
    let store = state.require_record_store().await?;
    let record = store
        .read(game_id)
        .await?
        .ok_or(ServiceError::GameNotFound)?;

    Ok(record.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::record_store::memory::MemoryRecordStore,
        dto::game::SettingsInput,
        state::{AppState, record::{Category, Difficulty, TurnMode}},
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default(), None);
        state
            .install_record_store(Arc::new(MemoryRecordStore::new()))
            .await;
        state
    }

    fn create_request(max_players: Option<u32>) -> CreateGameRequest {
        CreateGameRequest {
            settings: SettingsInput {
                max_players,
                rounds_per_game: 3,
                categories: vec![Category::Science, Category::History],
                turn_mode: TurnMode::Automatic,
                difficulty: Difficulty::Easy,
                buzzer_mode: None,
                time_per_question: None,
            },
        }
    }

    #[test]
    fn join_codes_have_the_expected_shape() {
        for _ in 0..50 {
            let code = generate_join_code();
            assert_eq!(code.len(), 6);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[tokio::test]
    async fn create_then_join_by_code() {
        let state = test_state().await;
        let created = create_game(&state, create_request(None)).await.unwrap();

        let joined = join_game(
            &state,
            JoinGameRequest {
                code: created.code.clone(),
                name: "Ada".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(joined.game_id, created.game_id);
        let summary = get_game(&state, created.game_id).await.unwrap();
        assert_eq!(summary.players.len(), 1);
        assert_eq!(summary.players[0].name, "Ada");
        assert_eq!(summary.players[0].score, 0);
    }

    #[tokio::test]
    async fn join_with_unknown_code_fails() {
        let state = test_state().await;
        let err = join_game(
            &state,
            JoinGameRequest {
                code: "NOPE00".into(),
                name: "Ada".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::GameNotFound));
    }

    #[tokio::test]
    async fn third_join_into_a_two_seat_lobby_fails() {
        let state = test_state().await;
        let created = create_game(&state, create_request(Some(2))).await.unwrap();

        for name in ["Ada", "Grace"] {
            join_game(
                &state,
                JoinGameRequest {
                    code: created.code.clone(),
                    name: name.into(),
                },
            )
            .await
            .unwrap();
        }

        let err = join_game(
            &state,
            JoinGameRequest {
                code: created.code,
                name: "Edsger".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::GameFull));
    }

    #[tokio::test]
    async fn join_trims_the_display_name() {
        let state = test_state().await;
        let created = create_game(&state, create_request(None)).await.unwrap();
        join_game(
            &state,
            JoinGameRequest {
                code: created.code,
                name: "  Ada  ".into(),
            },
        )
        .await
        .unwrap();

        let summary = get_game(&state, created.game_id).await.unwrap();
        assert_eq!(summary.players[0].name, "Ada");
    }

    #[tokio::test]
    async fn lookup_resolves_active_games_only() {
        let state = test_state().await;
        let created = create_game(&state, create_request(None)).await.unwrap();

        let lookup = lookup_game(&state, created.code.clone()).await.unwrap();
        assert_eq!(lookup.game_id, created.game_id);
        assert_eq!(lookup.status, GameStatus::Lobby);

        let err = lookup_game(&state, "ABSENT".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::GameNotFound));
    }
}
