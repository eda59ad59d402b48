//! Question supply orchestration: draws a category, calls the oracle under a
//! deadline, falls back to the static bank, and enforces per-game anti-repeat.

use rand::seq::IndexedRandom;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    oracle::{OracleError, QuestionOracle, QuestionRequest},
    state::{
        SharedState,
        record::{GameSettings, Question},
    },
};

/// Produce the next question for a game.
///
/// The oracle is an opaque, possibly slow collaborator: its call is bounded by
/// the configured deadline and any failure (timeout, transport, parse) drops
/// to the static bank so a stalled generation never blocks the game.
pub async fn next_question(
    state: &SharedState,
    game_id: Uuid,
    settings: &GameSettings,
) -> Result<Question, ServiceError> {
    let category = *settings
        .categories
        .choose(&mut rand::rng())
        .ok_or_else(|| ServiceError::InvalidState("game has no categories configured".into()))?;

    let request = QuestionRequest {
        category,
        difficulty: settings.difficulty,
        exclude: state.served_questions().snapshot(game_id),
    };

    let question = match timeout(
        state.oracle_timeout(),
        state.oracle().generate(request.clone()),
    )
    .await
    {
        Ok(Ok(question)) => question,
        Ok(Err(err)) => {
            warn!(%game_id, error = %err, "oracle failed; serving from the bank");
            serve_from_bank(state, game_id, request).await?
        }
        Err(_) => {
            warn!(%game_id, "oracle timed out; serving from the bank");
            serve_from_bank(state, game_id, request).await?
        }
    };

    state.served_questions().mark(game_id, &question.id);
    Ok(question)
}

/// Bank fallback. An exhausted pool resets the game's served set, after which
/// repeats are allowed again.
async fn serve_from_bank(
    state: &SharedState,
    game_id: Uuid,
    request: QuestionRequest,
) -> Result<Question, ServiceError> {
    match state.fallback_bank().generate(request.clone()).await {
        Ok(question) => Ok(question),
        Err(OracleError::PoolExhausted { .. }) => {
            warn!(%game_id, "question pool exhausted; resetting anti-repeat tracking");
            state.served_questions().clear(game_id);
            state
                .fallback_bank()
                .generate(QuestionRequest {
                    exclude: Vec::new(),
                    ..request
                })
                .await
                .map_err(ServiceError::QuestionGeneration)
        }
        Err(err) => Err(ServiceError::QuestionGeneration(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, time::Duration};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        oracle::{OracleResult, QuestionOracle, bank::BankQuestion},
        state::{
            AppState,
            record::{BuzzerMode, Category, Difficulty, MaxPlayers, TurnMode},
        },
    };

    struct StalledOracle;

    impl QuestionOracle for StalledOracle {
        fn generate(&self, _: QuestionRequest) -> BoxFuture<'static, OracleResult<Question>> {
            Box::pin(std::future::pending())
        }
    }

    fn science_bank(count: usize) -> Vec<BankQuestion> {
        (0..count)
            .map(|i| BankQuestion {
                id: format!("sci-easy-{i:02}"),
                category: Category::Science,
                difficulty: Difficulty::Easy,
                prompt: format!("Question {i}?"),
                answer: format!("Answer {i}"),
                fun_fact: None,
            })
            .collect()
    }

    fn settings() -> GameSettings {
        GameSettings {
            max_players: MaxPlayers::Unlimited,
            rounds_per_game: 10,
            categories: vec![Category::Science],
            turn_mode: TurnMode::Automatic,
            difficulty: Difficulty::Easy,
            buzzer_mode: BuzzerMode::PlayerPress,
            time_per_question: None,
        }
    }

    fn state_with_bank(
        count: usize,
        oracle: Option<Arc<dyn QuestionOracle>>,
    ) -> SharedState {
        let config = AppConfig {
            oracle_timeout: Duration::from_millis(50),
            questions: science_bank(count),
            ..AppConfig::default()
        };
        AppState::new(config, oracle)
    }

    #[tokio::test]
    async fn no_repeats_until_the_pool_is_exhausted() {
        let state = state_with_bank(4, None);
        let game_id = Uuid::new_v4();

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let question = next_question(&state, game_id, &settings()).await.unwrap();
            assert!(seen.insert(question.id.clone()), "repeat before exhaustion");
        }
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn exhausted_pool_resets_and_repeats() {
        let state = state_with_bank(2, None);
        let game_id = Uuid::new_v4();

        for _ in 0..2 {
            next_question(&state, game_id, &settings()).await.unwrap();
        }

        // The pool is dry; the next draw resets tracking and serves again.
        let question = next_question(&state, game_id, &settings()).await.unwrap();
        assert!(question.id.starts_with("sci-easy-"));
    }

    #[tokio::test]
    async fn tracking_is_scoped_per_game() {
        let state = state_with_bank(1, None);
        let first = next_question(&state, Uuid::new_v4(), &settings())
            .await
            .unwrap();
        let second = next_question(&state, Uuid::new_v4(), &settings())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn stalled_oracle_falls_back_to_the_bank() {
        let state = state_with_bank(3, Some(Arc::new(StalledOracle)));
        let question = next_question(&state, Uuid::new_v4(), &settings())
            .await
            .unwrap();
        assert!(question.id.starts_with("sci-easy-"));
    }

    #[tokio::test]
    async fn cleared_game_forgets_its_history() {
        let state = state_with_bank(1, None);
        let game_id = Uuid::new_v4();

        let first = next_question(&state, game_id, &settings()).await.unwrap();
        state.served_questions().clear(game_id);
        let second = next_question(&state, game_id, &settings()).await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
