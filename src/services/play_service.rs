//! Gameplay commands: the service half of the command handlers.
//!
//! Each command reads the latest record, lets the pure handlers in
//! [`crate::state::machine`] validate and compute the partial update, then
//! issues the write. Commands that race (buzzer presses) or that must not
//! apply to a since-advanced round go through the store's conditional write,
//! re-checking their precondition against the freshest value at write time.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::record_store::{ConditionalWrite, RecordPredicate, RecordStore},
    dto::play::{
        ActionResponse, BuzzResponse, JudgeResponse, PostQuestionResponse,
    },
    error::ServiceError,
    services::question_service,
    state::{
        SharedState, machine,
        record::{GameRecord, GameStatus, TurnMode},
    },
};

async fn load_record(
    store: &Arc<dyn RecordStore>,
    game_id: Uuid,
) -> Result<GameRecord, ServiceError> {
    store
        .read(game_id)
        .await?
        .ok_or(ServiceError::GameNotFound)
}

/// Move the lobby into active play.
pub async fn start_game(
    state: &SharedState,
    game_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;
    let patch = machine::start_game(&record)?;

    let predicate: RecordPredicate = Arc::new(|rec: &GameRecord| rec.status == GameStatus::Lobby);
    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => {
            info!(%game_id, "game started");
            Ok(ActionResponse::new("started"))
        }
        ConditionalWrite::Rejected => Err(ServiceError::InvalidState(
            "game already started".into(),
        )),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Generate and post the next question.
///
/// The oracle runs before (and off) the write path; in automatic mode a
/// uniformly random responder goes on the clock.
pub async fn post_question(
    state: &SharedState,
    game_id: Uuid,
) -> Result<PostQuestionResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;

    if record.status != GameStatus::Playing {
        return Err(ServiceError::InvalidState(format!(
            "cannot post a question while status is {:?}",
            record.status
        )));
    }

    let question = question_service::next_question(state, game_id, &record.settings).await?;

    let on_the_clock = match record.settings.turn_mode {
        TurnMode::Automatic => {
            let ids: Vec<Uuid> = record.players.keys().copied().collect();
            ids.choose(&mut rand::rng()).copied()
        }
        TurnMode::Buzzer => None,
    };

    let patch = machine::post_question(&record, question.clone(), on_the_clock)?;

    // Guard against posting twice for the same round from a stale view.
    let expected_round = record.round;
    let predicate: RecordPredicate = Arc::new(move |rec: &GameRecord| {
        rec.status == GameStatus::Playing
            && rec.round == expected_round
            && rec.current_question.is_none()
    });

    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => {
            debug!(%game_id, question_id = question.id, "question posted");
            Ok(PostQuestionResponse {
                question: question.into(),
                on_the_clock,
            })
        }
        ConditionalWrite::Rejected => Err(ServiceError::InvalidState(
            "a question is already active for this round".into(),
        )),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Judge the current answer. `correct` carries the moderator's verdict.
pub async fn judge_answer(
    state: &SharedState,
    game_id: Uuid,
    correct: bool,
) -> Result<JudgeResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;
    let outcome = machine::judge_answer(&record, correct, state.scoring())?;

    // The judged player's score was read from this record; requiring the turn
    // and round to be unchanged at write time makes the read-modify-write
    // safe and turns a duplicated judgement into a no-op.
    let expected_round = record.round;
    let expected_turn = record.current_player_turn;
    let predicate: RecordPredicate = Arc::new(move |rec: &GameRecord| {
        rec.status == GameStatus::Playing
            && rec.round == expected_round
            && rec.current_player_turn == expected_turn
    });

    let finished = outcome.patch.status == Some(GameStatus::Finished);
    match store.update_if(game_id, predicate, outcome.patch).await? {
        ConditionalWrite::Applied => {
            if finished {
                state.served_questions().clear(game_id);
            }
            let latest = load_record(&store, game_id).await?;
            Ok(JudgeResponse {
                award: outcome.award.map(Into::into),
                round_over: outcome.round_over,
                status: latest.status,
                round: latest.round,
            })
        }
        ConditionalWrite::Rejected => {
            // The round moved on under this verdict (e.g. a double click);
            // report the converged state without re-applying any scoring.
            let latest = load_record(&store, game_id).await?;
            Ok(JudgeResponse {
                award: None,
                round_over: true,
                status: latest.status,
                round: latest.round,
            })
        }
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// A player claims buzzer priority. Losing the race is a success-as-no-op.
pub async fn press_buzzer(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<BuzzResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;

    let Some(patch) = machine::press_buzzer(&record, player_id)? else {
        return Ok(BuzzResponse { claimed: false });
    };

    // First claim wins: the handler validated against its own read, but the
    // decisive check runs against the store's freshest value. Where the
    // backend has native compare-and-set this closes the race completely;
    // elsewhere it narrows the window to the read-write gap.
    let predicate: RecordPredicate = Arc::new(move |rec: &GameRecord| {
        rec.status == GameStatus::WaitingForBuzzer
            && rec.buzzer_pressed.is_none()
            && !rec.players_waiting.contains(&player_id)
    });

    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => {
            debug!(%game_id, %player_id, "buzzer claimed");
            Ok(BuzzResponse { claimed: true })
        }
        ConditionalWrite::Rejected => Ok(BuzzResponse { claimed: false }),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Moderator designates the claimant instead of a self-press race.
pub async fn moderator_select_player(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;
    let patch = machine::moderator_select_player(&record, player_id)?;

    let predicate: RecordPredicate =
        Arc::new(|rec: &GameRecord| rec.status == GameStatus::WaitingForBuzzer);
    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => Ok(ActionResponse::new("player selected")),
        ConditionalWrite::Rejected => Err(ServiceError::InvalidState(
            "buzzer race already resolved".into(),
        )),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Everyone concedes the current question; advance without scoring.
pub async fn buzzer_give_up(
    state: &SharedState,
    game_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;
    let patch = machine::buzzer_give_up(&record)?;
    let finished = patch.status == Some(GameStatus::Finished);

    // Round-guarded so a duplicated give-up cannot burn two rounds.
    let expected_round = record.round;
    let predicate: RecordPredicate =
        Arc::new(move |rec: &GameRecord| rec.round == expected_round && !rec.is_finished());

    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => {
            if finished {
                state.served_questions().clear(game_id);
            }
            Ok(ActionResponse::new("round conceded"))
        }
        ConditionalWrite::Rejected => Ok(ActionResponse::new("round already advanced")),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Discard the current question without burning a round.
pub async fn skip_question(
    state: &SharedState,
    game_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;
    let patch = machine::skip_question(&record)?;

    let expected_round = record.round;
    let predicate: RecordPredicate =
        Arc::new(move |rec: &GameRecord| rec.round == expected_round && !rec.is_finished());

    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => Ok(ActionResponse::new("question skipped")),
        ConditionalWrite::Rejected => Ok(ActionResponse::new("round already advanced")),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}

/// Finish the game early and drop its anti-repeat tracking.
pub async fn end_game(state: &SharedState, game_id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_record_store().await?;
    let record = load_record(&store, game_id).await?;
    let patch = machine::end_game(&record)?;

    let predicate: RecordPredicate = Arc::new(|rec: &GameRecord| !rec.is_finished());
    match store.update_if(game_id, predicate, patch).await? {
        ConditionalWrite::Applied => {
            state.served_questions().clear(game_id);
            info!(%game_id, "game ended");
            Ok(ActionResponse::new("ended"))
        }
        ConditionalWrite::Rejected => Err(ServiceError::InvalidState(
            "game already finished".into(),
        )),
        ConditionalWrite::Missing => Err(ServiceError::GameNotFound),
    }
}
