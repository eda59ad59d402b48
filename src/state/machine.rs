//! Pure command handlers for the game record.
//!
//! Each handler validates its preconditions against the caller's view of the
//! record and computes a [`RecordPatch`]; issuing the write (and re-checking
//! racy preconditions at write time) is the service layer's job. Handlers
//! never mutate the input record.
//!
//! Race losses and stale commands are not errors: a second buzzer press, or a
//! press that arrives after the round advanced, resolves to `Ok(None)` and the
//! caller simply ignores it.

use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    record::{
        BuzzerMode, GameRecord, GameStatus, Player, Question, RecordPatch, TurnMode,
    },
    scoring::{self, ScoringTable},
};

/// Error returned when a command cannot be applied to the current record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command is not legal in the record's current status.
    #[error("`{command}` cannot be applied while status is {status:?}")]
    InvalidStatus {
        /// Command that was attempted.
        command: &'static str,
        /// Status the record was in.
        status: GameStatus,
    },
    /// The referenced player is not part of this game.
    #[error("player `{player_id}` is not part of this game")]
    UnknownPlayer {
        /// Offending player id.
        player_id: Uuid,
    },
    /// The player already attempted the current buzzer question.
    #[error("player `{player_id}` already attempted this question")]
    AlreadyAttempted {
        /// Offending player id.
        player_id: Uuid,
    },
    /// Judging requires an active question and a turn holder.
    #[error("no active question to judge")]
    NoActiveQuestion,
    /// No player currently holds the right to answer.
    #[error("no player currently holds the turn")]
    NoTurnHolder,
    /// Manual selection requires the moderator-select buzzer mode.
    #[error("manual selection requires the moderator-select buzzer mode")]
    WrongBuzzerMode,
    /// The lobby has reached its configured capacity.
    #[error("game is full")]
    GameFull,
    /// The game already started or finished and cannot be joined.
    #[error("game can no longer be joined")]
    NotJoinable,
    /// Automatic mode needs a player on the clock for each question.
    #[error("automatic mode requires a responder but the game has no players")]
    NoPlayers,
}

/// A point change produced by judging, for response payloads and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointAward {
    /// Player whose score changed.
    pub player_id: Uuid,
    /// Signed delta that was applied (before the zero floor).
    pub points: i32,
    /// The player's stored score after clamping.
    pub new_score: i32,
}

/// Result of judging an answer.
#[derive(Debug, Clone)]
pub struct JudgeOutcome {
    /// Partial update to merge into the record.
    pub patch: RecordPatch,
    /// Score change, if the policy awarded or deducted points.
    pub award: Option<PointAward>,
    /// Whether this judgement ended the question cycle (round advanced or
    /// game finished) rather than re-opening the buzzer.
    pub round_over: bool,
}

/// Add a player to a lobby, enforcing status and capacity.
pub fn join_game(record: &GameRecord, player: Player) -> Result<RecordPatch, CommandError> {
    if record.status != GameStatus::Lobby {
        return Err(CommandError::NotJoinable);
    }
    if !record.settings.max_players.admits(record.players.len()) {
        return Err(CommandError::GameFull);
    }

    Ok(RecordPatch {
        players: vec![player],
        ..Default::default()
    })
}

/// One-way, one-time transition out of the lobby.
pub fn start_game(record: &GameRecord) -> Result<RecordPatch, CommandError> {
    if record.status != GameStatus::Lobby {
        return Err(CommandError::InvalidStatus {
            command: "start-game",
            status: record.status,
        });
    }

    Ok(RecordPatch {
        status: Some(GameStatus::Playing),
        round: Some(1),
        ..Default::default()
    })
}

/// Post a freshly generated question, entering the mode-appropriate phase.
///
/// `on_the_clock` is the service-picked random responder; it is required in
/// automatic mode and ignored in buzzer mode.
pub fn post_question(
    record: &GameRecord,
    question: Question,
    on_the_clock: Option<Uuid>,
) -> Result<RecordPatch, CommandError> {
    if record.status != GameStatus::Playing {
        return Err(CommandError::InvalidStatus {
            command: "post-question",
            status: record.status,
        });
    }

    let patch = match record.settings.turn_mode {
        TurnMode::Automatic => {
            let responder = on_the_clock.ok_or(CommandError::NoPlayers)?;
            if !record.players.contains_key(&responder) {
                return Err(CommandError::UnknownPlayer {
                    player_id: responder,
                });
            }
            RecordPatch {
                current_question: Some(Some(question)),
                current_player_turn: Some(Some(responder)),
                buzzer_pressed: Some(None),
                players_waiting: Some(Vec::new()),
                first_buzzer_press: Some(false),
                correct_answers_this_round: Some(Vec::new()),
                ..Default::default()
            }
        }
        TurnMode::Buzzer => RecordPatch {
            status: Some(GameStatus::WaitingForBuzzer),
            current_question: Some(Some(question)),
            current_player_turn: Some(None),
            buzzer_pressed: Some(None),
            players_waiting: Some(Vec::new()),
            first_buzzer_press: Some(false),
            correct_answers_this_round: Some(Vec::new()),
            ..Default::default()
        },
    };

    Ok(patch)
}

/// Claim buzzer priority. First claim wins; any later or stale claim resolves
/// to `Ok(None)` so racing clients see a harmless no-op instead of an error.
pub fn press_buzzer(
    record: &GameRecord,
    player_id: Uuid,
) -> Result<Option<RecordPatch>, CommandError> {
    if !record.players.contains_key(&player_id) {
        return Err(CommandError::UnknownPlayer { player_id });
    }

    // Someone already won the race, or the round moved on under this client.
    if record.status != GameStatus::WaitingForBuzzer || record.buzzer_pressed.is_some() {
        return Ok(None);
    }

    // A player who already burned their attempt cannot re-claim.
    if record.players_waiting.contains(&player_id) {
        return Ok(None);
    }

    Ok(Some(claim_patch(player_id)))
}

/// Moderator designates the claimant instead of a self-press race.
pub fn moderator_select_player(
    record: &GameRecord,
    player_id: Uuid,
) -> Result<RecordPatch, CommandError> {
    if record.status != GameStatus::WaitingForBuzzer {
        return Err(CommandError::InvalidStatus {
            command: "select-player",
            status: record.status,
        });
    }
    if record.settings.buzzer_mode != BuzzerMode::ModeratorSelect {
        return Err(CommandError::WrongBuzzerMode);
    }
    if !record.players.contains_key(&player_id) {
        return Err(CommandError::UnknownPlayer { player_id });
    }
    if record.players_waiting.contains(&player_id) {
        return Err(CommandError::AlreadyAttempted { player_id });
    }

    Ok(claim_patch(player_id))
}

fn claim_patch(player_id: Uuid) -> RecordPatch {
    RecordPatch {
        status: Some(GameStatus::Playing),
        buzzer_pressed: Some(Some(player_id)),
        current_player_turn: Some(Some(player_id)),
        first_buzzer_press: Some(true),
        ..Default::default()
    }
}

/// Judge the turn holder's answer, applying the scoring policy and either
/// advancing the round or re-opening the buzzer.
pub fn judge_answer(
    record: &GameRecord,
    correct: bool,
    table: &ScoringTable,
) -> Result<JudgeOutcome, CommandError> {
    if record.status != GameStatus::Playing {
        return Err(CommandError::InvalidStatus {
            command: "judge-answer",
            status: record.status,
        });
    }
    if record.current_question.is_none() {
        return Err(CommandError::NoActiveQuestion);
    }
    let responder = record.current_player_turn.ok_or(CommandError::NoTurnHolder)?;
    let player = record
        .players
        .get(&responder)
        .ok_or(CommandError::UnknownPlayer {
            player_id: responder,
        })?;

    if correct {
        // Rank against the pre-advance state: attempts and answers recorded
        // for this question decide whether the full bonus is still available.
        let rank = scoring::rank_for_correct(record);
        let points = table.correct_award(rank);
        let new_score = scoring::clamped_score(player.score, points);

        let mut patch = advance_round(record);
        patch.players.push(Player {
            score: new_score,
            ..player.clone()
        });

        return Ok(JudgeOutcome {
            patch,
            award: Some(PointAward {
                player_id: responder,
                points,
                new_score,
            }),
            round_over: true,
        });
    }

    match record.settings.turn_mode {
        // No retry loop without a buzzer: a miss ends the round.
        TurnMode::Automatic => Ok(JudgeOutcome {
            patch: advance_round(record),
            award: None,
            round_over: true,
        }),
        TurnMode::Buzzer => {
            let points = table.wrong_penalty;
            let new_score = scoring::clamped_score(player.score, points);
            let penalised = Player {
                score: new_score,
                ..player.clone()
            };

            let mut waiting = record.players_waiting.clone();
            if !waiting.contains(&responder) {
                waiting.push(responder);
            }

            let anyone_left = record
                .players
                .keys()
                .any(|id| !waiting.contains(id));

            let mut patch = if anyone_left {
                // Re-open the race for everyone who has not attempted yet.
                // `first_buzzer_press` stays true so the next claimant cannot
                // earn the first-correct bonus.
                RecordPatch {
                    status: Some(GameStatus::WaitingForBuzzer),
                    buzzer_pressed: Some(None),
                    current_player_turn: Some(None),
                    players_waiting: Some(waiting),
                    ..Default::default()
                }
            } else {
                advance_round(record)
            };
            let round_over = !anyone_left;
            patch.players.push(penalised);

            Ok(JudgeOutcome {
                patch,
                award: Some(PointAward {
                    player_id: responder,
                    points,
                    new_score,
                }),
                round_over,
            })
        }
    }
}

/// Everyone concedes the current buzzer question: advance without scoring.
pub fn buzzer_give_up(record: &GameRecord) -> Result<RecordPatch, CommandError> {
    if !matches!(
        record.status,
        GameStatus::Playing | GameStatus::WaitingForBuzzer
    ) {
        return Err(CommandError::InvalidStatus {
            command: "give-up",
            status: record.status,
        });
    }

    Ok(advance_round(record))
}

/// Discard the current question without burning a round (for broken or
/// repeated questions). The record returns to `Playing` with no question
/// posted, the same window that follows a round advance.
pub fn skip_question(record: &GameRecord) -> Result<RecordPatch, CommandError> {
    if !matches!(
        record.status,
        GameStatus::Playing | GameStatus::WaitingForBuzzer
    ) {
        return Err(CommandError::InvalidStatus {
            command: "skip-question",
            status: record.status,
        });
    }

    Ok(RecordPatch {
        status: Some(GameStatus::Playing),
        current_question: Some(None),
        current_player_turn: Some(None),
        buzzer_pressed: Some(None),
        players_waiting: Some(Vec::new()),
        first_buzzer_press: Some(false),
        correct_answers_this_round: Some(Vec::new()),
        ..Default::default()
    })
}

/// Finish the game early from any non-terminal status.
pub fn end_game(record: &GameRecord) -> Result<RecordPatch, CommandError> {
    if record.is_finished() {
        return Err(CommandError::InvalidStatus {
            command: "end-game",
            status: record.status,
        });
    }

    Ok(RecordPatch {
        status: Some(GameStatus::Finished),
        current_question: Some(None),
        current_player_turn: Some(None),
        buzzer_pressed: Some(None),
        players_waiting: Some(Vec::new()),
        first_buzzer_press: Some(false),
        correct_answers_this_round: Some(Vec::new()),
        ..Default::default()
    })
}

/// Shared round-advance sub-procedure.
///
/// Clears all per-question tracking; past the configured round count the game
/// finishes, otherwise the record returns to `Playing` and waits for the
/// caller to trigger generation of the next question (which may lag, so
/// `Playing` with no question is a legal window).
pub fn advance_round(record: &GameRecord) -> RecordPatch {
    let new_round = record.round + 1;
    let status = if new_round > record.settings.rounds_per_game {
        GameStatus::Finished
    } else {
        GameStatus::Playing
    };

    RecordPatch {
        status: Some(status),
        round: if status == GameStatus::Finished {
            None
        } else {
            Some(new_round)
        },
        current_question: Some(None),
        current_player_turn: Some(None),
        buzzer_pressed: Some(None),
        players_waiting: Some(Vec::new()),
        first_buzzer_press: Some(false),
        correct_answers_this_round: Some(Vec::new()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::record::{
        Category, Difficulty, GameSettings, MaxPlayers,
    };

    fn settings(turn_mode: TurnMode, rounds: u32) -> GameSettings {
        GameSettings {
            max_players: MaxPlayers::Limit(4),
            rounds_per_game: rounds,
            categories: vec![Category::Geography],
            turn_mode,
            difficulty: Difficulty::Easy,
            buzzer_mode: BuzzerMode::PlayerPress,
            time_per_question: None,
        }
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            category: Category::Geography,
            difficulty: Difficulty::Easy,
            prompt: "Longest river in the world?".into(),
            answer: "The Amazon".into(),
            fun_fact: Some("Over 7,000 km long".into()),
        }
    }

    fn lobby_with_players(turn_mode: TurnMode, rounds: u32, names: &[&str]) -> GameRecord {
        let mut record = GameRecord::new(
            Uuid::new_v4(),
            "XYZ789".into(),
            settings(turn_mode, rounds),
        );
        for name in names {
            let player = Player::new((*name).into());
            record.players.insert(player.id, player);
        }
        record
    }

    fn player_ids(record: &GameRecord) -> Vec<Uuid> {
        record.players.keys().copied().collect()
    }

    #[test]
    fn start_game_requires_lobby() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &["Ada"]);
        let patch = start_game(&record).unwrap();
        record.apply(patch);
        assert_eq!(record.status, GameStatus::Playing);
        assert_eq!(record.round, 1);

        // One-way, one-time: a second start is rejected.
        assert_eq!(
            start_game(&record),
            Err(CommandError::InvalidStatus {
                command: "start-game",
                status: GameStatus::Playing,
            })
        );
    }

    #[test]
    fn join_rejects_full_lobby() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &[]);
        record.settings.max_players = MaxPlayers::Limit(2);
        for name in ["Ada", "Grace"] {
            let patch = join_game(&record, Player::new(name.into())).unwrap();
            record.apply(patch);
        }

        let err = join_game(&record, Player::new("Edsger".into())).unwrap_err();
        assert_eq!(err, CommandError::GameFull);
        assert_eq!(record.players.len(), 2);
    }

    #[test]
    fn join_unlimited_never_fills() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &[]);
        record.settings.max_players = MaxPlayers::Unlimited;
        for i in 0..50 {
            let patch = join_game(&record, Player::new(format!("p{i}"))).unwrap();
            record.apply(patch);
        }
        assert_eq!(record.players.len(), 50);
    }

    #[test]
    fn join_rejects_started_game() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &["Ada"]);
        record.apply(start_game(&record).unwrap());

        assert_eq!(
            join_game(&record, Player::new("Late".into())),
            Err(CommandError::NotJoinable)
        );
    }

    #[test]
    fn automatic_post_puts_responder_on_the_clock() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());
        let responder = player_ids(&record)[0];

        let patch = post_question(&record, question("geo-001"), Some(responder)).unwrap();
        record.apply(patch);

        assert_eq!(record.status, GameStatus::Playing);
        assert_eq!(record.current_player_turn, Some(responder));
        assert!(record.current_question.is_some());
        assert!(record.check_invariants().is_ok());
    }

    #[test]
    fn buzzer_post_opens_the_race() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());

        let patch = post_question(&record, question("geo-001"), None).unwrap();
        record.apply(patch);

        assert_eq!(record.status, GameStatus::WaitingForBuzzer);
        assert_eq!(record.current_player_turn, None);
        assert_eq!(record.buzzer_pressed, None);
        assert!(!record.first_buzzer_press);
    }

    #[test]
    fn first_press_wins_and_later_presses_are_noops() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada", "Grace", "Edsger"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);

        let patch = press_buzzer(&record, ids[0]).unwrap().expect("first claim");
        record.apply(patch);
        assert_eq!(record.status, GameStatus::Playing);
        assert_eq!(record.buzzer_pressed, Some(ids[0]));
        assert_eq!(record.current_player_turn, Some(ids[0]));
        assert!(record.first_buzzer_press);

        // The race is decided; everyone else resolves to a silent no-op.
        assert_eq!(press_buzzer(&record, ids[1]).unwrap(), None);
        assert_eq!(press_buzzer(&record, ids[2]).unwrap(), None);
        assert_eq!(record.buzzer_pressed, Some(ids[0]));
    }

    #[test]
    fn press_by_unknown_player_is_rejected() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());

        let ghost = Uuid::new_v4();
        assert_eq!(
            press_buzzer(&record, ghost),
            Err(CommandError::UnknownPlayer { player_id: ghost })
        );
    }

    #[test]
    fn correct_answer_awards_first_bonus_and_advances() {
        let mut record = lobby_with_players(TurnMode::Automatic, 1, &["Ada"]);
        record.apply(start_game(&record).unwrap());
        let ada = player_ids(&record)[0];
        record.apply(post_question(&record, question("geo-001"), Some(ada)).unwrap());

        let outcome = judge_answer(&record, true, &ScoringTable::default()).unwrap();
        record.apply(outcome.patch);

        let award = outcome.award.unwrap();
        assert_eq!(award.points, 10);
        assert_eq!(record.players[&ada].score, 10);
        // rounds_per_game = 1, so the advance terminates the game.
        assert_eq!(record.status, GameStatus::Finished);
        assert_eq!(record.current_question, None);
        assert_eq!(record.current_player_turn, None);
        assert!(record.check_invariants().is_ok());
    }

    #[test]
    fn automatic_miss_advances_without_scoring() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());
        let ada = player_ids(&record)[0];
        record.apply(post_question(&record, question("geo-001"), Some(ada)).unwrap());

        let outcome = judge_answer(&record, false, &ScoringTable::default()).unwrap();
        assert!(outcome.award.is_none());
        assert!(outcome.round_over);
        record.apply(outcome.patch);

        assert_eq!(record.round, 2);
        assert_eq!(record.status, GameStatus::Playing);
        assert_eq!(record.players[&ada].score, 0);
    }

    #[test]
    fn wrong_buzzer_answer_penalises_and_reopens() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada", "Grace", "Edsger"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);

        record.apply(press_buzzer(&record, ids[0]).unwrap().unwrap());
        let outcome = judge_answer(&record, false, &ScoringTable::default()).unwrap();
        assert!(!outcome.round_over);
        record.apply(outcome.patch);

        // Penalty floors at zero for a fresh player.
        assert_eq!(record.players[&ids[0]].score, 0);
        assert_eq!(record.status, GameStatus::WaitingForBuzzer);
        assert_eq!(record.buzzer_pressed, None);
        assert_eq!(record.players_waiting, vec![ids[0]]);
        // The first-press flag survives the re-open.
        assert!(record.first_buzzer_press);

        // The failed claimant cannot re-claim this question.
        assert_eq!(press_buzzer(&record, ids[0]).unwrap(), None);
    }

    #[test]
    fn retry_after_wrong_answer_earns_subsequent_points() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada", "Grace", "Edsger"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);

        record.apply(press_buzzer(&record, ids[0]).unwrap().unwrap());
        record.apply(
            judge_answer(&record, false, &ScoringTable::default())
                .unwrap()
                .patch,
        );

        record.apply(press_buzzer(&record, ids[1]).unwrap().unwrap());
        let outcome = judge_answer(&record, true, &ScoringTable::default()).unwrap();
        let award = outcome.award.unwrap();
        record.apply(outcome.patch);

        // The first-correct bonus went up in smoke with the first claimant.
        assert_eq!(award.points, 8);
        assert_eq!(record.players[&ids[1]].score, 8);
        assert_eq!(record.round, 2);
    }

    #[test]
    fn all_failed_buzzer_race_advances_the_round() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);

        for id in &ids {
            record.apply(press_buzzer(&record, *id).unwrap().unwrap());
            let outcome = judge_answer(&record, false, &ScoringTable::default()).unwrap();
            record.apply(outcome.patch);
        }

        assert_eq!(record.round, 2);
        assert_eq!(record.status, GameStatus::Playing);
        assert!(record.players_waiting.is_empty());
        assert!(!record.first_buzzer_press);
    }

    #[test]
    fn moderator_select_requires_matching_mode() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 3, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);

        assert_eq!(
            moderator_select_player(&record, ids[0]),
            Err(CommandError::WrongBuzzerMode)
        );

        record.settings.buzzer_mode = BuzzerMode::ModeratorSelect;
        let patch = moderator_select_player(&record, ids[0]).unwrap();
        record.apply(patch);
        assert_eq!(record.current_player_turn, Some(ids[0]));
        assert_eq!(record.status, GameStatus::Playing);
    }

    #[test]
    fn give_up_advances_without_scoring() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 2, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());

        record.apply(buzzer_give_up(&record).unwrap());

        assert_eq!(record.round, 2);
        assert_eq!(record.status, GameStatus::Playing);
        assert!(record.players.values().all(|p| p.score == 0));
    }

    #[test]
    fn skip_clears_question_but_keeps_the_round() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &["Ada"]);
        record.apply(start_game(&record).unwrap());
        let ada = player_ids(&record)[0];
        record.apply(post_question(&record, question("geo-001"), Some(ada)).unwrap());

        record.apply(skip_question(&record).unwrap());

        assert_eq!(record.round, 1);
        assert_eq!(record.status, GameStatus::Playing);
        assert_eq!(record.current_question, None);
        assert_eq!(record.current_player_turn, None);
    }

    #[test]
    fn end_game_is_terminal_and_absorbing() {
        let mut record = lobby_with_players(TurnMode::Automatic, 3, &["Ada"]);
        record.apply(start_game(&record).unwrap());
        record.apply(end_game(&record).unwrap());
        assert_eq!(record.status, GameStatus::Finished);

        // Every mutating command is refused (or a no-op) from here.
        assert!(end_game(&record).is_err());
        assert!(start_game(&record).is_err());
        assert!(buzzer_give_up(&record).is_err());
        assert!(skip_question(&record).is_err());
        assert!(judge_answer(&record, true, &ScoringTable::default()).is_err());
        let ada = player_ids(&record)[0];
        assert_eq!(press_buzzer(&record, ada).unwrap(), None);
    }

    #[test]
    fn round_counter_never_decreases() {
        let mut record = lobby_with_players(TurnMode::Automatic, 4, &["Ada"]);
        record.apply(start_game(&record).unwrap());
        let ada = player_ids(&record)[0];
        let mut last_round = record.round;

        for i in 0..4 {
            record.apply(post_question(&record, question(&format!("q{i}")), Some(ada)).unwrap());
            let outcome = judge_answer(&record, i % 2 == 0, &ScoringTable::default()).unwrap();
            record.apply(outcome.patch);
            assert!(record.round >= last_round);
            last_round = record.round;
        }

        assert_eq!(record.status, GameStatus::Finished);
    }

    #[test]
    fn terminal_advance_clears_question_fields() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 1, &["Ada", "Grace"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);
        record.apply(press_buzzer(&record, ids[0]).unwrap().unwrap());

        let outcome = judge_answer(&record, true, &ScoringTable::default()).unwrap();
        record.apply(outcome.patch);

        assert_eq!(record.status, GameStatus::Finished);
        assert_eq!(record.current_question, None);
        assert_eq!(record.current_player_turn, None);
        assert_eq!(record.buzzer_pressed, None);
        assert!(record.check_invariants().is_ok());
    }

    #[test]
    fn first_bonus_is_awarded_at_most_once_per_question() {
        let mut record = lobby_with_players(TurnMode::Buzzer, 5, &["A", "B", "C", "D"]);
        record.apply(start_game(&record).unwrap());
        record.apply(post_question(&record, question("geo-001"), None).unwrap());
        let ids = player_ids(&record);

        let mut awards = Vec::new();
        // Three players miss, the fourth finally answers correctly.
        for (index, id) in ids.iter().enumerate() {
            record.apply(press_buzzer(&record, *id).unwrap().unwrap());
            let correct = index == ids.len() - 1;
            let outcome = judge_answer(&record, correct, &ScoringTable::default()).unwrap();
            if correct {
                awards.push(outcome.award.unwrap().points);
            }
            record.apply(outcome.patch);
        }

        assert_eq!(awards, vec![8]);
        let full_bonus = awards.iter().filter(|p| **p == 10).count();
        assert_eq!(full_bonus, 0);
    }
}
