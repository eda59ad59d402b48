//! Turn/scoring policy: one configurable point table consumed by a single
//! scoring function, shared by the automatic and buzzer turn modes.

use serde::{Deserialize, Serialize};

use crate::state::record::{GameRecord, TurnMode};

/// Point values applied when judging answers.
///
/// Collapses the scattered `+10`/`+8`/`-5` constants into one configuration
/// object so both turn modes delegate to the same policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringTable {
    /// Awarded to the first correct responder of a question.
    pub first_correct: i32,
    /// Awarded to correct responders after the first bonus is gone.
    pub subsequent_correct: i32,
    /// Applied (negative) to a wrong answer in buzzer mode.
    pub wrong_penalty: i32,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            first_correct: 10,
            subsequent_correct: 8,
            wrong_penalty: -5,
        }
    }
}

/// Position of a correct answer within the current question cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerRank {
    /// First correct answer for this question; earns the full bonus.
    First,
    /// Any later correct answer (after earlier attempts or answers).
    Subsequent,
}

impl ScoringTable {
    /// Points awarded for a correct answer at the given rank.
    pub fn correct_award(&self, rank: AnswerRank) -> i32 {
        match rank {
            AnswerRank::First => self.first_correct,
            AnswerRank::Subsequent => self.subsequent_correct,
        }
    }
}

/// Rank a correct answer against the record's per-question tracking.
///
/// In buzzer mode the full bonus belongs to the first claimant only: once any
/// player has attempted (and failed) the question, or anyone already answered
/// correctly, later correct answers rank `Subsequent`. Automatic mode ranks by
/// arrival order in `correct_answers_this_round`.
pub fn rank_for_correct(record: &GameRecord) -> AnswerRank {
    let first = match record.settings.turn_mode {
        TurnMode::Automatic => record.correct_answers_this_round.is_empty(),
        TurnMode::Buzzer => {
            record.players_waiting.is_empty() && record.correct_answers_this_round.is_empty()
        }
    };

    if first {
        AnswerRank::First
    } else {
        AnswerRank::Subsequent
    }
}

/// Apply a point delta to a stored score, clamping the result at zero.
///
/// Intermediate deltas may be negative (wrong-answer penalty) but the stored
/// value never is.
pub fn clamped_score(current: i32, delta: i32) -> i32 {
    (current + delta).max(0)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::record::{
        BuzzerMode, Category, Difficulty, GameRecord, GameSettings, MaxPlayers,
    };

    fn record(turn_mode: TurnMode) -> GameRecord {
        GameRecord::new(
            Uuid::new_v4(),
            "ABC123".into(),
            GameSettings {
                max_players: MaxPlayers::Unlimited,
                rounds_per_game: 3,
                categories: vec![Category::Music],
                turn_mode,
                difficulty: Difficulty::Easy,
                buzzer_mode: BuzzerMode::PlayerPress,
                time_per_question: None,
            },
        )
    }

    #[test]
    fn default_table_matches_game_rules() {
        let table = ScoringTable::default();
        assert_eq!(table.correct_award(AnswerRank::First), 10);
        assert_eq!(table.correct_award(AnswerRank::Subsequent), 8);
        assert_eq!(table.wrong_penalty, -5);
    }

    #[test]
    fn score_never_goes_negative() {
        let table = ScoringTable::default();
        let mut score = 3;
        for _ in 0..4 {
            score = clamped_score(score, table.wrong_penalty);
        }
        assert_eq!(score, 0);
    }

    #[test]
    fn clamp_only_affects_the_floor() {
        assert_eq!(clamped_score(7, -5), 2);
        assert_eq!(clamped_score(2, -5), 0);
        assert_eq!(clamped_score(0, 10), 10);
    }

    #[test]
    fn buzzer_first_claimant_ranks_first() {
        let rec = record(TurnMode::Buzzer);
        assert_eq!(rank_for_correct(&rec), AnswerRank::First);
    }

    #[test]
    fn buzzer_retry_after_failed_attempt_ranks_subsequent() {
        let mut rec = record(TurnMode::Buzzer);
        rec.players_waiting.push(Uuid::new_v4());
        assert_eq!(rank_for_correct(&rec), AnswerRank::Subsequent);
    }

    #[test]
    fn automatic_rank_follows_arrival_order() {
        let mut rec = record(TurnMode::Automatic);
        assert_eq!(rank_for_correct(&rec), AnswerRank::First);
        rec.correct_answers_this_round.push(Uuid::new_v4());
        assert_eq!(rank_for_correct(&rec), AnswerRank::Subsequent);
    }

    #[test]
    fn custom_table_is_honoured() {
        let table = ScoringTable {
            first_correct: 5,
            subsequent_correct: 3,
            wrong_penalty: -2,
        };
        assert_eq!(table.correct_award(AnswerRank::First), 5);
        assert_eq!(table.correct_award(AnswerRank::Subsequent), 3);
    }
}
