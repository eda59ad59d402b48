//! Public projection of the game record, pushed to players and spectators.
//!
//! Mirrors the moderator summary minus anything that would spoil the round:
//! the answer and the fun fact stay server-side until the moderator reveals
//! them.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::game::{PlayerSummary, sorted_players},
    state::record::{Category, Difficulty, GameRecord, GameStatus, Question},
};

/// A question as players and spectators see it: no answer, no fun fact.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuestion {
    /// Served question id.
    pub id: String,
    /// Category it was drawn from.
    pub category: Category,
    /// Difficulty it was generated at.
    pub difficulty: Difficulty,
    /// Question text.
    pub prompt: String,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            category: question.category,
            difficulty: question.difficulty,
            prompt: question.prompt,
        }
    }
}

/// Snapshot of a game record for the public SSE stream.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicGameSnapshot {
    /// Record identifier.
    pub id: Uuid,
    /// Join code.
    pub code: String,
    /// Current lifecycle phase.
    pub status: GameStatus,
    /// Current round counter.
    pub round: u32,
    /// Configured number of rounds.
    pub rounds_per_game: u32,
    /// Players sorted by score, highest first.
    pub players: Vec<PlayerSummary>,
    /// Active question, spoiler-free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<PublicQuestion>,
    /// Current turn holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_turn: Option<Uuid>,
    /// Current buzzer priority holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buzzer_pressed: Option<Uuid>,
    /// Players locked out of the current buzzer question.
    pub players_waiting: Vec<Uuid>,
    /// Whether buzzer priority was ever taken for the current question.
    pub first_buzzer_press: bool,
}

impl From<GameRecord> for PublicGameSnapshot {
    fn from(record: GameRecord) -> Self {
        Self {
            id: record.id,
            code: record.code,
            status: record.status,
            round: record.round,
            rounds_per_game: record.settings.rounds_per_game,
            players: sorted_players(record.players.into_values().collect()),
            current_question: record.current_question.map(Into::into),
            current_player_turn: record.current_player_turn,
            buzzer_pressed: record.buzzer_pressed,
            players_waiting: record.players_waiting,
            first_buzzer_press: record.first_buzzer_press,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::record::{
        BuzzerMode, GameSettings, MaxPlayers, TurnMode,
    };

    #[test]
    fn snapshot_withholds_the_answer() {
        let mut record = GameRecord::new(
            Uuid::new_v4(),
            "ABC123".into(),
            GameSettings {
                max_players: MaxPlayers::Unlimited,
                rounds_per_game: 3,
                categories: vec![Category::Science],
                turn_mode: TurnMode::Automatic,
                difficulty: Difficulty::Easy,
                buzzer_mode: BuzzerMode::PlayerPress,
                time_per_question: None,
            },
        );
        record.status = GameStatus::Playing;
        record.current_question = Some(Question {
            id: "sci-easy-01".into(),
            category: Category::Science,
            difficulty: Difficulty::Easy,
            prompt: "Closest planet to the sun?".into(),
            answer: "Mercury".into(),
            fun_fact: Some("No atmosphere".into()),
        });

        let snapshot = PublicGameSnapshot::from(record);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("Closest planet"));
        assert!(!json.contains("Mercury"));
        assert!(!json.contains("atmosphere"));
    }
}
