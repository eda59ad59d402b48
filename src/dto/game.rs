//! Payloads for game creation, joining, and moderator projections.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_join_code, validate_player_name},
    },
    state::record::{
        BuzzerMode, Category, Difficulty, GameRecord, GameSettings, GameStatus, MaxPlayers,
        Player, Question, TurnMode,
    },
};

/// Game settings supplied when bootstrapping a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SettingsInput {
    /// Player cap; omit (or `null`) for an unlimited lobby.
    #[serde(default)]
    #[validate(range(min = 1, message = "max_players must be at least 1"))]
    pub max_players: Option<u32>,
    /// Number of question cycles to play.
    #[validate(range(min = 1, message = "a game needs at least one round"))]
    pub rounds_per_game: u32,
    /// Categories to draw questions from.
    #[validate(length(min = 1, message = "at least one category is required"))]
    pub categories: Vec<Category>,
    /// Responder selection mode.
    pub turn_mode: TurnMode,
    /// Difficulty requested from the oracle.
    pub difficulty: Difficulty,
    /// Buzzer sub-mode; defaults to self-press.
    #[serde(default)]
    pub buzzer_mode: Option<BuzzerMode>,
    /// Optional per-question time limit in seconds.
    #[serde(default)]
    pub time_per_question: Option<u32>,
}

impl From<SettingsInput> for GameSettings {
    fn from(value: SettingsInput) -> Self {
        Self {
            max_players: value
                .max_players
                .map(MaxPlayers::Limit)
                .unwrap_or(MaxPlayers::Unlimited),
            rounds_per_game: value.rounds_per_game,
            categories: value.categories,
            turn_mode: value.turn_mode,
            difficulty: value.difficulty,
            buzzer_mode: value.buzzer_mode.unwrap_or(BuzzerMode::PlayerPress),
            time_per_question: value.time_per_question,
        }
    }
}

/// Payload used to bootstrap a brand-new game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Game configuration, immutable afterwards.
    #[validate(nested)]
    pub settings: SettingsInput,
}

/// Summary returned once a game has been created.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateGameResponse {
    /// Identifier of the new record.
    pub game_id: Uuid,
    /// Join code to hand out to players.
    pub code: String,
    /// Generated moderator identity, kept by the creating client.
    pub moderator_id: Uuid,
}

/// Payload for a player joining by code.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinGameRequest {
    /// Join code shown by the moderator.
    pub code: String,
    /// Display name for the new player.
    pub name: String,
}

impl Validate for JoinGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_join_code(&self.code) {
            errors.add("code", e);
        }
        if let Err(e) = validate_player_name(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Identifiers handed back to a joining player.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGameResponse {
    /// Game the player joined.
    pub game_id: Uuid,
    /// Generated identity for the new player.
    pub player_id: Uuid,
}

/// Query parameters for the spectator lookup endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupQuery {
    /// Join code to resolve.
    pub code: String,
}

impl Validate for LookupQuery {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_join_code(&self.code) {
            errors.add("code", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Resolution of a join code for spectators.
#[derive(Debug, Serialize, ToSchema)]
pub struct LookupResponse {
    /// Matching active game.
    pub game_id: Uuid,
    /// Its current status.
    pub status: GameStatus,
}

/// Public projection of a player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current score.
    pub score: i32,
    /// Whether the player is still connected.
    pub is_active: bool,
}

impl From<Player> for PlayerSummary {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            name: player.name,
            score: player.score,
            is_active: player.is_active,
        }
    }
}

/// Moderator-side projection of a question, answer included.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    /// Served question id.
    pub id: String,
    /// Category it was drawn from.
    pub category: Category,
    /// Difficulty it was generated at.
    pub difficulty: Difficulty,
    /// Question text.
    pub prompt: String,
    /// Expected answer.
    pub answer: String,
    /// Optional trivia nugget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fun_fact: Option<String>,
}

impl From<Question> for QuestionSummary {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            category: question.category,
            difficulty: question.difficulty,
            prompt: question.prompt,
            answer: question.answer,
            fun_fact: question.fun_fact,
        }
    }
}

/// Read-only projection of the configured settings.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsSummary {
    /// Player cap; `null` means unlimited.
    pub max_players: Option<u32>,
    /// Number of question cycles.
    pub rounds_per_game: u32,
    /// Configured categories.
    pub categories: Vec<Category>,
    /// Responder selection mode.
    pub turn_mode: TurnMode,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Buzzer sub-mode.
    pub buzzer_mode: BuzzerMode,
    /// Optional per-question time limit in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_per_question: Option<u32>,
}

impl From<GameSettings> for SettingsSummary {
    fn from(settings: GameSettings) -> Self {
        Self {
            max_players: match settings.max_players {
                MaxPlayers::Unlimited => None,
                MaxPlayers::Limit(limit) => Some(limit),
            },
            rounds_per_game: settings.rounds_per_game,
            categories: settings.categories,
            turn_mode: settings.turn_mode,
            difficulty: settings.difficulty,
            buzzer_mode: settings.buzzer_mode,
            time_per_question: settings.time_per_question,
        }
    }
}

/// Full moderator-side projection of a game record.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    /// Record identifier.
    pub id: Uuid,
    /// Join code.
    pub code: String,
    /// Current lifecycle phase.
    pub status: GameStatus,
    /// Current round counter.
    pub round: u32,
    /// Players sorted by score, highest first.
    pub players: Vec<PlayerSummary>,
    /// Active question, answer included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionSummary>,
    /// Current turn holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_turn: Option<Uuid>,
    /// Current buzzer priority holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buzzer_pressed: Option<Uuid>,
    /// Players who already attempted the current question.
    pub players_waiting: Vec<Uuid>,
    /// Whether buzzer priority was ever taken for the current question.
    pub first_buzzer_press: bool,
    /// Configured settings.
    pub settings: SettingsSummary,
    /// Creator identity.
    pub moderator_id: Uuid,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 last-update timestamp.
    pub updated_at: String,
}

impl From<GameRecord> for GameSummary {
    fn from(record: GameRecord) -> Self {
        Self {
            id: record.id,
            code: record.code,
            status: record.status,
            round: record.round,
            players: sorted_players(record.players.into_values().collect()),
            current_question: record.current_question.map(Into::into),
            current_player_turn: record.current_player_turn,
            buzzer_pressed: record.buzzer_pressed,
            players_waiting: record.players_waiting,
            first_buzzer_press: record.first_buzzer_press,
            settings: record.settings.into(),
            moderator_id: record.moderator_id,
            created_at: format_system_time(record.created_at),
            updated_at: format_system_time(record.updated_at),
        }
    }
}

/// Sort players for display: the record's map order carries no meaning, so
/// projections rank by score, ties broken by name.
pub(crate) fn sorted_players(players: Vec<Player>) -> Vec<PlayerSummary> {
    let mut players = players;
    players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    players.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_input_unlimited_when_omitted() {
        let input: SettingsInput = serde_json::from_str(
            r#"{
                "rounds_per_game": 3,
                "categories": ["science"],
                "turn_mode": "buzzer",
                "difficulty": "easy"
            }"#,
        )
        .unwrap();
        let settings: GameSettings = input.into();
        assert_eq!(settings.max_players, MaxPlayers::Unlimited);
        assert_eq!(settings.buzzer_mode, BuzzerMode::PlayerPress);
    }

    #[test]
    fn players_sort_by_score_desc() {
        let mut alice = Player::new("Alice".into());
        alice.score = 8;
        let mut bob = Player::new("Bob".into());
        bob.score = 18;
        let mut carol = Player::new("Carol".into());
        carol.score = 8;

        let sorted = sorted_players(vec![alice, bob, carol]);
        let names: Vec<&str> = sorted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);
    }

    #[test]
    fn create_request_validation_catches_bad_settings() {
        let request = CreateGameRequest {
            settings: SettingsInput {
                max_players: Some(0),
                rounds_per_game: 0,
                categories: Vec::new(),
                turn_mode: TurnMode::Automatic,
                difficulty: Difficulty::Easy,
                buzzer_mode: None,
                time_per_question: None,
            },
        };
        assert!(request.validate().is_err());
    }
}
