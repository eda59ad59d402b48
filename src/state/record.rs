//! Shared game record: the single replicated document that moderator, players,
//! and spectators all read and mutate through the command handlers.

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle phase of a game record.
///
/// `Finished` is absorbing: once reached, no command handler mutates the
/// record again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    /// Players are joining; the game has not started.
    Lobby,
    /// A round is in progress (a question may or may not be posted yet).
    Playing,
    /// A buzzer question is open and players race to claim priority.
    WaitingForBuzzer,
    /// Terminal state; the record is immutable from here on.
    Finished,
}

/// How the responder for each question is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TurnMode {
    /// The system picks a uniformly random player each round.
    Automatic,
    /// Players race for priority (or the moderator designates the claimant).
    Buzzer,
}

/// Sub-mode for buzzer games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BuzzerMode {
    /// Players press their own buzzer; first claim wins.
    PlayerPress,
    /// The moderator manually selects who buzzed first.
    ModeratorSelect,
}

/// Trivia category a question can be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Sports, athletes, teams, competitions.
    Sports,
    /// Music, artists, genres, songs.
    Music,
    /// Historical events, figures, dates.
    History,
    /// Science, inventions, discoveries.
    Science,
    /// Movies, series, celebrities, pop culture.
    Entertainment,
    /// Countries, cities, landmarks.
    Geography,
}

impl Category {
    /// Stable lowercase name, used in question ids and oracle prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sports => "sports",
            Category::Music => "music",
            Category::History => "history",
            Category::Science => "science",
            Category::Entertainment => "entertainment",
            Category::Geography => "geography",
        }
    }
}

/// Difficulty level requested from the question oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    /// Warm-up questions.
    Easy,
    /// The default level.
    Medium,
    /// For seasoned trivia crowds.
    Hard,
}

impl Difficulty {
    /// Stable lowercase name, used in question ids and oracle prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Player capacity of a lobby.
///
/// Serialized as a plain number, or `null` for the unlimited sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MaxPlayers {
    /// Capped at the given number of players.
    Limit(u32),
    /// No cap on the number of players.
    Unlimited,
}

impl MaxPlayers {
    /// Whether a lobby that currently holds `count` players can accept one more.
    pub fn admits(&self, count: usize) -> bool {
        match self {
            MaxPlayers::Unlimited => true,
            MaxPlayers::Limit(limit) => count < *limit as usize,
        }
    }
}

/// Immutable per-game configuration chosen at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Lobby capacity.
    pub max_players: MaxPlayers,
    /// Number of question cycles before the game finishes. Always >= 1.
    pub rounds_per_game: u32,
    /// Categories questions are drawn from. Never empty.
    pub categories: Vec<Category>,
    /// Responder selection mode.
    pub turn_mode: TurnMode,
    /// Difficulty requested from the oracle.
    pub difficulty: Difficulty,
    /// Buzzer sub-mode; only meaningful when `turn_mode` is `Buzzer`.
    pub buzzer_mode: BuzzerMode,
    /// Optional per-question time limit in seconds (display concern).
    pub time_per_question: Option<u32>,
}

/// A participant and their running score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identifier assigned at join time.
    pub id: Uuid,
    /// Display name, 1 to 20 characters.
    pub name: String,
    /// Current score. The stored value never goes below zero.
    pub score: i32,
    /// Whether the player is still connected (display concern).
    pub is_active: bool,
}

impl Player {
    /// Build a fresh player with a zero score.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            score: 0,
            is_active: true,
        }
    }
}

/// A single trivia question served by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique per served instance (includes a cache-busting suffix).
    pub id: String,
    /// Category the question belongs to.
    pub category: Category,
    /// Difficulty it was generated at.
    pub difficulty: Difficulty,
    /// The question text shown to players.
    pub prompt: String,
    /// The expected answer, shown to the moderator only.
    pub answer: String,
    /// Optional trivia nugget revealed after judging.
    pub fun_fact: Option<String>,
}

/// The replicated game document. One per game; the authoritative copy lives in
/// the record store and every connected client renders from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Opaque identifier, assigned at creation.
    pub id: Uuid,
    /// Short human-entered join code, unique among active games.
    pub code: String,
    /// Current lifecycle phase.
    pub status: GameStatus,
    /// Participants keyed by player id. Iteration order carries no meaning;
    /// display layers sort by score explicitly.
    pub players: IndexMap<Uuid, Player>,
    /// Question cycle counter, starts at 0 and only ever grows.
    pub round: u32,
    /// The active question, present only while one is being played.
    pub current_question: Option<Question>,
    /// Whoever currently holds the right to answer.
    pub current_player_turn: Option<Uuid>,
    /// The player holding buzzer priority for the current race.
    pub buzzer_pressed: Option<Uuid>,
    /// Players who already attempted and failed the current buzzer question.
    pub players_waiting: Vec<Uuid>,
    /// True once any player has taken buzzer priority for the current
    /// question, across however many wrong-answer retries occur.
    pub first_buzzer_press: bool,
    /// Players who answered correctly this question, in arrival order.
    pub correct_answers_this_round: Vec<Uuid>,
    /// Game configuration, immutable after creation.
    pub settings: GameSettings,
    /// Creator identity, stored for attribution only.
    pub moderator_id: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last merge timestamp.
    pub updated_at: SystemTime,
}

impl GameRecord {
    /// Build a fresh lobby record.
    pub fn new(moderator_id: Uuid, code: String, settings: GameSettings) -> Self {
        let timestamp = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            code,
            status: GameStatus::Lobby,
            players: IndexMap::new(),
            round: 0,
            current_question: None,
            current_player_turn: None,
            buzzer_pressed: None,
            players_waiting: Vec::new(),
            first_buzzer_press: false,
            correct_answers_this_round: Vec::new(),
            settings,
            moderator_id,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Whether the record reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Players who have not yet attempted the current buzzer question.
    pub fn remaining_buzzer_players(&self) -> Vec<Uuid> {
        self.players
            .keys()
            .filter(|id| !self.players_waiting.contains(id))
            .copied()
            .collect()
    }

    /// Merge a partial update into the record, refreshing `updated_at`.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(round) = patch.round {
            self.round = round;
        }
        if let Some(question) = patch.current_question {
            self.current_question = question;
        }
        if let Some(turn) = patch.current_player_turn {
            self.current_player_turn = turn;
        }
        if let Some(pressed) = patch.buzzer_pressed {
            self.buzzer_pressed = pressed;
        }
        if let Some(waiting) = patch.players_waiting {
            self.players_waiting = waiting;
        }
        if let Some(first) = patch.first_buzzer_press {
            self.first_buzzer_press = first;
        }
        if let Some(correct) = patch.correct_answers_this_round {
            self.correct_answers_this_round = correct;
        }
        for player in patch.players {
            self.players.insert(player.id, player);
        }
        self.updated_at = SystemTime::now();
    }

    /// Check the structural invariants the command handlers must preserve.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.current_question.is_some()
            && !matches!(
                self.status,
                GameStatus::Playing | GameStatus::WaitingForBuzzer
            )
        {
            return Err(InvariantViolation::QuestionOutsidePlay {
                status: self.status,
            });
        }

        if let Some(turn) = self.current_player_turn {
            if !self.players.contains_key(&turn) {
                return Err(InvariantViolation::UnknownTurnHolder { player_id: turn });
            }
        }

        if let Some(pressed) = self.buzzer_pressed {
            if !self.players.contains_key(&pressed) {
                return Err(InvariantViolation::UnknownBuzzerHolder { player_id: pressed });
            }
        }

        if let Some(unknown) = self
            .players_waiting
            .iter()
            .find(|id| !self.players.contains_key(*id))
        {
            return Err(InvariantViolation::UnknownWaitingPlayer {
                player_id: *unknown,
            });
        }

        Ok(())
    }
}

/// A record invariant that a merged state would break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A question is present outside the playing phases.
    #[error("question present while status is {status:?}")]
    QuestionOutsidePlay {
        /// Status the record was in.
        status: GameStatus,
    },
    /// The turn holder is not a known player.
    #[error("turn holder `{player_id}` is not part of this game")]
    UnknownTurnHolder {
        /// Offending player id.
        player_id: Uuid,
    },
    /// The buzzer holder is not a known player.
    #[error("buzzer holder `{player_id}` is not part of this game")]
    UnknownBuzzerHolder {
        /// Offending player id.
        player_id: Uuid,
    },
    /// The waiting list references an unknown player.
    #[error("waiting player `{player_id}` is not part of this game")]
    UnknownWaitingPlayer {
        /// Offending player id.
        player_id: Uuid,
    },
}

/// Partial update produced by a command handler and merged by the store.
///
/// Unset fields leave the stored value untouched; the double-`Option` fields
/// distinguish "leave as is" (`None`) from "clear" (`Some(None)`). Player
/// entries are upserted individually so concurrent score writes for different
/// players never clobber each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// New lifecycle phase.
    pub status: Option<GameStatus>,
    /// New round counter.
    pub round: Option<u32>,
    /// Set or clear the active question.
    pub current_question: Option<Option<Question>>,
    /// Set or clear the turn holder.
    pub current_player_turn: Option<Option<Uuid>>,
    /// Set or clear the buzzer priority holder.
    pub buzzer_pressed: Option<Option<Uuid>>,
    /// Replace the waiting list.
    pub players_waiting: Option<Vec<Uuid>>,
    /// Replace the first-press flag.
    pub first_buzzer_press: Option<bool>,
    /// Replace the ordered correct-answer list.
    pub correct_answers_this_round: Option<Vec<Uuid>>,
    /// Player entries to upsert.
    pub players: Vec<Player>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GameSettings {
        GameSettings {
            max_players: MaxPlayers::Limit(8),
            rounds_per_game: 5,
            categories: vec![Category::Science, Category::History],
            turn_mode: TurnMode::Buzzer,
            difficulty: Difficulty::Medium,
            buzzer_mode: BuzzerMode::PlayerPress,
            time_per_question: None,
        }
    }

    #[test]
    fn new_record_starts_in_lobby() {
        let record = GameRecord::new(Uuid::new_v4(), "ABC123".into(), settings());
        assert_eq!(record.status, GameStatus::Lobby);
        assert_eq!(record.round, 0);
        assert!(record.players.is_empty());
        assert!(record.check_invariants().is_ok());
    }

    #[test]
    fn patch_merge_distinguishes_clear_from_untouched() {
        let mut record = GameRecord::new(Uuid::new_v4(), "ABC123".into(), settings());
        let player = Player::new("Ada".into());
        let player_id = player.id;
        record.players.insert(player_id, player);
        record.status = GameStatus::Playing;
        record.current_player_turn = Some(player_id);

        // Untouched field stays.
        record.apply(RecordPatch {
            round: Some(2),
            ..Default::default()
        });
        assert_eq!(record.current_player_turn, Some(player_id));
        assert_eq!(record.round, 2);

        // Explicit clear removes it.
        record.apply(RecordPatch {
            current_player_turn: Some(None),
            ..Default::default()
        });
        assert_eq!(record.current_player_turn, None);
    }

    #[test]
    fn patch_upserts_players_individually() {
        let mut record = GameRecord::new(Uuid::new_v4(), "ABC123".into(), settings());
        let alice = Player::new("Alice".into());
        let bob = Player::new("Bob".into());
        record.players.insert(alice.id, alice.clone());
        record.players.insert(bob.id, bob.clone());

        let rescored = Player {
            score: 10,
            ..alice.clone()
        };
        record.apply(RecordPatch {
            players: vec![rescored],
            ..Default::default()
        });

        assert_eq!(record.players[&alice.id].score, 10);
        assert_eq!(record.players[&bob.id].score, 0);
        assert_eq!(record.players.len(), 2);
    }

    #[test]
    fn invariants_reject_question_outside_play() {
        let mut record = GameRecord::new(Uuid::new_v4(), "ABC123".into(), settings());
        record.current_question = Some(Question {
            id: "sci-001".into(),
            category: Category::Science,
            difficulty: Difficulty::Easy,
            prompt: "Closest planet to the sun?".into(),
            answer: "Mercury".into(),
            fun_fact: None,
        });

        assert_eq!(
            record.check_invariants(),
            Err(InvariantViolation::QuestionOutsidePlay {
                status: GameStatus::Lobby
            })
        );
    }

    #[test]
    fn invariants_reject_unknown_turn_holder() {
        let mut record = GameRecord::new(Uuid::new_v4(), "ABC123".into(), settings());
        let ghost = Uuid::new_v4();
        record.status = GameStatus::Playing;
        record.current_player_turn = Some(ghost);

        assert_eq!(
            record.check_invariants(),
            Err(InvariantViolation::UnknownTurnHolder { player_id: ghost })
        );
    }

    #[test]
    fn max_players_admits() {
        assert!(MaxPlayers::Unlimited.admits(10_000));
        assert!(MaxPlayers::Limit(2).admits(1));
        assert!(!MaxPlayers::Limit(2).admits(2));
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&GameStatus::WaitingForBuzzer).unwrap();
        assert_eq!(json, "\"waiting-for-buzzer\"");
    }

    #[test]
    fn max_players_serializes_unlimited_as_null() {
        assert_eq!(serde_json::to_string(&MaxPlayers::Unlimited).unwrap(), "null");
        assert_eq!(serde_json::to_string(&MaxPlayers::Limit(4)).unwrap(), "4");
        let parsed: MaxPlayers = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, MaxPlayers::Unlimited);
    }
}
