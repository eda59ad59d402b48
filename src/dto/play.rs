//! Payloads for the moderator- and player-side gameplay commands.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::game::QuestionSummary,
    state::{machine::PointAward, record::GameStatus},
};

/// Generic acknowledgement for commands with no richer payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl ActionResponse {
    /// Build an acknowledgement with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response to posting the next question.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostQuestionResponse {
    /// The question that was posted, answer included (moderator-side).
    pub question: QuestionSummary,
    /// The randomly drawn responder, in automatic mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_the_clock: Option<Uuid>,
}

/// Moderator verdict on the current answer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JudgeRequest {
    /// Whether the answer was correct.
    pub correct: bool,
}

/// Score change applied by a judgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct AwardSummary {
    /// Player whose score changed.
    pub player_id: Uuid,
    /// Signed delta before the zero floor.
    pub points: i32,
    /// Stored score after clamping.
    pub new_score: i32,
}

impl From<PointAward> for AwardSummary {
    fn from(award: PointAward) -> Self {
        Self {
            player_id: award.player_id,
            points: award.points,
            new_score: award.new_score,
        }
    }
}

/// Response to a judgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct JudgeResponse {
    /// Score change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award: Option<AwardSummary>,
    /// Whether the question cycle ended (as opposed to the buzzer re-opening).
    pub round_over: bool,
    /// Status after the merge.
    pub status: GameStatus,
    /// Round counter after the merge.
    pub round: u32,
}

/// A player claiming buzzer priority.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BuzzRequest {
    /// The pressing player.
    pub player_id: Uuid,
}

/// Outcome of a buzzer press. Losing the race is a success, not an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzResponse {
    /// Whether this press won priority.
    pub claimed: bool,
}

/// Moderator designating the claimant manually.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectPlayerRequest {
    /// The designated player.
    pub player_id: Uuid,
}
