//! Question supply: the oracle abstraction and its per-game anti-repeat
//! bookkeeping.
//!
//! The oracle is an opaque, possibly slow, possibly failing collaborator; the
//! service layer wraps it with a timeout and a fallback to the static bank so
//! a stalled generation call never blocks game progression.

pub mod bank;
#[cfg(feature = "ai-oracle")]
pub mod gemini;

use std::collections::HashSet;

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::state::record::{Category, Difficulty, Question};

/// Result alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Failures a question oracle can produce.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Every question matching the request was already served this game.
    #[error("question pool exhausted for {category:?} at {difficulty:?}")]
    PoolExhausted {
        /// Requested category.
        category: Category,
        /// Requested difficulty.
        difficulty: Difficulty,
    },
    /// The generation API could not be reached.
    #[cfg(feature = "ai-oracle")]
    #[error("failed to reach the question generation API")]
    Request {
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The generation API answered with an unexpected status.
    #[cfg(feature = "ai-oracle")]
    #[error("question generation API returned status {status}")]
    Status {
        /// Status the API answered with.
        status: reqwest::StatusCode,
    },
    /// The generated payload could not be turned into a question.
    #[error("malformed generated question: {reason}")]
    Malformed {
        /// What was wrong with the payload.
        reason: String,
    },
}

/// A single question request, carrying the ids already served to the game so
/// the oracle can avoid repeats.
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    /// Category to draw from.
    pub category: Category,
    /// Difficulty to generate at.
    pub difficulty: Difficulty,
    /// Question ids already served within this game.
    pub exclude: Vec<String>,
}

/// Supplier of trivia content: static bank, templated generator, or an
/// AI-backed service.
pub trait QuestionOracle: Send + Sync {
    /// Produce one question for the request.
    fn generate(&self, request: QuestionRequest) -> BoxFuture<'static, OracleResult<Question>>;
}

/// Per-game record of served question ids.
///
/// Process-local auxiliary state, deliberately outside the replicated record;
/// cleared when a game ends and reset when a pool runs dry.
#[derive(Default)]
pub struct ServedQuestions {
    served: DashMap<Uuid, HashSet<String>>,
}

impl ServedQuestions {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids already served to the given game.
    pub fn snapshot(&self, game_id: Uuid) -> Vec<String> {
        self.served
            .get(&game_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record a question as served to the given game.
    pub fn mark(&self, game_id: Uuid, question_id: &str) {
        self.served
            .entry(game_id)
            .or_default()
            .insert(question_id.to_string());
    }

    /// Lifecycle hook: drop all tracking for a finished game.
    pub fn clear(&self, game_id: Uuid) {
        self.served.remove(&game_id);
    }
}
