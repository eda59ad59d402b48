//! Static question bank, the always-available fallback oracle.

use std::sync::Arc;

use futures::future::BoxFuture;
use rand::seq::IndexedRandom;

use crate::{
    oracle::{OracleError, OracleResult, QuestionOracle, QuestionRequest},
    state::record::{Category, Difficulty, Question},
};

/// One configured bank entry. Ids are stable so per-game anti-repeat tracking
/// can recognise a question across serves.
#[derive(Debug, Clone)]
pub struct BankQuestion {
    /// Stable identifier, e.g. `sci-easy-01`.
    pub id: String,
    /// Category the entry belongs to.
    pub category: Category,
    /// Difficulty the entry is rated at.
    pub difficulty: Difficulty,
    /// Question text.
    pub prompt: String,
    /// Expected answer.
    pub answer: String,
    /// Optional trivia nugget.
    pub fun_fact: Option<String>,
}

impl BankQuestion {
    fn to_question(&self) -> Question {
        Question {
            id: self.id.clone(),
            category: self.category,
            difficulty: self.difficulty,
            prompt: self.prompt.clone(),
            answer: self.answer.clone(),
            fun_fact: self.fun_fact.clone(),
        }
    }
}

/// Oracle serving uniformly random questions from a fixed bank.
#[derive(Clone)]
pub struct BankOracle {
    entries: Arc<Vec<BankQuestion>>,
}

impl BankOracle {
    /// Build an oracle over the given entries.
    pub fn new(entries: Vec<BankQuestion>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    fn pick(&self, request: &QuestionRequest) -> OracleResult<Question> {
        let exact: Vec<&BankQuestion> = self
            .entries
            .iter()
            .filter(|entry| {
                entry.category == request.category && entry.difficulty == request.difficulty
            })
            .collect();

        // Small banks rarely cover every difficulty; fall back to the whole
        // category before giving up.
        let pool = if exact.is_empty() {
            self.entries
                .iter()
                .filter(|entry| entry.category == request.category)
                .collect()
        } else {
            exact
        };

        let candidates: Vec<&&BankQuestion> = pool
            .iter()
            .filter(|entry| !request.exclude.contains(&entry.id))
            .collect();

        candidates
            .choose(&mut rand::rng())
            .map(|entry| entry.to_question())
            .ok_or(OracleError::PoolExhausted {
                category: request.category,
                difficulty: request.difficulty,
            })
    }
}

impl QuestionOracle for BankOracle {
    fn generate(&self, request: QuestionRequest) -> BoxFuture<'static, OracleResult<Question>> {
        let oracle = self.clone();
        Box::pin(async move { oracle.pick(&request) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> BankOracle {
        BankOracle::new(vec![
            BankQuestion {
                id: "sci-easy-01".into(),
                category: Category::Science,
                difficulty: Difficulty::Easy,
                prompt: "Closest planet to the sun?".into(),
                answer: "Mercury".into(),
                fun_fact: None,
            },
            BankQuestion {
                id: "sci-easy-02".into(),
                category: Category::Science,
                difficulty: Difficulty::Easy,
                prompt: "What gas do plants breathe in?".into(),
                answer: "Carbon dioxide".into(),
                fun_fact: None,
            },
            BankQuestion {
                id: "sci-hard-01".into(),
                category: Category::Science,
                difficulty: Difficulty::Hard,
                prompt: "What particle carries the electromagnetic force?".into(),
                answer: "The photon".into(),
                fun_fact: None,
            },
        ])
    }

    fn request(difficulty: Difficulty, exclude: &[&str]) -> QuestionRequest {
        QuestionRequest {
            category: Category::Science,
            difficulty,
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn serves_from_the_matching_pool() {
        let question = bank()
            .generate(request(Difficulty::Easy, &[]))
            .await
            .unwrap();
        assert!(question.id.starts_with("sci-easy"));
    }

    #[tokio::test]
    async fn excluded_ids_are_never_served() {
        let oracle = bank();
        for _ in 0..20 {
            let question = oracle
                .generate(request(Difficulty::Easy, &["sci-easy-01"]))
                .await
                .unwrap();
            assert_eq!(question.id, "sci-easy-02");
        }
    }

    #[tokio::test]
    async fn exhausted_pool_is_an_error() {
        let err = bank()
            .generate(request(Difficulty::Easy, &["sci-easy-01", "sci-easy-02"]))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::PoolExhausted { .. }));
    }

    #[tokio::test]
    async fn unmatched_difficulty_falls_back_to_the_category() {
        let question = bank()
            .generate(QuestionRequest {
                category: Category::Science,
                difficulty: Difficulty::Medium,
                exclude: Vec::new(),
            })
            .await
            .unwrap();
        assert!(question.id.starts_with("sci-"));
    }
}
