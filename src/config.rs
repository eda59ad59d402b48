//! Application-level configuration loading: scoring table, oracle timeout,
//! and the fallback question bank.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    oracle::bank::BankQuestion,
    state::{
        record::{Category, Difficulty},
        scoring::ScoringTable,
    },
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_PARTY_CONFIG_PATH";
/// Deadline for a single oracle call before falling back to the bank.
const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Point values applied by the judging flow.
    pub scoring: ScoringTable,
    /// Deadline for question generation calls.
    pub oracle_timeout: Duration,
    /// Fallback question bank entries.
    pub questions: Vec<BankQuestion>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        questions = config.questions.len(),
                        "loaded configuration from file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringTable::default(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            questions: default_questions(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file. Every section is optional;
/// omitted sections keep their built-in defaults.
struct RawConfig {
    scoring: Option<ScoringTable>,
    oracle_timeout_secs: Option<u64>,
    questions: Option<Vec<RawQuestion>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let questions = value
            .questions
            .map(|entries| {
                entries
                    .into_iter()
                    .map(BankQuestion::from)
                    .collect::<Vec<_>>()
            })
            .filter(|entries| !entries.is_empty())
            .unwrap_or(defaults.questions);

        Self {
            scoring: value.scoring.unwrap_or(defaults.scoring),
            oracle_timeout: value
                .oracle_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.oracle_timeout),
            questions,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single bank entry.
struct RawQuestion {
    id: String,
    category: Category,
    difficulty: Difficulty,
    prompt: String,
    answer: String,
    #[serde(default)]
    fun_fact: Option<String>,
}

impl From<RawQuestion> for BankQuestion {
    fn from(value: RawQuestion) -> Self {
        Self {
            id: value.id,
            category: value.category,
            difficulty: value.difficulty,
            prompt: value.prompt,
            answer: value.answer,
            fun_fact: value.fun_fact,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in question bank shipped with the binary, used when no config file
/// provides one and as the fallback when the AI oracle fails.
fn default_questions() -> Vec<BankQuestion> {
    fn entry(
        id: &str,
        category: Category,
        difficulty: Difficulty,
        prompt: &str,
        answer: &str,
        fun_fact: Option<&str>,
    ) -> BankQuestion {
        BankQuestion {
            id: id.into(),
            category,
            difficulty,
            prompt: prompt.into(),
            answer: answer.into(),
            fun_fact: fun_fact.map(Into::into),
        }
    }

    vec![
        entry(
            "spo-easy-01",
            Category::Sports,
            Difficulty::Easy,
            "How many players are on a basketball team on court?",
            "5 players",
            Some("Basketball was invented in 1891 with peach baskets as hoops"),
        ),
        entry(
            "spo-easy-02",
            Category::Sports,
            Difficulty::Easy,
            "Which sport is played at Wimbledon?",
            "Tennis",
            Some("The tournament has run since 1877"),
        ),
        entry(
            "spo-med-01",
            Category::Sports,
            Difficulty::Medium,
            "How often are the summer Olympic Games held?",
            "Every 4 years",
            Some("The ancient games date back to 776 BC"),
        ),
        entry(
            "mus-easy-01",
            Category::Music,
            Difficulty::Easy,
            "How many strings does a standard guitar have?",
            "6 strings",
            Some("The electric guitar was invented in 1931"),
        ),
        entry(
            "mus-med-01",
            Category::Music,
            Difficulty::Medium,
            "Which composer wrote his Ninth Symphony while almost completely deaf?",
            "Beethoven",
            Some("He never properly heard it performed"),
        ),
        entry(
            "his-easy-01",
            Category::History,
            Difficulty::Easy,
            "Who was the first person to walk on the Moon?",
            "Neil Armstrong",
            Some("He landed on July 20, 1969"),
        ),
        entry(
            "his-med-01",
            Category::History,
            Difficulty::Medium,
            "In which year did the Berlin Wall fall?",
            "1989",
            Some("The wall stood for 28 years"),
        ),
        entry(
            "sci-easy-01",
            Category::Science,
            Difficulty::Easy,
            "Which planet is closest to the sun?",
            "Mercury",
            Some("Mercury has almost no atmosphere"),
        ),
        entry(
            "sci-easy-02",
            Category::Science,
            Difficulty::Easy,
            "What gas do plants take in for photosynthesis?",
            "Carbon dioxide",
            Some("They release oxygen in return"),
        ),
        entry(
            "sci-hard-01",
            Category::Science,
            Difficulty::Hard,
            "What is the only metal that is liquid at room temperature?",
            "Mercury",
            Some("It freezes at -39 degrees Celsius"),
        ),
        entry(
            "ent-easy-01",
            Category::Entertainment,
            Difficulty::Easy,
            "Which platform made 15-second dance videos famous?",
            "TikTok",
            Some("It passed one billion users in 2021"),
        ),
        entry(
            "ent-med-01",
            Category::Entertainment,
            Difficulty::Medium,
            "What is the name of the dog in The Simpsons?",
            "Santa's Little Helper",
            Some("The show has aired for over 30 years"),
        ),
        entry(
            "geo-easy-01",
            Category::Geography,
            Difficulty::Easy,
            "What is the capital of Colombia?",
            "Bogota",
            Some("It sits 2,640 metres above sea level"),
        ),
        entry(
            "geo-med-01",
            Category::Geography,
            Difficulty::Medium,
            "What is the longest river in the world?",
            "The Amazon",
            Some("It runs for more than 7,000 km"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_category() {
        let config = AppConfig::default();
        for category in [
            Category::Sports,
            Category::Music,
            Category::History,
            Category::Science,
            Category::Entertainment,
            Category::Geography,
        ] {
            assert!(
                config.questions.iter().any(|q| q.category == category),
                "no default question for {category:?}"
            );
        }
    }

    #[test]
    fn partial_file_keeps_unset_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{ "oracle_timeout_secs": 3 }"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.oracle_timeout, Duration::from_secs(3));
        assert_eq!(config.scoring, ScoringTable::default());
        assert!(!config.questions.is_empty());
    }

    #[test]
    fn scoring_section_overrides_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "scoring": { "first_correct": 20, "subsequent_correct": 15, "wrong_penalty": -10 } }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.scoring.first_correct, 20);
        assert_eq!(config.scoring.wrong_penalty, -10);
    }

    #[test]
    fn question_entries_parse_from_json() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "questions": [ {
                "id": "geo-easy-99",
                "category": "geography",
                "difficulty": "easy",
                "prompt": "Largest desert?",
                "answer": "The Sahara"
            } ] }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.questions.len(), 1);
        assert_eq!(config.questions[0].category, Category::Geography);
        assert!(config.questions[0].fun_fact.is_none());
    }
}
