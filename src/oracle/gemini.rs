//! AI-backed question oracle calling the Gemini API (feature `ai-oracle`).

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    oracle::{OracleError, OracleResult, QuestionOracle, QuestionRequest},
    state::record::{Category, Question},
};

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Per-request transport timeout. The service layer applies its own overall
/// deadline on top; this one bounds a single HTTP exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn category_theme(category: Category) -> &'static str {
    match category {
        Category::Sports => "sports, athletes, teams, competitions",
        Category::Music => "music, artists, genres, songs",
        Category::History => "historical events, figures, important dates",
        Category::Science => "science, inventions, scientists, discoveries",
        Category::Entertainment => "movies, series, celebrities, pop culture",
        Category::Geography => "countries, cities, landmarks, world geography",
    }
}

/// Oracle generating fresh questions through the Gemini API.
pub struct GeminiOracle {
    client: Client,
    api_key: Arc<str>,
}

impl GeminiOracle {
    /// Build an oracle with the given API key.
    pub fn new(api_key: impl Into<Arc<str>>) -> OracleResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| OracleError::Request { source })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Build an oracle from the `GEMINI_API_KEY` environment variable, if set.
    pub fn from_env() -> Option<OracleResult<Self>> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self::new)
    }

    async fn request_question(&self, request: &QuestionRequest) -> OracleResult<Question> {
        let category = request.category;
        let difficulty = request.difficulty;

        let prompt = format!(
            "You write short, punchy trivia questions about {theme}.\n\
             Rules: the question is at most 20 words, the answer at most 3 words \
             (or a date/number), the fun fact at most 15 words.\n\
             Difficulty: {difficulty}.\n\
             Answer with JSON only, no markdown:\n\
             {{\"question\": \"...\", \"answer\": \"...\", \"funFact\": \"...\"}}",
            theme = category_theme(category),
            difficulty = difficulty.as_str(),
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.8,
                "topK": 20,
                "topP": 0.9,
                "maxOutputTokens": 1024,
                "candidateCount": 1,
            }
        });

        let response = self
            .client
            .post(format!("{GEMINI_API_URL}?key={}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|source| OracleError::Request { source })?;

        if !response.status().is_success() {
            return Err(OracleError::Status {
                status: response.status(),
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|source| OracleError::Request { source })?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| OracleError::Malformed {
                reason: "response carried no generated text".into(),
            })?;

        let generated = parse_generated(&text)?;

        Ok(Question {
            // Cache-busting suffix keeps every served instance unique.
            id: format!(
                "{}-{}-{}",
                category.as_str(),
                difficulty.as_str(),
                Uuid::new_v4().simple()
            ),
            category,
            difficulty,
            prompt: generated.question.trim().to_string(),
            answer: generated.answer.trim().to_string(),
            fun_fact: generated
                .fun_fact
                .map(|fact| fact.trim().to_string())
                .filter(|fact| !fact.is_empty()),
        })
    }
}

impl QuestionOracle for GeminiOracle {
    fn generate(&self, request: QuestionRequest) -> BoxFuture<'static, OracleResult<Question>> {
        let client = self.client.clone();
        let api_key = Arc::clone(&self.api_key);
        Box::pin(async move {
            let oracle = GeminiOracle { client, api_key };
            oracle.request_question(&request).await
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    answer: String,
    #[serde(rename = "funFact")]
    fun_fact: Option<String>,
}

/// Extract the JSON object from generated text, tolerating markdown fences
/// and surrounding prose.
fn parse_generated(text: &str) -> OracleResult<GeneratedQuestion> {
    let cleaned = text.replace("```json", "").replace("```", "");

    let start = cleaned.find('{').ok_or_else(|| OracleError::Malformed {
        reason: "no JSON object in generated text".into(),
    })?;
    let end = cleaned.rfind('}').ok_or_else(|| OracleError::Malformed {
        reason: "unterminated JSON object in generated text".into(),
    })?;
    if end < start {
        return Err(OracleError::Malformed {
            reason: "unterminated JSON object in generated text".into(),
        });
    }

    let parsed: GeneratedQuestion =
        serde_json::from_str(&cleaned[start..=end]).map_err(|err| OracleError::Malformed {
            reason: err.to_string(),
        })?;

    if parsed.question.trim().is_empty() || parsed.answer.trim().is_empty() {
        return Err(OracleError::Malformed {
            reason: "generated question or answer is empty".into(),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let parsed = parse_generated(
            r#"{"question": "Capital of Colombia?", "answer": "Bogota", "funFact": "2,640 m above sea level"}"#,
        )
        .unwrap();
        assert_eq!(parsed.answer, "Bogota");
        assert!(parsed.fun_fact.is_some());
    }

    #[test]
    fn strips_markdown_fences() {
        let parsed = parse_generated(
            "```json\n{\"question\": \"Longest river?\", \"answer\": \"The Amazon\"}\n```",
        )
        .unwrap();
        assert_eq!(parsed.question, "Longest river?");
        assert!(parsed.fun_fact.is_none());
    }

    #[test]
    fn rejects_text_without_json() {
        assert!(matches!(
            parse_generated("sorry, I cannot help with that"),
            Err(OracleError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_empty_fields() {
        assert!(matches!(
            parse_generated(r#"{"question": " ", "answer": "x"}"#),
            Err(OracleError::Malformed { .. })
        ));
    }
}
