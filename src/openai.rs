//! Minimal OpenAI-compatible client for question generation.
//!
//! We only call chat.completions in JSON-object mode and parse the reply into a
//! question list. Calls are instrumented and log model names, latencies and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Difficulty, Question};
use crate::errors::QuestionFetchError;
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

/// Envelope the model is asked to return (JSON mode requires an object).
#[derive(Deserialize)]
struct GeneratedSet {
  #[serde(default)]
  questions: Vec<Question>,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// JSON-object chat completion; returns the raw message content.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json_text(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, QuestionFetchError> {
    let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "midsegment-arena/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| QuestionFetchError::Network(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      return Err(QuestionFetchError::Http { status, message });
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| QuestionFetchError::Parse(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default())
  }

  /// Generate a question set for `difficulty`. Unplayable items are dropped;
  /// the caller decides whether what remains is enough.
  #[instrument(level = "info", skip(self, prompts, difficulty), fields(%difficulty, model = %self.model))]
  pub async fn generate_questions(
    &self,
    prompts: &Prompts,
    difficulty: Difficulty,
    count: usize,
  ) -> Result<Vec<Question>, QuestionFetchError> {
    let count_s = count.to_string();
    let vars = [("difficulty", difficulty.as_str()), ("count", count_s.as_str())];
    let system = fill_template(&prompts.question_system, &vars);
    let user = fill_template(&prompts.question_user_template, &vars);

    let start = Instant::now();
    let text = match self.chat_json_text(&system, &user, 0.9).await {
      Ok(t) => t,
      Err(e) => {
        error!(target: "questions", elapsed = ?start.elapsed(), error = %e, "Model call failed during question generation");
        return Err(e);
      }
    };
    info!(target: "questions", elapsed = ?start.elapsed(), bytes = text.len(), "Model response received");

    let questions = parse_generated(&text)?;
    info!(target: "questions", %difficulty, count = questions.len(), "Generated question set parsed");
    Ok(questions)
  }
}

/// Parse model output: either `{"questions": [...]}` or a bare array.
pub fn parse_generated(text: &str) -> Result<Vec<Question>, QuestionFetchError> {
  let trimmed = text.trim();
  let all: Vec<Question> = if trimmed.starts_with('[') {
    serde_json::from_str(trimmed)
  } else {
    serde_json::from_str::<GeneratedSet>(trimmed).map(|s| s.questions)
  }
  .map_err(|e| QuestionFetchError::Parse(e.to_string()))?;

  let total = all.len();
  let playable: Vec<Question> = all.into_iter().filter(Question::is_playable).collect();
  if playable.len() < total {
    warn!(target: "questions", dropped = total - playable.len(), "Dropped unplayable generated questions");
  }
  Ok(playable)
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
