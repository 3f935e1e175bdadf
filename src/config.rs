//! Loading arena configuration (prompts, optional question bank, storage paths)
//! from TOML.
//!
//! See `ArenaConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Question;

pub const DEFAULT_LEADERBOARD_PATH: &str = "data/leaderboard.json";
pub const DEFAULT_GENERATED_QUESTIONS: usize = 10;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ArenaConfig {
  #[serde(default)]
  pub prompts: Prompts,
  /// Replaces the built-in fallback questions when non-empty.
  #[serde(default)]
  pub questions: Vec<Question>,
  #[serde(default)]
  pub leaderboard_path: Option<String>,
  #[serde(default)]
  pub generated_question_count: Option<usize>,
}

/// Prompts used by the question generator. Placeholders: `{difficulty}`, `{count}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You write multiple-choice geometry questions for 8th-grade students. Respond ONLY with strict JSON.".into(),
      question_user_template: r#"Create {count} multiple-choice questions about the triangle midsegment theorem (a segment joining the midpoints of two sides is parallel to the third side and half its length).
Difficulty: {difficulty}.
Rules:
- Mix theory and numeric questions.
- If a question names vertices (e.g. ABC, PQR, DEF) or midpoints (e.g. MN, EF, HK), repeat those names in triangleParams.labels (v1 = apex, v2 = bottom-left, v3 = bottom-right, m1 = midpoint of the left side, m2 = midpoint of the right side).
- sideA, sideB, sideC, baseLength and midsegmentLength must agree with the question text.
Return JSON: {"questions": [{"id": number, "question": string, "options": [string, string, string, string], "correctAnswer": number (0-based), "explanation": string, "triangleParams": {"sideA": number, "sideB": number, "sideC": number, "midsegmentLength": number, "baseLength": number, "labels": {"v1": string, "v2": string, "v3": string, "m1": string, "m2": string}}}]}"#.into(),
    }
  }
}

impl ArenaConfig {
  /// Leaderboard file: LEADERBOARD_PATH, then the TOML value, then the default.
  pub fn leaderboard_path(&self) -> String {
    std::env::var("LEADERBOARD_PATH")
      .ok()
      .filter(|p| !p.trim().is_empty())
      .or_else(|| self.leaderboard_path.clone())
      .unwrap_or_else(|| DEFAULT_LEADERBOARD_PATH.into())
  }

  pub fn generated_question_count(&self) -> usize {
    self
      .generated_question_count
      .filter(|n| *n > 0)
      .unwrap_or(DEFAULT_GENERATED_QUESTIONS)
  }
}

pub fn parse_config(raw: &str) -> Result<ArenaConfig, toml::de::Error> {
  toml::from_str::<ArenaConfig>(raw)
}

/// Attempt to load `ArenaConfig` from ARENA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_arena_config_from_env() -> Option<ArenaConfig> {
  let path = std::env::var("ARENA_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "arena", %path, questions = cfg.questions.len(), "Loaded arena config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "arena", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "arena", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
