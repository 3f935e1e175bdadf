//! Error types for question fetching, player input, leaderboard persistence and
//! command dispatch.

use std::path::PathBuf;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::game::Screen;
use crate::protocol::ErrorOut;

/// Why a fresh question set could not be used. Always recovered by keeping the
/// previous set.
#[derive(Debug, Error)]
pub enum QuestionFetchError {
  #[error("question generation disabled (OPENAI_API_KEY not set)")]
  Disabled,
  #[error("request failed: {0}")]
  Network(String),
  #[error("OpenAI HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("could not parse generated questions: {0}")]
  Parse(String),
  #[error("generated set too small: {got} < {min}")]
  TooFew { got: usize, min: usize },
}

/// Input rejected at the boundary; the game state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
  #[error("player name must not be empty")]
  EmptyName,
  #[error("a player name is required before starting")]
  NameRequired,
  #[error("option {index} does not exist (question has {options} options)")]
  OptionOutOfRange { index: usize, options: usize },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("leaderboard I/O on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("leaderboard file {path} is not valid JSON: {source}")]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("could not serialize leaderboard: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Failure of a single game command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
  #[error(transparent)]
  InvalidInput(#[from] InvalidInputError),
  #[error("'{command}' is not available on the {screen:?} screen")]
  WrongScreen { command: &'static str, screen: Screen },
  #[error("unknown game id {0}")]
  UnknownGame(Uuid),
}

impl GameError {
  pub fn status(&self) -> StatusCode {
    match self {
      GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
      GameError::WrongScreen { .. } => StatusCode::CONFLICT,
      GameError::UnknownGame(_) => StatusCode::NOT_FOUND,
    }
  }
}

impl IntoResponse for GameError {
  fn into_response(self) -> Response {
    (self.status(), Json(ErrorOut { message: self.to_string() })).into_response()
  }
}
