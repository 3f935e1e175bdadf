//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Achievement, Difficulty, LeaderboardEntry, PointLabels};
use crate::game::{Feedback, Game, Screen, SessionResult};
use crate::geometry::{render_svg, DiagramParams};
use crate::seeds::TheorySection;

/// Size of the diagram shown next to a question.
pub const QUESTION_DIAGRAM_SIZE: (f64, f64) = (420.0, 320.0);
/// Size of the diagram on the Learning screen.
pub const THEORY_DIAGRAM_SIZE: (f64, f64) = (400.0, 300.0);

/// Player actions understood by the state machine.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
  RequestStart,
  SubmitName {
    name: String,
  },
  OpenLearning,
  GoHome,
  StartSession {
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    reuse_questions: bool,
  },
  SubmitAnswer {
    option_index: usize,
  },
  Advance,
}

impl GameCommand {
  pub fn name(&self) -> &'static str {
    match self {
      GameCommand::RequestStart => "request_start",
      GameCommand::SubmitName { .. } => "submit_name",
      GameCommand::OpenLearning => "open_learning",
      GameCommand::GoHome => "go_home",
      GameCommand::StartSession { .. } => "start_session",
      GameCommand::SubmitAnswer { .. } => "submit_answer",
      GameCommand::Advance => "advance",
    }
  }
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  GetState,
  GetLeaderboard,
  Command { command: GameCommand },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  State { state: GameView },
  Leaderboard { entries: Vec<LeaderboardEntry> },
  Error { message: String },
}

/// Question as shown to the player. `correct_option` stays hidden until the
/// answer has been given.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
  pub id: u32,
  pub text: String,
  pub options: Vec<String>,
  pub labels: PointLabels,
  pub correct_option: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PulseOut {
  pub label: &'static str,
  pub gain: bool,
  pub remaining_ms: u64,
}

/// Everything a client needs to render the current screen.
#[derive(Debug, Serialize)]
pub struct GameView {
  pub screen: Screen,
  pub player_name: Option<String>,
  pub loading: bool,
  /// Difficulty of the running session.
  pub difficulty: Option<Difficulty>,
  pub question_index: usize,
  pub question_count: usize,
  /// Live score while playing, final score on Summary/GameOver.
  pub score: u32,
  pub lives: Option<u32>,
  pub question: Option<QuestionOut>,
  pub diagram_svg: Option<String>,
  pub feedback: Option<Feedback>,
  pub pulse: Option<PulseOut>,
  pub achievements: Vec<Achievement>,
  pub last_result: Option<SessionResult>,
  pub notice: Option<String>,
}

/// Snapshot a game for the wire.
pub fn to_view(game: &Game, now: Instant) -> GameView {
  let session = game.session();
  let loading = session.map(|s| s.loading).unwrap_or(false);
  let feedback = session.and_then(|s| s.feedback.clone());
  let revealed = feedback.is_some();

  let current = if loading { None } else { game.current_question() };
  let question = current.map(|q| QuestionOut {
    id: q.id,
    text: q.question.clone(),
    options: q.options.clone(),
    labels: q.labels(),
    correct_option: revealed.then_some(q.correct_answer),
  });
  // Lengths give the answer away, so they are drawn only after answering.
  let diagram_svg = current.map(|q| {
    let tp = q.triangle_params.as_ref();
    render_svg(&DiagramParams {
      width: QUESTION_DIAGRAM_SIZE.0,
      height: QUESTION_DIAGRAM_SIZE.1,
      base_length: tp.and_then(|t| t.base_length).filter(|_| revealed),
      midsegment_length: tp.and_then(|t| t.midsegment_length).filter(|_| revealed),
      show_labels: true,
      labels: q.labels(),
    })
  });

  let pulse = session.and_then(|s| s.pulse.as_ref()).and_then(|p| {
    p.remaining(now).map(|left| PulseOut {
      label: p.label,
      gain: p.gain,
      remaining_ms: left.as_millis() as u64,
    })
  });

  let score = match session {
    Some(s) => s.score,
    None => game.last_result().map(|r| r.score).unwrap_or(0),
  };

  GameView {
    screen: game.screen(),
    player_name: game.player_name().map(str::to_string),
    loading,
    difficulty: session.map(|s| s.difficulty),
    question_index: session.map(|s| s.index).unwrap_or(0),
    question_count: game.questions().len(),
    score,
    lives: session.map(|s| s.lives),
    question,
    diagram_svg,
    feedback,
    pulse,
    achievements: game.achievements().to_vec(),
    last_result: game.last_result().cloned(),
    notice: game.notice().map(str::to_string),
  }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Serialize)]
pub struct GameCreatedOut {
  pub game_id: Uuid,
  pub state: GameView,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardOut {
  pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct TheoryOut {
  pub sections: Vec<TheorySection>,
  pub caption: &'static str,
  pub diagram_svg: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiagramQuery {
  pub width: Option<f64>,
  pub height: Option<f64>,
  pub base: Option<f64>,
  pub midsegment: Option<f64>,
  pub show_labels: Option<bool>,
  /// Five comma-separated names: apex, bottom-left, bottom-right, left midpoint, right midpoint.
  pub labels: Option<String>,
}

impl DiagramQuery {
  pub fn into_params(self) -> DiagramParams {
    let defaults = DiagramParams::default();
    let labels = self
      .labels
      .as_deref()
      .and_then(parse_labels)
      .unwrap_or(defaults.labels);
    DiagramParams {
      width: self.width.map(clamp_side).unwrap_or(defaults.width),
      height: self.height.map(clamp_side).unwrap_or(defaults.height),
      base_length: self.base,
      midsegment_length: self.midsegment,
      show_labels: self.show_labels.unwrap_or(defaults.show_labels),
      labels,
    }
  }
}

fn clamp_side(v: f64) -> f64 {
  if v.is_finite() { v.clamp(120.0, 2000.0) } else { 300.0 }
}

fn parse_labels(raw: &str) -> Option<PointLabels> {
  let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
  match parts.as_slice() {
    [v1, v2, v3, m1, m2] => Some(PointLabels {
      v1: v1.to_string(),
      v2: v2.to_string(),
      v3: v3.to_string(),
      m1: m1.to_string(),
      m2: m2.to_string(),
    }),
    _ => None,
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
  pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub question_generation: bool,
}
