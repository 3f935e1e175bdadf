//! Domain models: questions and their triangle illustration, difficulty levels,
//! leaderboard entries and achievements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Requested difficulty for a generated question set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Names of the five points drawn on the diagram.
/// `v1` is the apex, `v2`/`v3` the base corners, `m1`/`m2` the midpoints of the
/// left and right sides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLabels {
  pub v1: String,
  pub v2: String,
  pub v3: String,
  pub m1: String,
  pub m2: String,
}

impl Default for PointLabels {
  fn default() -> Self {
    Self {
      v1: "A".into(),
      v2: "B".into(),
      v3: "C".into(),
      m1: "M".into(),
      m2: "N".into(),
    }
  }
}

/// Geometry attached to a question. Only `base_length` and `midsegment_length`
/// are ever printed on the diagram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriangleParams {
  #[serde(default)] pub side_a: f64,
  #[serde(default)] pub side_b: f64,
  #[serde(default)] pub side_c: f64,
  #[serde(default)] pub midsegment_length: Option<f64>,
  #[serde(default)] pub base_length: Option<f64>,
  #[serde(default)] pub labels: Option<PointLabels>,
}

/// One multiple-choice quiz item. Field names follow the JSON the model is asked
/// to produce (camelCase), which is also accepted in the TOML question bank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: u32,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: usize,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub triangle_params: Option<TriangleParams>,
}

impl Question {
  /// A question is playable when it has options and its answer index points into them.
  pub fn is_playable(&self) -> bool {
    !self.options.is_empty() && self.correct_answer < self.options.len()
  }

  pub fn labels(&self) -> PointLabels {
    self
      .triangle_params
      .as_ref()
      .and_then(|t| t.labels.clone())
      .unwrap_or_default()
  }
}

/// One row of the persisted top-10 list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub name: String,
  pub score: u32,
  pub date: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
  FirstWin,
  PerfectScore,
  ProMath,
}

/// Unlockable badge. Lives only as long as the game that earned it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Achievement {
  pub id: AchievementId,
  pub title: &'static str,
  pub icon: &'static str,
  pub unlocked: bool,
}
