//! Built-in content: the fallback question set, the achievement catalogue and
//! the theory sheet shown on the Learning screen.

use serde::Serialize;

use crate::domain::{Achievement, AchievementId, PointLabels, Question, TriangleParams};

fn labels(v1: &str, v2: &str, v3: &str, m1: &str, m2: &str) -> Option<PointLabels> {
  Some(PointLabels {
    v1: v1.into(),
    v2: v2.into(),
    v3: v3.into(),
    m1: m1.into(),
    m2: m2.into(),
  })
}

/// Minimal question set that keeps the game playable without OpenAI or config.
pub fn default_questions() -> Vec<Question> {
  vec![
    Question {
      id: 1,
      question: "A midsegment of a triangle is the segment joining...".into(),
      options: vec![
        "A vertex and the midpoint of the opposite side".into(),
        "The midpoints of two sides of the triangle".into(),
        "Two vertices of the triangle".into(),
        "The centroid and a vertex".into(),
      ],
      correct_answer: 1,
      explanation: "A midsegment joins the midpoints of two sides of the triangle.".into(),
      triangle_params: Some(TriangleParams {
        side_a: 10.0,
        side_b: 10.0,
        side_c: 12.0,
        midsegment_length: Some(6.0),
        base_length: Some(12.0),
        labels: labels("A", "B", "C", "M", "N"),
      }),
    },
    Question {
      id: 2,
      question: "If the base BC = 14cm, how long is the corresponding midsegment MN?".into(),
      options: vec!["7cm".into(), "14cm".into(), "28cm".into(), "10cm".into()],
      correct_answer: 0,
      explanation: "A midsegment is half the side it is parallel to: 14 / 2 = 7cm.".into(),
      triangle_params: Some(TriangleParams {
        side_a: 10.0,
        side_b: 10.0,
        side_c: 14.0,
        midsegment_length: Some(7.0),
        base_length: Some(14.0),
        labels: labels("A", "B", "C", "M", "N"),
      }),
    },
    Question {
      id: 3,
      question: "In triangle PQR, EF is a midsegment (E on PQ, F on PR) and QR = 20cm. EF = ?".into(),
      options: vec!["10cm".into(), "20cm".into(), "40cm".into(), "5cm".into()],
      correct_answer: 0,
      explanation: "EF = 1/2 QR = 1/2 * 20 = 10cm.".into(),
      triangle_params: Some(TriangleParams {
        side_a: 12.0,
        side_b: 12.0,
        side_c: 20.0,
        midsegment_length: Some(10.0),
        base_length: Some(20.0),
        labels: labels("P", "Q", "R", "E", "F"),
      }),
    },
  ]
}

/// Every achievement a game can earn, all locked.
pub fn initial_achievements() -> Vec<Achievement> {
  vec![
    Achievement { id: AchievementId::FirstWin, title: "First Steps", icon: "🌱", unlocked: false },
    Achievement { id: AchievementId::PerfectScore, title: "Geometry Master", icon: "🏆", unlocked: false },
    Achievement { id: AchievementId::ProMath, title: "Super Pro", icon: "💎", unlocked: false },
  ]
}

#[derive(Debug, Clone, Serialize)]
pub struct TheorySection {
  pub title: &'static str,
  pub points: Vec<&'static str>,
}

/// Reference material for the Learning screen.
pub fn theory_sections() -> Vec<TheorySection> {
  vec![
    TheorySection {
      title: "Definition",
      points: vec!["A midsegment of a triangle is the segment joining the midpoints of two of its sides."],
    },
    TheorySection {
      title: "Property",
      points: vec![
        "The midsegment is parallel to the third side.",
        "The midsegment is half as long as the third side.",
      ],
    },
    TheorySection {
      title: "Converse",
      points: vec![
        "A line through the midpoint of one side, parallel to a second side, passes through the midpoint of the third side.",
      ],
    },
  ]
}

/// Caption under the Learning screen diagram.
pub const THEORY_CAPTION: &str = "M and N are midpoints, so MN is a midsegment";
