//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::GameError;
use crate::geometry::render_svg;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, question_generation: state.openai.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_game(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (game_id, view) = state.create_game().await;
  info!(target: "game", %game_id, "HTTP game created");
  Json(GameCreatedOut { game_id, state: view })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_game(
  State(state): State<Arc<AppState>>,
  Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, GameError> {
  Ok(Json(state.game_view(game_id).await?))
}

#[instrument(level = "info", skip(state, cmd), fields(command = cmd.name()))]
pub async fn http_post_command(
  State(state): State<Arc<AppState>>,
  Path(game_id): Path<Uuid>,
  Json(cmd): Json<GameCommand>,
) -> Result<Json<GameView>, GameError> {
  let view = apply_command(&state, game_id, cmd).await?;
  info!(target: "game", %game_id, screen = ?view.screen, score = view.score, "HTTP command applied");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_leaderboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let entries = leaderboard_entries(&state).await;
  Json(LeaderboardOut { entries })
}

#[instrument(level = "info")]
pub async fn http_get_theory() -> impl IntoResponse {
  Json(theory())
}

#[instrument(level = "info", skip(q))]
pub async fn http_get_diagram(Query(q): Query<DiagramQuery>) -> impl IntoResponse {
  let svg = render_svg(&q.into_params());
  ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}
