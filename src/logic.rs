//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Dispatching player commands to the game state machine
//!   - Recording finished sessions on the leaderboard
//!   - Running question fetches in the background and applying their results
//!   - Building the theory sheet

use std::{sync::Arc, time::Instant};

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{LeaderboardEntry, PointLabels, Question};
use crate::errors::{GameError, QuestionFetchError};
use crate::game::{Advanced, AnswerOutcome, FetchApplied, FetchTicket, Screen, SessionResult};
use crate::geometry::{render_svg, DiagramParams};
use crate::protocol::{to_view, GameCommand, GameView, TheoryOut, THEORY_DIAGRAM_SIZE};
use crate::seeds::{theory_sections, THEORY_CAPTION};
use crate::state::{AppState, SESSION_MIN_QUESTIONS};
use crate::util::today_label;

pub const NOT_SAVED_NOTICE: &str = "Your result could not be saved to the leaderboard.";

/// Run one command against a game and return the resulting view.
#[instrument(level = "info", skip(state, game_id, cmd), fields(%game_id, command = cmd.name()))]
pub async fn apply_command(
  state: &Arc<AppState>,
  game_id: Uuid,
  cmd: GameCommand,
) -> Result<GameView, GameError> {
  // Commands that may start with the loaded set pick up the shared pool first.
  let pool = match &cmd {
    GameCommand::RequestStart
    | GameCommand::SubmitName { .. }
    | GameCommand::StartSession { reuse_questions: true, .. } => {
      Some(state.question_pool.read().await.clone())
    }
    _ => None,
  };

  let now = Instant::now();
  let mut ticket = None;
  let mut finished = None;
  let view = {
    let mut games = state.games.write().await;
    let game = games.get_mut(&game_id).ok_or(GameError::UnknownGame(game_id))?;
    if let Some(pool) = &pool {
      game.sync_with_pool(pool);
    }

    match cmd {
      GameCommand::RequestStart => game.request_start()?,
      GameCommand::SubmitName { name } => game.submit_name(&name)?,
      GameCommand::OpenLearning => game.open_learning()?,
      GameCommand::GoHome => game.go_home(),
      GameCommand::StartSession { difficulty, reuse_questions } => {
        ticket = game.start_session(difficulty, reuse_questions)?;
      }
      GameCommand::SubmitAnswer { option_index } => {
        if game.submit_answer(option_index, now)? == AnswerOutcome::Ignored {
          debug!(target: "game", %game_id, option_index, "Answer ignored (feedback pending or loading)");
        }
      }
      GameCommand::Advance => {
        if let Advanced::Finished(result) = game.advance()? {
          finished = Some(result);
        }
      }
    }
    to_view(game, now)
  };

  if let Some(ticket) = ticket {
    spawn_fetch(state.clone(), game_id, ticket);
  }

  // The leaderboard write touches the disk; other games keep running meanwhile.
  if let Some(result) = finished {
    if !record_result(state, &result).await {
      let mut games = state.games.write().await;
      if let Some(game) = games.get_mut(&game_id) {
        if matches!(game.screen(), Screen::Summary | Screen::GameOver) {
          game.set_notice(NOT_SAVED_NOTICE);
        }
        return Ok(to_view(game, Instant::now()));
      }
    }
  }
  Ok(view)
}

/// Push a finished session onto the leaderboard. Returns `false` when the
/// write failed; the leaderboard then keeps its previous snapshot.
async fn record_result(state: &AppState, result: &SessionResult) -> bool {
  let mut lb = state.leaderboard.lock().await;
  match lb.record(&result.player_name, result.score, today_label()) {
    Ok(true) => true,
    Ok(false) => {
      debug!(target: "leaderboard", "Nothing recorded for an unnamed player");
      true
    }
    Err(e) => {
      error!(target: "leaderboard", error = %e, player = %result.player_name, score = result.score, "Leaderboard write failed");
      false
    }
  }
}

/// Fetch a fresh question set without holding any lock, then hand it to the game.
fn spawn_fetch(state: Arc<AppState>, game_id: Uuid, ticket: FetchTicket) {
  tokio::spawn(async move {
    let result = state.fetch_questions(ticket.difficulty, SESSION_MIN_QUESTIONS).await;
    complete_fetch(&state, game_id, ticket, result).await;
  });
}

/// Apply a fetch result to its game and notify subscribers.
/// Returns `None` when the game no longer exists.
#[instrument(level = "info", skip(state, game_id, ticket, result), fields(%game_id, generation = ticket.generation))]
pub async fn complete_fetch(
  state: &AppState,
  game_id: Uuid,
  ticket: FetchTicket,
  result: Result<Vec<Question>, QuestionFetchError>,
) -> Option<FetchApplied> {
  match &result {
    Ok(qs) => debug!(target: "questions", count = qs.len(), "Fetch returned"),
    Err(QuestionFetchError::Disabled) => debug!(target: "questions", "Generation disabled; keeping loaded questions"),
    Err(e) => warn!(target: "questions", error = %e, "Fetch failed; keeping loaded questions"),
  }

  let applied = {
    let mut games = state.games.write().await;
    let game = games.get_mut(&game_id)?;
    game.finish_fetch(ticket, result)
  };

  match applied {
    FetchApplied::Stale => {
      debug!(target: "questions", "Superseded fetch discarded");
    }
    _ => {
      info!(target: "questions", ?applied, "Fetch applied");
      // No receivers is fine: nobody is watching this game over WebSocket.
      let _ = state.updates.send(game_id);
    }
  }
  Some(applied)
}

pub async fn leaderboard_entries(state: &AppState) -> Vec<LeaderboardEntry> {
  state.leaderboard.lock().await.entries().to_vec()
}

/// Reference sheet for the Learning screen, with a labelled diagram and no lengths.
pub fn theory() -> TheoryOut {
  let diagram_svg = render_svg(&DiagramParams {
    width: THEORY_DIAGRAM_SIZE.0,
    height: THEORY_DIAGRAM_SIZE.1,
    base_length: None,
    midsegment_length: None,
    show_labels: true,
    labels: PointLabels::default(),
  });
  TheoryOut { sections: theory_sections(), caption: THEORY_CAPTION, diagram_svg }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{mpsc, Mutex};

  use crate::config::ArenaConfig;
  use crate::domain::Difficulty;
  use crate::errors::PersistenceError;
  use crate::leaderboard::LeaderboardStore;
  use crate::leaderboard::memory::MemoryStore;
  use crate::seeds::default_questions;
  use crate::state::test_support::offline_state;

  async fn named(state: &Arc<AppState>, name: &str) -> Uuid {
    let (id, _) = state.create_game().await;
    apply_command(state, id, GameCommand::RequestStart).await.unwrap();
    let view = apply_command(state, id, GameCommand::SubmitName { name: name.into() }).await.unwrap();
    assert_eq!(view.screen, Screen::Playing);
    id
  }

  async fn answer(state: &Arc<AppState>, id: Uuid, option_index: usize) -> GameView {
    apply_command(state, id, GameCommand::SubmitAnswer { option_index }).await.unwrap()
  }

  async fn advance(state: &Arc<AppState>, id: Uuid) -> GameView {
    apply_command(state, id, GameCommand::Advance).await.unwrap()
  }

  #[tokio::test]
  async fn full_default_session_is_recorded() {
    let store = MemoryStore::default();
    let state = offline_state(store.clone());
    let id = named(&state, "Lan").await;
    let qs = default_questions();

    answer(&state, id, qs[0].correct_answer).await;
    advance(&state, id).await;
    let v = answer(&state, id, (qs[1].correct_answer + 1) % 4).await;
    assert_eq!((v.score, v.lives), (5, Some(2)));
    advance(&state, id).await;
    answer(&state, id, qs[2].correct_answer).await;
    let v = advance(&state, id).await;

    assert_eq!(v.screen, Screen::Summary);
    assert_eq!(v.score, 15);
    assert!(v.notice.is_none());
    let entries = leaderboard_entries(&state).await;
    assert_eq!(entries.len(), 1);
    assert_eq!((entries[0].name.as_str(), entries[0].score), ("Lan", 15));
    assert_eq!(store.saved.lock().unwrap().as_ref().unwrap(), &entries);
  }

  #[tokio::test]
  async fn game_over_is_recorded_too() {
    let state = offline_state(MemoryStore::default());
    let id = named(&state, "Minh").await;
    let mut v = answer(&state, id, 3).await;
    for _ in 0..2 {
      v = advance(&state, id).await;
      assert_eq!(v.screen, Screen::Playing);
      v = answer(&state, id, 3).await;
    }
    assert_eq!(v.lives, Some(0));
    assert_eq!(v.screen, Screen::Playing);

    let v = advance(&state, id).await;
    assert_eq!(v.screen, Screen::GameOver);
    assert_eq!(v.last_result.unwrap().outcome, crate::game::Outcome::OutOfLives);
    let entries = leaderboard_entries(&state).await;
    assert_eq!((entries[0].name.as_str(), entries[0].score), ("Minh", 0));
  }

  #[tokio::test]
  async fn failed_write_sets_notice_and_keeps_board() {
    let state = offline_state(MemoryStore::failing());
    let id = named(&state, "Lan").await;
    for q in default_questions() {
      answer(&state, id, q.correct_answer).await;
      advance(&state, id).await;
    }
    let v = state.game_view(id).await.unwrap();
    assert_eq!(v.screen, Screen::Summary);
    assert_eq!(v.notice.as_deref(), Some(NOT_SAVED_NOTICE));
    assert!(leaderboard_entries(&state).await.is_empty());

    let v = apply_command(&state, id, GameCommand::GoHome).await.unwrap();
    assert!(v.notice.is_none());
  }

  #[tokio::test]
  async fn empty_name_is_rejected_at_the_boundary() {
    let state = offline_state(MemoryStore::default());
    let (id, _) = state.create_game().await;
    apply_command(&state, id, GameCommand::RequestStart).await.unwrap();
    let err = apply_command(&state, id, GameCommand::SubmitName { name: " \t".into() })
      .await
      .unwrap_err();
    assert!(matches!(err, GameError::InvalidInput(_)));
    assert_eq!(state.game_view(id).await.unwrap().screen, Screen::NameInput);
  }

  #[tokio::test]
  async fn unknown_game_is_reported() {
    let state = offline_state(MemoryStore::default());
    let id = Uuid::new_v4();
    let err = apply_command(&state, id, GameCommand::Advance).await.unwrap_err();
    assert_eq!(err, GameError::UnknownGame(id));
  }

  #[tokio::test]
  async fn fresh_session_fetch_falls_back_and_notifies() {
    let state = offline_state(MemoryStore::default());
    let id = named(&state, "Lan").await;
    apply_command(&state, id, GameCommand::GoHome).await.unwrap();

    let mut rx = state.updates.subscribe();
    let v = apply_command(
      &state,
      id,
      GameCommand::StartSession { difficulty: Difficulty::Medium, reuse_questions: false },
    )
    .await
    .unwrap();
    assert_eq!(v.screen, Screen::Playing);
    assert!(v.loading);

    assert_eq!(rx.recv().await.unwrap(), id);
    let v = state.game_view(id).await.unwrap();
    assert!(!v.loading);
    assert_eq!(v.question_count, 3);
    assert_eq!(v.question.unwrap().id, 1);
  }

  #[tokio::test]
  async fn empty_fetch_result_keeps_previous_list() {
    let state = offline_state(MemoryStore::default());
    let id = named(&state, "Lan").await;
    let ticket = {
      let mut games = state.games.write().await;
      let g = games.get_mut(&id).unwrap();
      g.go_home();
      g.start_session(Difficulty::Medium, false).unwrap().unwrap()
    };
    let applied = complete_fetch(&state, id, ticket, Ok(vec![])).await;
    assert_eq!(applied, Some(FetchApplied::KeptExisting));
    assert_eq!(state.game_view(id).await.unwrap().question_count, 3);
  }

  #[tokio::test]
  async fn fetch_for_dropped_game_is_ignored() {
    let state = offline_state(MemoryStore::default());
    let ticket = FetchTicket { generation: 1, difficulty: Difficulty::Easy };
    assert_eq!(complete_fetch(&state, Uuid::new_v4(), ticket, Ok(default_questions())).await, None);
  }

  #[tokio::test]
  async fn pool_changes_reach_games_that_reuse() {
    let state = offline_state(MemoryStore::default());
    let (id, _) = state.create_game().await;
    let mut bigger = default_questions();
    bigger.extend(default_questions().into_iter().map(|mut q| {
      q.id += 10;
      q
    }));
    *state.question_pool.write().await = bigger;

    apply_command(&state, id, GameCommand::RequestStart).await.unwrap();
    let v = apply_command(&state, id, GameCommand::SubmitName { name: "Lan".into() }).await.unwrap();
    assert_eq!(v.question_count, 6);
  }

  #[test]
  fn theory_sheet_has_sections_and_unmeasured_diagram() {
    let t = theory();
    assert_eq!(t.sections.len(), 3);
    assert!(t.diagram_svg.contains(">M</text>"));
    assert!(!t.diagram_svg.contains("cm</text>"));
  }

  /// Store whose writes wait until the test lets them through.
  struct GatedStore {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
  }

  impl LeaderboardStore for GatedStore {
    fn load(&self) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
      Ok(Vec::new())
    }

    fn save(&self, _entries: &[LeaderboardEntry]) -> Result<(), PersistenceError> {
      let _ = self.started.lock().unwrap().send(());
      let _ = self.release.lock().unwrap().recv();
      Ok(())
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn slow_leaderboard_write_does_not_stall_other_games() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = GatedStore { started: Mutex::new(started_tx), release: Mutex::new(release_rx) };
    let state = Arc::new(AppState::from_parts(ArenaConfig::default(), Box::new(store), None));

    let id = named(&state, "Lan").await;
    let other = named(&state, "Minh").await;
    let qs = default_questions();
    for (i, q) in qs.iter().enumerate() {
      answer(&state, id, q.correct_answer).await;
      if i + 1 < qs.len() {
        advance(&state, id).await;
      }
    }

    let finishing = tokio::spawn({
      let state = state.clone();
      async move { apply_command(&state, id, GameCommand::Advance).await }
    });
    tokio::task::spawn_blocking(move || started_rx.recv()).await.unwrap().unwrap();

    // The write is in progress: the registry must be free for everyone else.
    assert!(state.games.try_write().is_ok());
    let v = answer(&state, other, qs[0].correct_answer).await;
    assert_eq!(v.score, 10);

    release_tx.send(()).unwrap();
    let v = finishing.await.unwrap().unwrap();
    assert_eq!(v.screen, Screen::Summary);
    assert_eq!(v.score, 30);
    assert!(v.notice.is_none());
    assert_eq!(leaderboard_entries(&state).await[0].name, "Lan");
  }
}
