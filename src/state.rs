//! Application state: live games, the shared question pool, the leaderboard,
//! the optional OpenAI client and the update channel for WebSocket pushes.
//!
//! This module owns:
//!   - the games registry (by id)
//!   - the question pool new games start from (bank/defaults, replaced by a
//!     successful startup prefetch)
//!   - the leaderboard (file-backed)
//!   - the prompts struct (from TOML or defaults)
//!   - optional OpenAI client

use std::{collections::HashMap, time::Instant};

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_arena_config_from_env, ArenaConfig, Prompts};
use crate::domain::{Difficulty, Question};
use crate::errors::{GameError, QuestionFetchError};
use crate::game::Game;
use crate::leaderboard::{JsonFileStore, Leaderboard, LeaderboardStore};
use crate::openai::OpenAI;
use crate::protocol::{to_view, GameView};
use crate::seeds::default_questions;

/// A startup prefetch must return at least this many questions to replace the pool.
pub const PREFETCH_MIN_QUESTIONS: usize = 5;
/// A per-session fetch only needs one.
pub const SESSION_MIN_QUESTIONS: usize = 1;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

pub struct AppState {
    pub games: RwLock<HashMap<Uuid, Game>>,
    pub question_pool: RwLock<Vec<Question>>,
    pub leaderboard: Mutex<Leaderboard>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub generated_question_count: usize,
    /// Game ids whose state changed outside a client request (fetch completion).
    pub updates: broadcast::Sender<Uuid>,
}

impl AppState {
    /// Build state from env: load config, open the leaderboard, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_arena_config_from_env().unwrap_or_default();
        let leaderboard_path = cfg.leaderboard_path();
        info!(target: "arena", path = %leaderboard_path, "Leaderboard file");

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "arena", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "arena", "OpenAI disabled (no OPENAI_API_KEY). Using built-in questions.");
        }

        Self::from_parts(cfg, Box::new(JsonFileStore::new(leaderboard_path)), openai)
    }

    pub fn from_parts(
        cfg: ArenaConfig,
        store: Box<dyn LeaderboardStore>,
        openai: Option<OpenAI>,
    ) -> Self {
        let generated_question_count = cfg.generated_question_count();
        let bank: Vec<Question> = cfg.questions.into_iter().filter(Question::is_playable).collect();
        let pool = if bank.is_empty() {
            default_questions()
        } else {
            info!(target: "questions", count = bank.len(), "Using configured question bank as fallback set");
            bank
        };
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            games: RwLock::new(HashMap::new()),
            question_pool: RwLock::new(pool),
            leaderboard: Mutex::new(Leaderboard::open(store)),
            openai,
            prompts: cfg.prompts,
            generated_question_count,
            updates,
        }
    }

    /// Register a new game seeded from the current pool.
    #[instrument(level = "info", skip(self))]
    pub async fn create_game(&self) -> (Uuid, GameView) {
        let pool = self.question_pool.read().await.clone();
        let game = Game::new(pool);
        let view = to_view(&game, Instant::now());
        let id = Uuid::new_v4();
        self.games.write().await.insert(id, game);
        info!(target: "game", game_id = %id, "Game created");
        (id, view)
    }

    pub async fn game_view(&self, id: Uuid) -> Result<GameView, GameError> {
        let games = self.games.read().await;
        let game = games.get(&id).ok_or(GameError::UnknownGame(id))?;
        Ok(to_view(game, Instant::now()))
    }

    #[instrument(level = "info", skip(self))]
    pub async fn remove_game(&self, id: Uuid) {
        if self.games.write().await.remove(&id).is_some() {
            info!(target: "game", game_id = %id, "Game dropped");
        }
    }

    /// Ask the generator for a fresh set. Without a client this fails with
    /// `Disabled`; fewer than `min` playable questions is `TooFew`.
    #[instrument(level = "info", skip(self, difficulty), fields(%difficulty))]
    pub async fn fetch_questions(
        &self,
        difficulty: Difficulty,
        min: usize,
    ) -> Result<Vec<Question>, QuestionFetchError> {
        let oa = self.openai.as_ref().ok_or(QuestionFetchError::Disabled)?;
        let qs = oa
            .generate_questions(&self.prompts, difficulty, self.generated_question_count)
            .await?;
        if qs.len() < min {
            return Err(QuestionFetchError::TooFew { got: qs.len(), min });
        }
        Ok(qs)
    }

    /// Startup prefetch: replace the pool only with a set of at least
    /// `PREFETCH_MIN_QUESTIONS`. Failures keep the current pool.
    #[instrument(level = "info", skip(self))]
    pub async fn prefetch_questions(&self) {
        match self.fetch_questions(Difficulty::Medium, PREFETCH_MIN_QUESTIONS).await {
            Ok(qs) => {
                let n = qs.len();
                *self.question_pool.write().await = qs;
                info!(target: "questions", count = n, "Prefetched question set installed");
            }
            Err(QuestionFetchError::Disabled) => {}
            Err(e) => {
                warn!(target: "questions", error = %e, "Background prefetch failed; keeping current questions");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::offline_state;
    use super::*;
    use crate::game::Screen;
    use crate::leaderboard::memory::MemoryStore;

    #[tokio::test]
    async fn new_games_start_home_with_default_pool() {
        let state = offline_state(MemoryStore::default());
        let (id, view) = state.create_game().await;
        assert_eq!(view.screen, Screen::Home);
        assert_eq!(view.question_count, 3);
        assert!(state.game_view(id).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_game_is_an_error() {
        let state = offline_state(MemoryStore::default());
        let id = Uuid::new_v4();
        assert_eq!(state.game_view(id).await.unwrap_err(), GameError::UnknownGame(id));
    }

    #[tokio::test]
    async fn fetch_without_client_is_disabled_and_prefetch_keeps_pool() {
        let state = offline_state(MemoryStore::default());
        assert!(matches!(
            state.fetch_questions(Difficulty::Hard, 1).await,
            Err(QuestionFetchError::Disabled)
        ));
        state.prefetch_questions().await;
        assert_eq!(*state.question_pool.read().await, default_questions());
    }

    #[tokio::test]
    async fn configured_bank_replaces_defaults() {
        let mut cfg = ArenaConfig::default();
        let mut q = default_questions().remove(0);
        q.id = 42;
        cfg.questions = vec![q];
        let state = AppState::from_parts(cfg, Box::new(MemoryStore::default()), None);
        let pool = state.question_pool.read().await;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 42);
    }

    #[tokio::test]
    async fn removed_games_are_gone() {
        let state = offline_state(MemoryStore::default());
        let (id, _) = state.create_game().await;
        state.remove_game(id).await;
        assert!(state.game_view(id).await.is_err());
    }
}
