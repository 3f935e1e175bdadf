//! Game session state machine.
//!
//! A `Game` is one player's view of the arena: the current screen, the loaded
//! question set, the live `Session` while playing, and the achievements earned
//! so far. Every user action is a method call that either transitions the game
//! or returns a `GameError` without touching it. Side effects (leaderboard
//! writes, remote fetches) are returned to the caller as values.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{Achievement, AchievementId, Difficulty, Question};
use crate::errors::{GameError, InvalidInputError, QuestionFetchError};
use crate::seeds::{default_questions, initial_achievements};

pub const MAX_LIVES: u32 = 3;
pub const POINTS_CORRECT: u32 = 10;
pub const POINTS_WRONG: u32 = 5;
pub const PRO_SCORE: u32 = 80;
/// How long the "+10" / "-5" pulse stays visible after an answer.
pub const PULSE_WINDOW: Duration = Duration::from_secs(1);

pub const PRAISE_MESSAGE: &str = "EXCELLENT! You earned 10 points.";
pub const PENALTY_MESSAGE: &str = "WRONG! You lose 5 points and 1 life.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Home,
    NameInput,
    Learning,
    Playing,
    Summary,
    GameOver,
}

/// Verdict on the current question. While present, further answers are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub correct: bool,
    pub message: String,
}

/// Short-lived score animation, independent of `Feedback`.
#[derive(Clone, Debug)]
pub struct PointPulse {
    pub label: &'static str,
    pub gain: bool,
    shown_at: Instant,
}

impl PointPulse {
    fn new(gain: bool, now: Instant) -> Self {
        let label = if gain { "+10" } else { "-5" };
        Self { label, gain, shown_at: now }
    }

    /// Time left in the display window, `None` once it has elapsed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        PULSE_WINDOW
            .checked_sub(now.saturating_duration_since(self.shown_at))
            .filter(|d| !d.is_zero())
    }
}

/// Live state of one playthrough.
#[derive(Clone, Debug)]
pub struct Session {
    pub index: usize,
    pub score: u32,
    pub lives: u32,
    pub difficulty: Difficulty,
    pub feedback: Option<Feedback>,
    pub pulse: Option<PointPulse>,
    /// A fresh question set has been requested and not yet resolved.
    pub loading: bool,
}

impl Session {
    fn new(difficulty: Difficulty, loading: bool) -> Self {
        Self {
            index: 0,
            score: 0,
            lives: MAX_LIVES,
            difficulty,
            feedback: None,
            pulse: None,
            loading,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    OutOfLives,
}

/// What a finished session hands to the leaderboard and the summary screens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub player_name: String,
    pub score: u32,
    pub question_count: usize,
    pub outcome: Outcome,
    pub unlocked: Vec<AchievementId>,
}

/// Where the game's current question set came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionOrigin {
    /// Copied from the shared pool (built-in, configured or prefetched).
    Pool,
    /// Fetched for this game by a `start_session` with `reuse = false`.
    Fetched,
}

/// Permission to apply the result of one question fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub difficulty: Difficulty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Ignored,
    Answered { correct: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advanced {
    Ignored,
    Next { index: usize },
    Finished(SessionResult),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchApplied {
    Replaced(usize),
    KeptExisting,
    Stale,
}

/// Badges earned by a final score. Pure; unlocking is done by the caller.
pub fn evaluate_achievements(final_score: u32, question_count: usize) -> Vec<AchievementId> {
    let mut out = Vec::new();
    if final_score > 0 {
        out.push(AchievementId::FirstWin);
    }
    if u64::from(final_score) == question_count as u64 * u64::from(POINTS_CORRECT) {
        out.push(AchievementId::PerfectScore);
    }
    if final_score >= PRO_SCORE {
        out.push(AchievementId::ProMath);
    }
    out
}

#[derive(Clone, Debug)]
pub struct Game {
    screen: Screen,
    player_name: Option<String>,
    questions: Vec<Question>,
    origin: QuestionOrigin,
    session: Option<Session>,
    achievements: Vec<Achievement>,
    last_result: Option<SessionResult>,
    fetch_generation: u64,
    pending_fetch: Option<u64>,
    notice: Option<String>,
}

impl Game {
    /// New game on the Home screen. An empty or unplayable pool falls back to
    /// the built-in questions so the question list is never empty.
    pub fn new(pool: Vec<Question>) -> Self {
        let questions = playable(pool).unwrap_or_else(default_questions);
        Self {
            screen: Screen::Home,
            player_name: None,
            questions,
            origin: QuestionOrigin::Pool,
            session: None,
            achievements: initial_achievements(),
            last_result: None,
            fetch_generation: 0,
            pending_fetch: None,
            notice: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn player_name(&self) -> Option<&str> {
        self.player_name.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// The question being played, if any.
    pub fn current_question(&self) -> Option<&Question> {
        if self.screen != Screen::Playing {
            return None;
        }
        self.session
            .as_ref()
            .and_then(|s| self.questions.get(s.index))
    }

    fn ensure(&self, command: &'static str, allowed: &[Screen]) -> Result<(), GameError> {
        if allowed.contains(&self.screen) {
            Ok(())
        } else {
            Err(GameError::WrongScreen { command, screen: self.screen })
        }
    }

    /// Adopt the shared question set unless this game fetched its own.
    /// Never changes questions under a running session.
    pub fn sync_with_pool(&mut self, pool: &[Question]) {
        if self.origin != QuestionOrigin::Pool || self.screen == Screen::Playing {
            return;
        }
        if let Some(qs) = playable(pool.to_vec()) {
            self.questions = qs;
        }
    }

    /// "Start" button on Home or Learning: play right away when the player is
    /// known, otherwise ask for a name.
    #[instrument(level = "debug", skip(self), fields(screen = ?self.screen))]
    pub fn request_start(&mut self) -> Result<(), GameError> {
        self.ensure("request_start", &[Screen::Home, Screen::Learning])?;
        if self.player_name.is_some() {
            self.begin(Difficulty::Medium, true);
        } else {
            self.screen = Screen::NameInput;
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, name), fields(name_len = name.len()))]
    pub fn submit_name(&mut self, name: &str) -> Result<(), GameError> {
        self.ensure("submit_name", &[Screen::NameInput])?;
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidInputError::EmptyName.into());
        }
        self.player_name = Some(name.to_string());
        info!(target: "game", player = %name, "Player registered");
        self.begin(Difficulty::Medium, true);
        Ok(())
    }

    pub fn open_learning(&mut self) -> Result<(), GameError> {
        self.ensure(
            "open_learning",
            &[Screen::Home, Screen::Summary, Screen::GameOver],
        )?;
        self.screen = Screen::Learning;
        Ok(())
    }

    /// Back to Home from anywhere. Leaving Playing abandons the session and
    /// any fetch still in flight for it.
    pub fn go_home(&mut self) {
        if self.screen == Screen::Playing {
            debug!(target: "game", "Session abandoned");
            self.session = None;
        }
        self.pending_fetch = None;
        self.notice = None;
        self.screen = Screen::Home;
    }

    /// Reset score, lives and index and enter Playing. With `reuse = false` a
    /// ticket is returned; the caller fetches and reports back through
    /// [`Game::finish_fetch`] while the session shows its loading state.
    #[instrument(level = "debug", skip(self), fields(screen = ?self.screen))]
    pub fn start_session(
        &mut self,
        difficulty: Difficulty,
        reuse: bool,
    ) -> Result<Option<FetchTicket>, GameError> {
        self.ensure(
            "start_session",
            &[Screen::Home, Screen::Learning, Screen::Summary, Screen::GameOver],
        )?;
        if self.player_name.is_none() {
            return Err(InvalidInputError::NameRequired.into());
        }
        Ok(self.begin(difficulty, reuse))
    }

    fn begin(&mut self, difficulty: Difficulty, reuse: bool) -> Option<FetchTicket> {
        self.notice = None;
        self.screen = Screen::Playing;
        self.session = Some(Session::new(difficulty, !reuse));
        self.fetch_generation += 1;
        if reuse {
            self.pending_fetch = None;
            info!(target: "game", %difficulty, questions = self.questions.len(), "Session started with loaded questions");
            None
        } else {
            self.pending_fetch = Some(self.fetch_generation);
            info!(target: "game", %difficulty, generation = self.fetch_generation, "Session started; fetching questions");
            Some(FetchTicket { generation: self.fetch_generation, difficulty })
        }
    }

    /// Apply the outcome of a fetch. Results for a superseded ticket are dropped.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Question>, QuestionFetchError>,
    ) -> FetchApplied {
        if self.pending_fetch != Some(ticket.generation) {
            return FetchApplied::Stale;
        }
        self.pending_fetch = None;
        if let Some(session) = self.session.as_mut() {
            session.loading = false;
        }
        match result.ok().and_then(playable) {
            Some(qs) => {
                let n = qs.len();
                self.questions = qs;
                self.origin = QuestionOrigin::Fetched;
                FetchApplied::Replaced(n)
            }
            None => FetchApplied::KeptExisting,
        }
    }

    /// Score the selected option. Ignored while feedback is pending or while
    /// questions are still loading.
    #[instrument(level = "debug", skip(self, now))]
    pub fn submit_answer(&mut self, option_index: usize, now: Instant) -> Result<AnswerOutcome, GameError> {
        self.ensure("submit_answer", &[Screen::Playing])?;
        let Some(session) = self.session.as_mut() else {
            return Err(GameError::WrongScreen { command: "submit_answer", screen: self.screen });
        };
        if session.feedback.is_some() || session.loading {
            return Ok(AnswerOutcome::Ignored);
        }
        let question = &self.questions[session.index];
        if option_index >= question.options.len() {
            return Err(InvalidInputError::OptionOutOfRange {
                index: option_index,
                options: question.options.len(),
            }
            .into());
        }

        let correct = option_index == question.correct_answer;
        let message = if correct {
            session.score += POINTS_CORRECT;
            PRAISE_MESSAGE.to_string()
        } else {
            session.score = session.score.saturating_sub(POINTS_WRONG);
            session.lives = session.lives.saturating_sub(1);
            format!("{} {}", PENALTY_MESSAGE, question.explanation)
        };
        session.pulse = Some(PointPulse::new(correct, now));
        session.feedback = Some(Feedback { correct, message });
        debug!(target: "game", index = session.index, correct, score = session.score, lives = session.lives, "Answer scored");
        Ok(AnswerOutcome::Answered { correct })
    }

    /// Acknowledge feedback. The out-of-lives check happens here, not when the
    /// wrong answer is given.
    #[instrument(level = "debug", skip(self))]
    pub fn advance(&mut self) -> Result<Advanced, GameError> {
        self.ensure("advance", &[Screen::Playing])?;
        let Some(session) = self.session.as_mut() else {
            return Err(GameError::WrongScreen { command: "advance", screen: self.screen });
        };
        let Some(feedback) = session.feedback.as_ref() else {
            return Ok(Advanced::Ignored);
        };

        if session.lives == 0 && !feedback.correct {
            return Ok(Advanced::Finished(self.finish(Outcome::OutOfLives)));
        }

        session.feedback = None;
        if session.index + 1 < self.questions.len() {
            session.index += 1;
            Ok(Advanced::Next { index: session.index })
        } else {
            Ok(Advanced::Finished(self.finish(Outcome::Completed)))
        }
    }

    fn finish(&mut self, outcome: Outcome) -> SessionResult {
        let score = self.session.take().map(|s| s.score).unwrap_or_default();
        let question_count = self.questions.len();
        let unlocked = match outcome {
            Outcome::Completed => {
                self.screen = Screen::Summary;
                let ids = evaluate_achievements(score, question_count);
                self.unlock(&ids);
                ids
            }
            Outcome::OutOfLives => {
                self.screen = Screen::GameOver;
                Vec::new()
            }
        };
        let result = SessionResult {
            player_name: self.player_name.clone().unwrap_or_default(),
            score,
            question_count,
            outcome,
            unlocked,
        };
        info!(target: "game", player = %result.player_name, score, ?outcome, "Session finished");
        self.last_result = Some(result.clone());
        result
    }

    fn unlock(&mut self, ids: &[AchievementId]) {
        for a in self.achievements.iter_mut() {
            if ids.contains(&a.id) {
                a.unlocked = true;
            }
        }
    }
}

fn playable(questions: Vec<Question>) -> Option<Vec<Question>> {
    let qs: Vec<Question> = questions.into_iter().filter(Question::is_playable).collect();
    if qs.is_empty() {
        None
    } else {
        Some(qs)
    }
}
