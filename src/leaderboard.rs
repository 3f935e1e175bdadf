//! Top-10 leaderboard: ranking rule, durable store, and the in-memory copy that
//! always mirrors the last snapshot successfully written.

use std::{
  fs, io,
  path::PathBuf,
};

use tracing::{error, info, instrument, warn};

use crate::domain::LeaderboardEntry;
use crate::errors::PersistenceError;

pub const LEADERBOARD_CAPACITY: usize = 10;

/// Durable home of the leaderboard snapshot (one named key).
pub trait LeaderboardStore: Send + Sync {
  /// Read the snapshot. A store that was never written yields an empty list.
  fn load(&self) -> Result<Vec<LeaderboardEntry>, PersistenceError>;
  /// Overwrite the snapshot in full.
  fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), PersistenceError>;
}

/// JSON file store. Writes go to a sibling temp file that is renamed over the
/// target, so a failed write leaves the previous snapshot intact.
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  fn io_err(&self, source: io::Error) -> PersistenceError {
    PersistenceError::Io { path: self.path.clone(), source }
  }
}

impl LeaderboardStore for JsonFileStore {
  fn load(&self) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(s) => s,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(self.io_err(e)),
    };
    if raw.trim().is_empty() {
      return Ok(Vec::new());
    }
    serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
      path: self.path.clone(),
      source,
    })
  }

  fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(entries)?;
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
    }
    let mut tmp = self.path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
    fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
  }
}

/// Append `entry`, order by score descending (ties keep insertion order) and
/// keep the first ten.
pub fn ranked(current: &[LeaderboardEntry], entry: LeaderboardEntry) -> Vec<LeaderboardEntry> {
  let mut next = current.to_vec();
  next.push(entry);
  // `sort_by` is stable, which is what keeps earlier entries ahead on ties.
  next.sort_by(|a, b| b.score.cmp(&a.score));
  next.truncate(LEADERBOARD_CAPACITY);
  next
}

pub struct Leaderboard {
  entries: Vec<LeaderboardEntry>,
  store: Box<dyn LeaderboardStore>,
}

impl Leaderboard {
  /// Load the persisted snapshot. Unreadable data is logged and replaced by an
  /// empty list; the next successful write overwrites it.
  #[instrument(level = "info", skip_all)]
  pub fn open(store: Box<dyn LeaderboardStore>) -> Self {
    let entries = match store.load() {
      Ok(mut entries) => {
        // Normalize hand-edited files so the invariants hold from the start.
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(LEADERBOARD_CAPACITY);
        info!(target: "leaderboard", entries = entries.len(), "Leaderboard loaded");
        entries
      }
      Err(e) => {
        error!(target: "leaderboard", error = %e, "Could not load leaderboard; starting empty");
        Vec::new()
      }
    };
    Self { entries, store }
  }

  pub fn entries(&self) -> &[LeaderboardEntry] {
    &self.entries
  }

  /// Record a finished session. Returns `Ok(false)` without touching anything
  /// when the name is blank. On a failed write the in-memory list keeps the
  /// previous snapshot.
  #[instrument(level = "info", skip(self, name, date), fields(name_len = name.len()))]
  pub fn record(&mut self, name: &str, score: u32, date: String) -> Result<bool, PersistenceError> {
    let name = name.trim();
    if name.is_empty() {
      warn!(target: "leaderboard", "Result without a player name; not recorded");
      return Ok(false);
    }
    let next = ranked(
      &self.entries,
      LeaderboardEntry { name: name.to_string(), score, date },
    );
    self.store.save(&next)?;
    self.entries = next;
    info!(target: "leaderboard", player = %name, score, entries = self.entries.len(), "Result recorded");
    Ok(true)
  }
}


#[cfg(test)]
mod tests {
  use super::memory::MemoryStore;
  use super::*;
  use tempfile::TempDir;

  fn entry(name: &str, score: u32) -> LeaderboardEntry {
    LeaderboardEntry { name: name.into(), score, date: "01/09/2026".into() }
  }

  fn is_sorted_desc(entries: &[LeaderboardEntry]) -> bool {
    entries.windows(2).all(|w| w[0].score >= w[1].score)
  }

  #[test]
  fn ranked_caps_and_sorts_for_any_scores() {
    let mut list = Vec::new();
    for (i, score) in [5u32, 90, 0, 40, 40, 120, 15, 60, 75, 30, 45, 10, 200, 35].into_iter().enumerate() {
      list = ranked(&list, entry(&format!("p{i}"), score));
      assert!(list.len() <= LEADERBOARD_CAPACITY);
      assert!(is_sorted_desc(&list));
    }
    assert_eq!(list.len(), LEADERBOARD_CAPACITY);
    assert_eq!(list[0].score, 200);
  }

  #[test]
  fn ties_keep_insertion_order() {
    let list = ranked(&[entry("first", 40)], entry("second", 40));
    let list = ranked(&list, entry("third", 40));
    let names: Vec<_> = list.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["first", "second", "third"]);
  }

  #[test]
  fn blank_name_leaves_leaderboard_unchanged() {
    let store = MemoryStore::default();
    let mut lb = Leaderboard::open(Box::new(store.clone()));
    lb.record("Lan", 20, "d".into()).unwrap();
    let before = lb.entries().to_vec();

    assert!(!lb.record("   ", 999, "d".into()).unwrap());
    assert_eq!(lb.entries(), before.as_slice());
    assert_eq!(store.saved.lock().unwrap().as_deref(), Some(before.as_slice()));
  }

  #[test]
  fn record_persists_exactly_what_is_held() {
    let store = MemoryStore::default();
    let mut lb = Leaderboard::open(Box::new(store.clone()));
    for i in 0..12 {
      lb.record(&format!(" player{i} "), i * 10, "d".into()).unwrap();
    }
    let saved = store.saved.lock().unwrap().clone().unwrap();
    assert_eq!(lb.entries(), saved.as_slice());
    assert_eq!(saved.len(), LEADERBOARD_CAPACITY);
    assert_eq!(saved[0].name, "player11");
    assert_eq!(saved[9].score, 20);
  }

  #[test]
  fn failed_write_keeps_previous_snapshot() {
    let mut lb = Leaderboard::open(Box::new(MemoryStore::failing()));
    assert!(lb.record("Lan", 30, "d".into()).is_err());
    assert!(lb.entries().is_empty());
  }

  #[test]
  fn file_store_round_trips_and_reopens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("leaderboard.json");

    let mut lb = Leaderboard::open(Box::new(JsonFileStore::new(&path)));
    assert!(lb.entries().is_empty());
    lb.record("Lan", 15, "02/09/2026".into()).unwrap();
    lb.record("Minh", 30, "02/09/2026".into()).unwrap();

    let reopened = Leaderboard::open(Box::new(JsonFileStore::new(&path)));
    assert_eq!(reopened.entries(), lb.entries());
    assert_eq!(reopened.entries()[0].name, "Minh");

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"score\": 30"));
  }

  #[test]
  fn corrupt_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("leaderboard.json");
    fs::write(&path, "{not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(matches!(store.load(), Err(PersistenceError::Corrupt { .. })));
    let lb = Leaderboard::open(Box::new(store));
    assert!(lb.entries().is_empty());
  }

  #[test]
  fn open_normalizes_unsorted_files() {
    let store = MemoryStore::default();
    *store.saved.lock().unwrap() = Some((0..15).map(|i| entry("x", i)).collect());
    let lb = Leaderboard::open(Box::new(store));
    assert_eq!(lb.entries().len(), LEADERBOARD_CAPACITY);
    assert!(is_sorted_desc(lb.entries()));
    assert_eq!(lb.entries()[0].score, 14);
  }
}
