//! High score leaderboard
//!
//! Persisted as JSON by the host, tracks the top 10 runs.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Cumulative score at the end of the run
    pub score: u32,
    /// Difficulty level reached
    pub level: u32,
    /// Left through an escape hole rather than being caught
    pub escaped: bool,
    /// Run length in simulation ticks
    pub ticks: u64,
}

/// High score leaderboard, sorted by descending score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Add a run if it qualifies. Returns the rank achieved (1-indexed).
    /// Ties rank below existing entries.
    pub fn add_score(&mut self, entry: HighScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(pos + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }

    /// Load from disk. A missing or unreadable file starts a fresh board.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let scores = std::fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str::<HighScores>(&json).ok());
        match scores {
            Some(scores) => {
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            None => {
                log::info!("No high scores at {}, starting fresh", path.display());
                Self::new()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: u32) -> HighScoreEntry {
        HighScoreEntry {
            score,
            level: 1,
            escaped: false,
            ticks: 600,
        }
    }

    #[test]
    fn test_sorted_insert_and_rank() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_score(entry(10)), Some(1));
        assert_eq!(scores.add_score(entry(30)), Some(1));
        assert_eq!(scores.add_score(entry(20)), Some(2));
        assert_eq!(scores.add_score(entry(20)), Some(3));
        let order: Vec<u32> = scores.entries.iter().map(|e| e.score).collect();
        assert_eq!(order, vec![30, 20, 20, 10]);
        assert_eq!(scores.top_score(), Some(30));
    }

    #[test]
    fn test_zero_never_qualifies() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_score(entry(0)), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_full_board_keeps_best() {
        let mut scores = HighScores::new();
        for s in 1..=MAX_HIGH_SCORES as u32 {
            scores.add_score(entry(s * 10));
        }
        assert!(!scores.qualifies(10));
        assert_eq!(scores.add_score(entry(15)), Some(MAX_HIGH_SCORES));
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries.last().map(|e| e.score), Some(15));
    }

    #[test]
    fn test_save_and_load() {
        let name = format!("cheese-hunter-scores-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        let mut scores = HighScores::new();
        scores.add_score(HighScoreEntry {
            score: 42,
            level: 3,
            escaped: true,
            ticks: 1200,
        });
        scores.save(&path).unwrap();
        let loaded = HighScores::load(&path);
        assert_eq!(loaded.entries, scores.entries);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let loaded = HighScores::load("/nonexistent/cheese-hunter/scores.json");
        assert!(loaded.is_empty());
    }
}
