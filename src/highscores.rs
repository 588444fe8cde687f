//! Leaderboard persistence
//!
//! A fixed-size table of the best runs, kept sorted by score and stored
//! as JSON next to the binary. Load failures fall back to an empty table
//! so a corrupt file never blocks a new game.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_ENTRIES: usize = 10;

#[derive(Debug, Error)]
pub enum HighScoresError {
    #[error("cannot access high score file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed high score file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub score: u64,
    pub streak: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighScores {
    entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn load(path: &Path) -> Result<Self, HighScoresError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load `path`, or start an empty table if it is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(scores) => scores,
            Err(err) => {
                log::warn!("ignoring high score file {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), HighScoresError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Whether `score` would make the table.
    pub fn is_high_score(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        self.entries.len() < MAX_ENTRIES
            || self.entries.last().is_some_and(|e| score > e.score)
    }

    /// Insert a run, keeping the table sorted and trimmed. Returns the
    /// zero-based rank, or None if the score did not qualify.
    pub fn add(&mut self, name: impl Into<String>, score: u64, streak: u32) -> Option<usize> {
        if !self.is_high_score(score) {
            return None;
        }
        let rank = self
            .entries
            .iter()
            .position(|e| score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            rank,
            HighScoreEntry {
                name: name.into(),
                score,
                streak,
            },
        );
        self.entries.truncate(MAX_ENTRIES);
        Some(rank)
    }

    pub fn entries(&self) -> &[HighScoreEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_stays_sorted_and_trimmed() {
        let mut scores = HighScores::default();
        for i in 1..=12u64 {
            scores.add(format!("p{i}"), i * 100, 1);
        }
        assert_eq!(scores.entries().len(), MAX_ENTRIES);
        assert_eq!(scores.entries()[0].score, 1200);
        assert_eq!(scores.entries()[9].score, 300);
        // 100 and 200 were pushed out.
        assert!(!scores.is_high_score(250));
        assert!(scores.is_high_score(350));
    }

    #[test]
    fn equal_scores_rank_older_first() {
        let mut scores = HighScores::default();
        assert_eq!(scores.add("first", 500, 2), Some(0));
        assert_eq!(scores.add("second", 500, 3), Some(1));
        assert_eq!(scores.entries()[0].name, "first");
    }

    #[test]
    fn zero_never_qualifies() {
        let mut scores = HighScores::default();
        assert!(!scores.is_high_score(0));
        assert_eq!(scores.add("nil", 0, 0), None);
    }
}
