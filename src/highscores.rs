//! Local high score table
//!
//! Keeps the top 10 runs. The host persists it as JSON.

use serde::{Deserialize, Serialize};

use crate::session::{RunReport, ScoreSink};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// World units travelled
    pub distance: f64,
    pub crystals: u32,
    /// Seed of the run, for replaying a fixed layout
    pub seed: u64,
}

/// High score leaderboard, sorted by descending score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a finished run in score order; ties rank below earlier runs.
    /// Returns the 1-based rank, or None when the run misses the table
    pub fn add_run(&mut self, report: &RunReport) -> Option<usize> {
        if report.final_score == 0 {
            return None;
        }
        let rank = self
            .entries
            .partition_point(|e| e.score >= report.final_score);
        if rank >= MAX_HIGH_SCORES {
            return None;
        }
        self.entries.insert(
            rank,
            HighScoreEntry {
                score: report.final_score,
                distance: report.distance,
                crystals: report.crystals,
                seed: report.seed,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load a table the host stored earlier; corrupt data starts fresh
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<HighScores>(json) {
            Ok(scores) => {
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Err(err) => {
                log::warn!("Discarding unreadable high scores: {}", err);
                Self::new()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ScoreSink for HighScores {
    fn submit(&mut self, report: &RunReport) {
        if let Some(rank) = self.add_run(report) {
            log::info!("New high score #{}: {}", rank, report.final_score);
        }
    }
}
