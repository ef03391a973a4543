//! Score submission boundary
//!
//! When a run ends the core emits one [`Submission`]. Whether it is sent is up
//! to the [`SessionGate`]; where it goes is up to the [`ScoreSubmitter`].
//! [`HighScores`] is a top-10 leaderboard that can stand in for a remote
//! service.

use serde::{Deserialize, Serialize};

use crate::sim::rules::GameKind;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Finalized result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub game: GameKind,
    /// Final score
    pub score: u64,
    /// Level reached
    pub secondary: u32,
    /// Best streak of the run
    pub tertiary: u32,
    /// Whether the run ended in victory
    pub victory: bool,
}

/// Receives finalized runs
pub trait ScoreSubmitter {
    fn submit(&mut self, submission: &Submission);
}

/// Decides whether a submission call is made at all
pub trait SessionGate {
    fn can_submit(&self) -> bool;
}

/// Signed-in session: always submit
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOpen;

impl SessionGate for AlwaysOpen {
    fn can_submit(&self) -> bool {
        true
    }
}

/// No session: never submit
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl SessionGate for Offline {
    fn can_submit(&self) -> bool {
        false
    }
}

/// A single high score entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub game: GameKind,
    /// Player's score
    pub score: u64,
    /// Level reached
    pub level: u32,
    /// Best streak
    pub streak: u32,
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a finished run to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add(&mut self, submission: &Submission) -> Option<usize> {
        if !self.qualifies(submission.score) {
            return None;
        }

        let entry = HighScoreEntry {
            game: submission.game,
            score: submission.score,
            level: submission.secondary,
            streak: submission.tertiary,
        };

        // Sorted descending by score
        let pos = self.entries.iter().position(|e| submission.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }
}

impl ScoreSubmitter for HighScores {
    fn submit(&mut self, submission: &Submission) {
        match self.add(submission) {
            Some(rank) => log::info!("New high score #{rank}: {}", submission.score),
            None => log::debug!("Score {} did not place", submission.score),
        }
    }
}
