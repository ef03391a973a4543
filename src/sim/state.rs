//! Authoritative game state
//!
//! Created by a start intent, mutated only inside a tick, frozen while
//! paused, and read one last time for submission when the run ends.

use serde::{Deserialize, Serialize};

use super::generator::max_tier;
use super::rules::GameKind;
use super::scoring::{ScoreDelta, ScoreEvent};
use crate::settings::Tuning;

/// What the depletable counter represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Lives,
    Energy,
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game: GameKind,
    /// Run seed for reproducibility
    pub seed: u64,
    pub score: u64,
    /// Lives or energy, within [0, max_resource]
    pub resource: u32,
    pub max_resource: u32,
    pub resource_kind: ResourceKind,
    /// Consecutive correct resolutions since the last failure
    pub streak: u32,
    pub best_streak: u32,
    /// 1-based, never decreases during a run
    pub level: u32,
    /// Double-points modifier
    pub double_points: bool,
    /// Correct resolutions this run
    pub resolved: u32,
    /// Incorrect resolutions and misses this run
    pub failures: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl GameState {
    /// Fresh state for a run of `game`
    pub fn new(game: GameKind, seed: u64, tuning: &Tuning) -> Self {
        let resource_kind = game.resource_kind();
        let max_resource = match resource_kind {
            ResourceKind::Lives => tuning.lives,
            ResourceKind::Energy => tuning.energy,
        };
        Self {
            game,
            seed,
            score: 0,
            resource: max_resource,
            max_resource,
            resource_kind,
            streak: 0,
            best_streak: 0,
            level: 1,
            double_points: false,
            resolved: 0,
            failures: 0,
            time_ticks: 0,
        }
    }

    /// Difficulty tier unlocked by the current level
    pub fn tier(&self) -> u32 {
        max_tier(self.level)
    }

    /// Apply a delta computed by the scoring engine for `event`
    pub fn apply(&mut self, event: &ScoreEvent, delta: &ScoreDelta) {
        self.score += delta.points;
        let resource = (i64::from(self.resource) + delta.resource).clamp(0, i64::from(self.max_resource));
        self.resource = resource as u32;
        self.streak = delta.streak;
        self.best_streak = self.best_streak.max(self.streak);
        self.double_points = delta.double_points;

        match event {
            ScoreEvent::Correct { .. } => self.resolved += 1,
            ScoreEvent::Incorrect { .. } | ScoreEvent::Miss { .. } => self.failures += 1,
            _ => {}
        }
    }

    /// Move to the next level; levels only go up
    pub fn advance_level(&mut self) {
        self.level += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_per_game() {
        let tuning = Tuning::default();
        let mines = GameState::new(GameKind::MineShaft, 1, &tuning);
        assert_eq!(mines.resource_kind, ResourceKind::Energy);
        assert_eq!(mines.resource, tuning.energy);
        let rain = GameState::new(GameKind::TokenRain, 1, &tuning);
        assert_eq!(rain.resource, tuning.lives);
        assert_eq!(rain.level, 1);
        assert_eq!(rain.tier(), 1);
    }

    #[test]
    fn test_apply_clamps_resource() {
        let mut state = GameState::new(GameKind::TokenRain, 1, &Tuning::default());
        let delta = ScoreDelta {
            resource: 10,
            ..ScoreDelta::default()
        };
        state.apply(&ScoreEvent::Restore { amount: 10 }, &delta);
        assert_eq!(state.resource, state.max_resource);
    }
}
