//! Scoring engine
//!
//! A pure function of (event, current state) to a [`ScoreDelta`]. No RNG, no
//! clock, no hidden counters: replaying the same events from the same state
//! reproduces the same score, resource and streak trajectory exactly.

use serde::{Deserialize, Serialize};

use super::state::GameState;
use crate::settings::Tuning;

/// Economy-relevant things that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreEvent {
    /// Correct resolution of content from `tier`, plus a category/combo bonus
    Correct { tier: u32, bonus: u64 },
    /// Wrong judgement; `cost` overrides the default resource cost
    Incorrect { cost: Option<u32> },
    /// Something required slipped past; `cost` overrides the default
    Miss { cost: Option<u32> },
    /// `units` cleared at once (ore veins, pipe cells)
    LevelClear { units: u32, tier: u32 },
    /// Resource spent on an action; does not touch the streak
    Spend { cost: u32 },
    /// Resource restored, clamped to the maximum
    Restore { amount: u32 },
    /// Turn the double-points modifier on or off
    Double(bool),
}

/// Change produced by one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub points: u64,
    pub resource: i64,
    /// Streak after the event
    pub streak: u32,
    /// Double-points modifier after the event
    pub double_points: bool,
    /// The resource hit zero because of this event
    pub depleted: bool,
}

/// Point and cost rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringEngine {
    base_points: u64,
    streak_bonus: u64,
    miss_cost: u32,
    incorrect_cost: u32,
    clear_unit_points: u64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

impl ScoringEngine {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            base_points: tuning.base_points,
            streak_bonus: tuning.streak_bonus,
            miss_cost: tuning.miss_cost,
            incorrect_cost: tuning.incorrect_cost,
            clear_unit_points: tuning.clear_unit_points,
        }
    }

    /// Points for a correct resolution at `tier`
    pub fn base(&self, tier: u32) -> u64 {
        self.base_points * u64::from(tier.max(1))
    }

    /// Bonus earned by the streak held before the resolution
    pub fn streak_bonus(&self, streak: u32) -> u64 {
        self.streak_bonus * u64::from(streak)
    }

    /// Bonus for clearing `units` at `tier`; each unit adds the same amount
    pub fn clear_bonus(&self, units: u32, tier: u32) -> u64 {
        u64::from(units) * self.clear_unit_points * u64::from(tier.max(1))
    }

    pub fn evaluate(&self, event: &ScoreEvent, state: &GameState) -> ScoreDelta {
        let mut delta = ScoreDelta {
            points: 0,
            resource: 0,
            streak: state.streak,
            double_points: state.double_points,
            depleted: false,
        };

        match *event {
            ScoreEvent::Correct { tier, bonus } => {
                let mut points = self.base(tier) + self.streak_bonus(state.streak) + bonus;
                if state.double_points {
                    points *= 2;
                }
                delta.points = points;
                delta.streak = state.streak + 1;
            }
            ScoreEvent::Incorrect { cost } => {
                delta.streak = 0;
                delta.resource = -i64::from(cost.unwrap_or(self.incorrect_cost));
            }
            ScoreEvent::Miss { cost } => {
                delta.streak = 0;
                delta.resource = -i64::from(cost.unwrap_or(self.miss_cost));
            }
            ScoreEvent::LevelClear { units, tier } => {
                delta.points = self.clear_bonus(units, tier);
            }
            ScoreEvent::Spend { cost } => {
                delta.resource = -i64::from(cost);
            }
            ScoreEvent::Restore { amount } => {
                let room = state.max_resource.saturating_sub(state.resource);
                delta.resource = i64::from(amount.min(room));
            }
            ScoreEvent::Double(on) => {
                delta.double_points = on;
            }
        }

        if delta.resource < 0 {
            // Never take more than what is left
            delta.resource = delta.resource.max(-i64::from(state.resource));
            delta.depleted = i64::from(state.resource) + delta.resource <= 0;
        }
        delta
    }
}
