//! Game settings and gameplay tuning
//!
//! Loaded from a JSON file when one is given, otherwise defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 256,
            QualityPreset::High => 1024,
        }
    }

    /// Burst size multiplier (1.0 = full)
    pub fn burst_scale(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }
}

/// Gameplay balance numbers
///
/// Every game instance reads its costs, rates and thresholds from here so a
/// balance pass never touches rule code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Starting and maximum lives for life-based games
    pub lives: u32,
    /// Starting and maximum energy for energy-based games
    pub energy: u32,
    /// Points for a correct resolution at tier 1 (scales linearly with tier)
    pub base_points: u64,
    /// Extra points per step of the current streak
    pub streak_bonus: u64,
    /// Resource lost on a miss
    pub miss_cost: u32,
    /// Resource lost on an incorrect resolution
    pub incorrect_cost: u32,
    /// Points per cleared unit, multiplied by tier
    pub clear_unit_points: u64,
    /// Cumulative score needed per level in stream games
    pub level_score_step: u64,
    /// Cumulative score needed per level in board games
    pub board_score_step: u64,
    /// Level whose completion wins the run
    pub final_level: u32,
    /// Unresolved objects allowed before the well overflows
    pub max_unresolved: usize,
    /// Call stack capacity
    pub stack_capacity: usize,
    /// Ticks between falling-token spawns at tier 1
    pub spawn_interval_ticks: u32,
    /// Fastest spawn cadence reachable
    pub min_spawn_interval_ticks: u32,
    /// Spawn interval reduction per tier
    pub spawn_interval_step: u32,
    /// Fall speed at tier 1 (units per second)
    pub fall_speed: f32,
    /// Extra fall speed per tier
    pub fall_speed_step: f32,
    /// Pipe countdown before the valve opens
    pub countdown_secs: u32,
    /// Energy spent per revealed mine tile
    pub reveal_cost: u32,
    /// Energy lost to a hazard tile
    pub hazard_cost: u32,
    /// Bonus for answering a mine challenge
    pub challenge_bonus: u64,
    /// Milliseconds between call-stack pushes at tier 1
    pub frame_push_ms: f32,
    /// Milliseconds a frame may wait before it times out
    pub frame_deadline_ms: f32,
    /// Milliseconds between snake steps at tier 1
    pub snake_step_ms: f32,
    /// How long a double-points modifier lasts
    pub double_points_ms: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            lives: 3,
            energy: 30,
            base_points: 100,
            streak_bonus: 20,
            miss_cost: 1,
            incorrect_cost: 1,
            clear_unit_points: 10,
            level_score_step: 1000,
            board_score_step: 300,
            final_level: 8,
            max_unresolved: 24,
            stack_capacity: 8,
            spawn_interval_ticks: 90,
            min_spawn_interval_ticks: 24,
            spawn_interval_step: 12,
            fall_speed: 60.0,
            fall_speed_step: 15.0,
            countdown_secs: 30,
            reveal_cost: 1,
            hazard_cost: 5,
            challenge_bonus: 50,
            frame_push_ms: 2500.0,
            frame_deadline_ms: 7000.0,
            snake_step_ms: 160.0,
            double_points_ms: 5000.0,
        }
    }
}

impl Tuning {
    /// Cumulative score that completes `level`
    pub fn completion_threshold(&self, level: u32, board_game: bool) -> u64 {
        let step = if board_game {
            self.board_score_step
        } else {
            self.level_score_step
        };
        step * u64::from(level)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Particle effects (bursts on hits, clears, misses)
    pub particles: bool,
    /// Reduced motion (smaller bursts)
    pub reduced_motion: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Silence all cues
    pub muted: bool,

    // === Diagnostics ===
    /// Panic on broken internal contracts instead of logging and continuing
    pub strict_contracts: bool,
    /// Intents buffered between two ticks before new ones are dropped
    pub intent_capacity: usize,

    /// Gameplay balance
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            reduced_motion: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            strict_contracts: cfg!(debug_assertions),
            intent_capacity: crate::consts::INTENT_QUEUE_CAPACITY,
            tuning: Tuning::default(),
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Effective burst size multiplier (respects reduced_motion)
    pub fn burst_scale(&self) -> f32 {
        let scale = self.quality.burst_scale();
        if self.reduced_motion { scale * 0.5 } else { scale }
    }

    /// Parse settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&text)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                log::warn!("Using default settings: {e}");
                Self::default()
            }),
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }
}
