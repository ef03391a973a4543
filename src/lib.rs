//! Arcade Core - shared simulation kernel for a family of arcade games
//!
//! Core modules:
//! - `sim`: Deterministic simulation (scheduler, entities, particles, scoring, game modes)
//! - `settings`: Configuration and gameplay tuning
//! - `audio`: Named audio cues handed to an external player
//! - `highscores`: Score submission boundary and an in-memory leaderboard
//! - `error`: Error types for API misuse and broken invariants

pub mod audio;
pub mod error;
pub mod highscores;
pub mod settings;
pub mod sim;

pub use audio::{AudioCue, AudioSink, LogAudio, NullAudio};
pub use highscores::{HighScores, ScoreSubmitter, SessionGate, Submission};
pub use settings::{QualityPreset, Settings, Tuning};
pub use sim::{SimulationScheduler, Snapshot};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (60 Hz display refresh)
    pub const SIM_DT_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest wall-clock gap a single frame may account for
    pub const MAX_FRAME_MS: f32 = 100.0;

    /// Playfield dimensions in simulation units
    pub const ARENA_WIDTH: f32 = 800.0;
    pub const ARENA_HEIGHT: f32 = 600.0;

    /// Edge length of one board cell (mines, pipes, snake)
    pub const CELL_SIZE: f32 = 50.0;

    /// Default bound on queued intents between two ticks
    pub const INTENT_QUEUE_CAPACITY: usize = 256;
}

/// Center of the playfield
#[inline]
pub fn arena_center() -> Vec2 {
    Vec2::new(consts::ARENA_WIDTH / 2.0, consts::ARENA_HEIGHT / 2.0)
}

/// Center point of a board cell in simulation units
#[inline]
pub fn cell_center(col: usize, row: usize) -> Vec2 {
    Vec2::new(
        (col as f32 + 0.5) * consts::CELL_SIZE,
        (row as f32 + 0.5) * consts::CELL_SIZE,
    )
}

/// Board cell containing a point, if the point is not left of / above the board
#[inline]
pub fn point_to_cell(pos: Vec2) -> Option<(usize, usize)> {
    if pos.x < 0.0 || pos.y < 0.0 {
        return None;
    }
    Some((
        (pos.x / consts::CELL_SIZE) as usize,
        (pos.y / consts::CELL_SIZE) as usize,
    ))
}
