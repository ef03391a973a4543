//! Presentation snapshot
//!
//! A by-value copy of everything a renderer may draw. Built after the tick
//! has finished; nothing in here points back into the simulation.

use serde::{Deserialize, Serialize};

use super::entity::{GameObject, ObjectId};
use super::generator::{OreKind, PipeCell};
use super::grid::{ConnectorMask, Direction};
use super::particle::Particle;
use super::phase::GameMode;
use super::state::GameState;

/// A mine tile as the player may see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MineTileView {
    Hidden,
    Ore(OreKind),
    Rock,
    Hazard,
    Challenge,
}

/// An open challenge without its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeView {
    pub prompt: String,
    pub choices: Vec<String>,
}

/// Per-game board and HUD data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoardView {
    /// Games drawn entirely from objects
    None,
    Mines {
        cols: usize,
        rows: usize,
        cells: Vec<MineTileView>,
        ore_remaining: u32,
        challenge: Option<ChallengeView>,
    },
    Pipes {
        cols: usize,
        rows: usize,
        cells: Vec<PipeCell>,
        source: (usize, usize),
        sink: (usize, usize),
        /// Upcoming pieces, next first
        upcoming: Vec<ConnectorMask>,
        seconds_left: u32,
        valve_open: bool,
    },
    Stack {
        /// Bottom frame first
        frames: Vec<ObjectId>,
        capacity: usize,
    },
    Snake {
        cols: usize,
        rows: usize,
        heading: Direction,
        length: usize,
    },
}

/// Read-only view of one finished tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticks simulated while playing
    pub tick: u64,
    pub mode: GameMode,
    pub state: Option<GameState>,
    /// Live objects in spawn order
    pub objects: Vec<GameObject>,
    pub particles: Vec<Particle>,
    pub board: BoardView,
}

impl Snapshot {
    /// One-line summary for logs and terminal screens
    pub fn summary(&self) -> String {
        match &self.state {
            Some(s) => format!(
                "{:?} score={} {:?}={} level={} streak={} best={}",
                self.mode, s.score, s.resource_kind, s.resource, s.level, s.streak, s.best_streak
            ),
            None => format!("{:?}", self.mode),
        }
    }
}
