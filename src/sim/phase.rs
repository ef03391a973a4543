//! Game state machine
//!
//! ```text
//! idle -> playing <-> paused
//!            |
//!            +-> gameover | victory   (terminal; only Reset leaves)
//! ```
//!
//! Reset is accepted from every mode, which is how a finished run is
//! acknowledged and how a live run is abandoned.

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Why a run ended badly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    /// Lives or energy hit zero
    ResourceDepleted,
    /// Flow-fill ran out of pipe before the sink
    Leak,
    /// A structural rule broke (snake hit a wall or itself)
    InvalidStructure,
    /// Too many unresolved objects, or stack capacity exceeded
    Overflow,
}

/// Current mode of the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Idle,
    Playing,
    Paused,
    GameOver(Failure),
    Victory,
}

impl GameMode {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameMode::GameOver(_) | GameMode::Victory)
    }
}

/// Requested mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Start,
    Pause,
    Resume,
    Fail(Failure),
    Win,
    Reset,
}

/// Authoritative mode controller
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    mode: GameMode,
    transitions: u64,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self {
            mode: GameMode::Idle,
            transitions: 0,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.mode == GameMode::Playing
    }

    pub fn is_terminal(&self) -> bool {
        self.mode.is_terminal()
    }

    /// Number of transitions taken since creation
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Target mode if `transition` is legal from the current mode
    pub fn target(&self, transition: Transition) -> Option<GameMode> {
        match (self.mode, transition) {
            (_, Transition::Reset) => Some(GameMode::Idle),
            (GameMode::Idle, Transition::Start) => Some(GameMode::Playing),
            (GameMode::Playing, Transition::Pause) => Some(GameMode::Paused),
            (GameMode::Paused, Transition::Resume) => Some(GameMode::Playing),
            (GameMode::Playing, Transition::Fail(failure)) => Some(GameMode::GameOver(failure)),
            (GameMode::Playing, Transition::Win) => Some(GameMode::Victory),
            _ => None,
        }
    }

    /// Take a transition, or refuse it and leave the mode untouched
    pub fn apply(&mut self, transition: Transition) -> Result<GameMode, TransitionError> {
        let from = self.mode;
        let to = self
            .target(transition)
            .ok_or(TransitionError { from, transition })?;
        self.mode = to;
        self.transitions += 1;
        log::info!("mode {from:?} -> {to:?}");
        Ok(to)
    }

    /// End-of-tick evaluation: the first failure wins, then victory
    pub fn evaluate(&mut self, failures: &[Failure], victory: bool) -> Option<GameMode> {
        if !self.is_playing() {
            return None;
        }
        if let Some(&failure) = failures.first() {
            return self.apply(Transition::Fail(failure)).ok();
        }
        if victory {
            return self.apply(Transition::Win).ok();
        }
        None
    }
}
