//! Error types
//!
//! Game-rule failures (running out of lives, a leaking pipe, a blown stack)
//! are simulation state and never show up here. These errors cover stale or
//! malformed requests against the core's containers and configuration I/O.

use thiserror::Error;

use crate::sim::entity::ObjectId;
use crate::sim::phase::{GameMode, Transition};

/// Rejections from the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The object exists but is no longer (or not yet) active
    #[error("object {0} is not active")]
    AlreadyResolved(ObjectId),
    /// No object with this id is alive in the registry
    #[error("object {0} not found in registry")]
    UnknownId(ObjectId),
}

impl RegistryError {
    /// Benign rejections come from stale input racing the simulation
    pub fn is_benign(&self) -> bool {
        matches!(self, RegistryError::AlreadyResolved(_))
    }
}

/// A mode transition the state machine refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition {transition:?} from {from:?}")]
pub struct TransitionError {
    pub from: GameMode,
    pub transition: Transition,
}

/// Out-of-range board access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cell ({col}, {row}) outside {cols}x{rows} grid")]
pub struct GridError {
    pub col: i64,
    pub row: i64,
    pub cols: usize,
    pub rows: usize,
}

/// Failures loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}
