//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by object ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod entity;
pub mod generator;
pub mod grid;
pub mod intent;
pub mod particle;
pub mod phase;
pub mod rules;
pub mod scoring;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod timer;

pub use collision::{Aabb, grid_hit, hit_test, overlapping, stack_top};
pub use entity::{
    Boundary, EntityRegistry, GameObject, Lifecycle, ObjectId, Outcome, Payload, RegistryEvent,
    SnippetClass, SpawnRate,
};
pub use generator::ProceduralGenerator;
pub use grid::{ConnectorMask, Direction, Grid};
pub use intent::{Intent, IntentKind, IntentQueue};
pub use particle::{Effect, Particle, ParticleKind, ParticleSystem};
pub use phase::{Failure, GameMode, GameStateMachine, Transition};
pub use rules::{GameKind, GameRules};
pub use scoring::{ScoreDelta, ScoreEvent, ScoringEngine};
pub use snapshot::{BoardView, ChallengeView, MineTileView, Snapshot};
pub use state::{GameState, ResourceKind};
pub use tick::{Diagnostics, SimulationContext, SimulationScheduler};
pub use timer::{TimerEvent, TimerHandle, TimerKind, TimerSet};
