//! Player intents
//!
//! Input handlers never touch simulation state. They submit an [`Intent`]
//! here, and the next tick drains the queue in arrival order and applies
//! each intent as a whole before looking at the next.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::ObjectId;
use super::grid::Direction;
use super::rules::GameKind;

/// What the player asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntentKind {
    /// Begin a run (idle only)
    Start { game: GameKind, seed: u64 },
    /// Toggle pause
    Pause,
    /// Abandon or acknowledge the run and return to idle
    Reset,
    /// Tap/click in simulation units
    Pointer { pos: Vec2 },
    /// Select a board cell (mine reveal)
    Cell { col: i64, row: i64 },
    /// Drop the next queued piece onto a cell
    Place { col: i64, row: i64 },
    /// Turn toward a direction (keys / swipe)
    Steer(Direction),
    /// Return a stack frame; `None` means whatever is on top
    ReturnFrame { id: Option<ObjectId> },
    /// Pick an answer to the open challenge
    Answer { choice: usize },
    /// Open the valve early
    Flow,
    /// Debug: treat the current level as complete
    SkipLevel,
}

impl IntentKind {
    /// Control intents are routed to the state machine and may arrive in
    /// any mode; everything else needs a running game
    pub fn is_control(&self) -> bool {
        matches!(self, IntentKind::Start { .. } | IntentKind::Pause | IntentKind::Reset)
    }
}

/// A timestamped intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Arrival order, unique per queue
    pub seq: u64,
    /// Host timestamp when the input happened
    pub at_ms: f64,
    pub kind: IntentKind,
}

/// Bounded FIFO between input handlers and the tick
#[derive(Debug, Clone)]
pub struct IntentQueue {
    queue: VecDeque<Intent>,
    capacity: usize,
    next_seq: u64,
    overflowed: u64,
}

impl IntentQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
            overflowed: 0,
        }
    }

    /// Enqueue an intent; returns its sequence number, or `None` if full
    pub fn submit(&mut self, at_ms: f64, kind: IntentKind) -> Option<u64> {
        if self.queue.len() >= self.capacity {
            self.overflowed += 1;
            log::warn!("intent queue full, dropping {kind:?}");
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(Intent { seq, at_ms, kind });
        Some(seq)
    }

    /// Take everything queued so far, oldest first
    pub fn drain(&mut self) -> Vec<Intent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Submissions refused because the queue was full
    pub fn overflowed(&self) -> u64 {
        self.overflowed
    }
}
