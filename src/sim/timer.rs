//! Simulation timers
//!
//! Countdowns, auto-steps and deadlines never call back into the game. The
//! scheduler advances the set after draining intents, and each firing comes
//! back as a [`TimerEvent`] that goes through the same rule handlers as
//! player input.
//!
//! Pausing suspends every armed timer (they are removed, not ignored) and
//! resuming re-arms them with the time they had left. Ending or resetting a
//! run cancels everything and bumps the epoch, so an event produced before
//! teardown is recognisably stale.

use serde::{Deserialize, Serialize};

use super::entity::ObjectId;

/// Fires caught up in a single advance before the rest are dropped
const MAX_CATCH_UP: u32 = 4;

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// 1 Hz countdown
    Countdown,
    /// Periodic movement step
    AutoStep,
    /// Periodic spawn
    PeriodicSpawn,
    /// A specific object's time is up
    Deadline(ObjectId),
    /// Double-points modifier runs out
    DoublePoints,
}

/// Handle for cancelling a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u32);

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    kind: TimerKind,
    remaining_ms: f32,
    period_ms: Option<f32>,
}

/// A timer fired during an advance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerEvent {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub epoch: u32,
}

/// All timers of the current run
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    armed: Vec<Timer>,
    suspended: Vec<Timer>,
    next_handle: u32,
    epoch: u32,
    paused: bool,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&mut self, kind: TimerKind, delay_ms: f32, period_ms: Option<f32>) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let timer = Timer {
            handle,
            kind,
            remaining_ms: delay_ms.max(0.0),
            period_ms: period_ms.map(|p| p.max(1.0)),
        };
        // Arming while paused lands in the suspended set so resume picks it up
        if self.paused {
            self.suspended.push(timer);
        } else {
            self.armed.push(timer);
        }
        handle
    }

    /// Fire once after `delay_ms`
    pub fn arm_once(&mut self, kind: TimerKind, delay_ms: f32) -> TimerHandle {
        self.arm(kind, delay_ms, None)
    }

    /// Fire every `period_ms`, first after one period
    pub fn arm_repeating(&mut self, kind: TimerKind, period_ms: f32) -> TimerHandle {
        self.arm(kind, period_ms, Some(period_ms))
    }

    /// Cancel one timer; false if it was not armed
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.armed.len() + self.suspended.len();
        self.armed.retain(|t| t.handle != handle);
        self.suspended.retain(|t| t.handle != handle);
        before != self.armed.len() + self.suspended.len()
    }

    /// Cancel every timer of a kind; returns how many
    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        let before = self.armed.len() + self.suspended.len();
        self.armed.retain(|t| t.kind != kind);
        self.suspended.retain(|t| t.kind != kind);
        before - (self.armed.len() + self.suspended.len())
    }

    /// Tear down: cancel everything and start a new epoch
    pub fn cancel_all(&mut self) {
        self.armed.clear();
        self.suspended.clear();
        self.paused = false;
        self.epoch += 1;
    }

    /// Pause: move every armed timer aside
    pub fn suspend(&mut self) {
        let mut armed = std::mem::take(&mut self.armed);
        self.suspended.append(&mut armed);
        self.paused = true;
    }

    /// Unpause: re-arm suspended timers with their remaining time
    pub fn resume(&mut self) {
        let mut suspended = std::mem::take(&mut self.suspended);
        self.armed.append(&mut suspended);
        self.armed.sort_by_key(|t| t.handle);
        self.paused = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.paused
    }

    /// Whether an event was produced in the current epoch
    pub fn is_current(&self, event: &TimerEvent) -> bool {
        event.epoch == self.epoch
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Number of armed timers (suspended ones excluded)
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Time left on a timer, armed or suspended
    pub fn remaining_ms(&self, handle: TimerHandle) -> Option<f32> {
        self.armed
            .iter()
            .chain(self.suspended.iter())
            .find(|t| t.handle == handle)
            .map(|t| t.remaining_ms)
    }

    /// Count `dt_ms` down on every armed timer and collect what fired
    ///
    /// Events come out in arming order. One-shot timers are removed when
    /// they fire.
    pub fn advance(&mut self, dt_ms: f32) -> Vec<TimerEvent> {
        let mut fired = Vec::new();
        let epoch = self.epoch;

        for timer in self.armed.iter_mut() {
            timer.remaining_ms -= dt_ms;
            let mut fires = 0;
            while timer.remaining_ms <= 0.0 && fires < MAX_CATCH_UP {
                fired.push(TimerEvent {
                    handle: timer.handle,
                    kind: timer.kind,
                    epoch,
                });
                fires += 1;
                match timer.period_ms {
                    Some(period) => timer.remaining_ms += period,
                    None => break,
                }
            }
            if let Some(period) = timer.period_ms {
                if timer.remaining_ms <= 0.0 {
                    log::warn!("timer {:?} fell behind, skipping missed fires", timer.kind);
                    timer.remaining_ms = period;
                }
            }
        }

        self.armed
            .retain(|t| t.period_ms.is_some() || t.remaining_ms > 0.0);
        fired
    }
}
