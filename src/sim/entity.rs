//! Entity registry
//!
//! Owns every active simulation object (falling snippets, stack frames, snake
//! segments, food). Objects live in an arena of slots with a free-list, so
//! removing one never shifts another. Outside code holds [`ObjectId`]s only.
//!
//! Lifecycle: `Spawning` (the tick it was created) -> `Active` (from the next
//! tick) -> `Resolved` or `Expired`. Retired objects are purged at the start
//! of the following tick, after the renderer has seen their final state.

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Stable object identity, strictly increasing in spawn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an object is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Spawning,
    Active,
    Resolved,
    Expired,
}

impl Lifecycle {
    pub fn is_retired(self) -> bool {
        matches!(self, Lifecycle::Resolved | Lifecycle::Expired)
    }
}

/// How a snippet reads to the grammar checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnippetClass {
    /// Well-formed statement
    Valid,
    /// Corrupted statement
    Broken,
    /// Well-formed and grants double points
    Bonus,
}

impl SnippetClass {
    pub fn is_valid(self) -> bool {
        !matches!(self, SnippetClass::Broken)
    }
}

/// Game-specific data carried by an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Falling code snippet
    Snippet {
        text: String,
        class: SnippetClass,
        tier: u32,
    },
    /// Call stack frame
    StackFrame { signature: String, depth: u32 },
    /// One body segment of the snake
    SnakeSegment { col: usize, row: usize },
    /// Something for the snake to eat
    Food { col: usize, row: usize, value: u64 },
}

/// Result of a player's judgement on an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// A simulation object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    pub pos: Vec2,
    pub vel: Option<Vec2>,
    /// Half width / half height of the hit box
    pub half_extents: Vec2,
    pub lifecycle: Lifecycle,
    pub payload: Payload,
    /// Tick the object was spawned on
    pub spawned_tick: u64,
}

/// Line an active object must not cross
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    None,
    /// Expire when the top edge passes below this y
    Below(f32),
    /// Expire when the bottom edge passes above this y
    Above(f32),
    /// Expire when the right edge passes left of this x
    LeftOf(f32),
}

impl Boundary {
    pub fn crossed(&self, obj: &GameObject) -> bool {
        match *self {
            Boundary::None => false,
            Boundary::Below(y) => obj.pos.y - obj.half_extents.y > y,
            Boundary::Above(y) => obj.pos.y + obj.half_extents.y < y,
            Boundary::LeftOf(x) => obj.pos.x + obj.half_extents.x < x,
        }
    }
}

/// How often new objects arrive as a function of elapsed ticks and difficulty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpawnRate {
    /// Spawning is driven by rules or timers, not by the registry
    Never,
    /// Interval shrinks by `step_per_tier` per tier above 1, down to `min_ticks`
    Interval {
        base_ticks: u32,
        min_ticks: u32,
        step_per_tier: u32,
    },
}

impl SpawnRate {
    /// Ticks between spawns at a difficulty tier
    pub fn interval(&self, tier: u32) -> Option<u32> {
        match *self {
            SpawnRate::Never => None,
            SpawnRate::Interval {
                base_ticks,
                min_ticks,
                step_per_tier,
            } => {
                let shrink = step_per_tier.saturating_mul(tier.saturating_sub(1));
                Some(base_ticks.saturating_sub(shrink).max(min_ticks).max(1))
            }
        }
    }

    /// Whether a spawn is due at `elapsed` given the last spawn tick
    pub fn due(&self, elapsed: u64, last_spawn: Option<u64>, tier: u32) -> bool {
        match (self.interval(tier), last_spawn) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => elapsed >= last + u64::from(interval),
        }
    }
}

/// Emitted by the registry for the scoring step
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Resolved {
        id: ObjectId,
        outcome: Outcome,
        pos: Vec2,
        payload: Payload,
    },
    Missed {
        id: ObjectId,
        pos: Vec2,
        payload: Payload,
    },
}

/// Arena of simulation objects
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    slots: Vec<Option<GameObject>>,
    free: Vec<usize>,
    index: HashMap<ObjectId, usize>,
    next_id: u32,
    tick: u64,
    boundary: Boundary,
    spawn_rate: SpawnRate,
    last_spawn_tick: Option<u64>,
    events: Vec<RegistryEvent>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(Boundary::None, SpawnRate::Never)
    }
}

impl EntityRegistry {
    pub fn new(boundary: Boundary, spawn_rate: SpawnRate) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            tick: 0,
            boundary,
            spawn_rate,
            last_spawn_tick: None,
            events: Vec::new(),
        }
    }

    /// Swap the boundary and spawn cadence for a new game or level
    pub fn configure(&mut self, boundary: Boundary, spawn_rate: SpawnRate) {
        self.boundary = boundary;
        self.spawn_rate = spawn_rate;
        self.last_spawn_tick = None;
    }

    /// Drop every object and rewind the tick counter. Ids keep counting up.
    pub fn clear(&mut self) {
        self.tick = 0;
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.events.clear();
        self.last_spawn_tick = None;
    }

    /// Start a new tick: purge retired objects from the previous one
    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
        self.purge_retired();
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Spawn a new object in the `Spawning` state
    pub fn spawn(&mut self, payload: Payload, pos: Vec2, vel: Option<Vec2>, half_extents: Vec2) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let object = GameObject {
            id,
            pos,
            vel,
            half_extents,
            lifecycle: Lifecycle::Spawning,
            payload,
            spawned_tick: self.tick,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(object);
                slot
            }
            None => {
                self.slots.push(Some(object));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        id
    }

    /// Spawn only if the spawn-rate strategy says one is due
    pub fn spawn_due(&mut self, elapsed: u64, tier: u32) -> bool {
        if self.spawn_rate.due(elapsed, self.last_spawn_tick, tier) {
            self.last_spawn_tick = Some(elapsed);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.index.get(&id).and_then(|&slot| self.slots[slot].as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        match self.index.get(&id) {
            Some(&slot) => self.slots[slot].as_mut(),
            None => None,
        }
    }

    /// Judge an active object. Emits a `Resolved` event.
    pub fn resolve(&mut self, id: ObjectId, outcome: Outcome) -> Result<(), RegistryError> {
        let obj = self.get_mut(id).ok_or(RegistryError::UnknownId(id))?;
        if obj.lifecycle != Lifecycle::Active {
            return Err(RegistryError::AlreadyResolved(id));
        }
        obj.lifecycle = Lifecycle::Resolved;
        let event = RegistryEvent::Resolved {
            id,
            outcome,
            pos: obj.pos,
            payload: obj.payload.clone(),
        };
        self.events.push(event);
        Ok(())
    }

    /// Expire one active object (timed out). Emits a `Missed` event.
    pub fn expire(&mut self, id: ObjectId) -> Result<(), RegistryError> {
        let obj = self.get_mut(id).ok_or(RegistryError::UnknownId(id))?;
        if obj.lifecycle != Lifecycle::Active {
            return Err(RegistryError::AlreadyResolved(id));
        }
        obj.lifecycle = Lifecycle::Expired;
        let event = RegistryEvent::Missed {
            id,
            pos: obj.pos,
            payload: obj.payload.clone(),
        };
        self.events.push(event);
        Ok(())
    }

    /// Remove an object immediately without emitting anything
    pub fn retire(&mut self, id: ObjectId) -> Result<GameObject, RegistryError> {
        let slot = self.index.remove(&id).ok_or(RegistryError::UnknownId(id))?;
        self.free.push(slot);
        self.slots[slot].take().ok_or(RegistryError::UnknownId(id))
    }

    /// Promote last tick's spawns and integrate velocities
    pub fn advance(&mut self, dt: f32) {
        let tick = self.tick;
        for obj in self.slots.iter_mut().flatten() {
            if obj.lifecycle == Lifecycle::Spawning && obj.spawned_tick < tick {
                obj.lifecycle = Lifecycle::Active;
            }
            if obj.lifecycle == Lifecycle::Active {
                if let Some(vel) = obj.vel {
                    obj.pos += vel * dt;
                }
            }
        }
    }

    /// Expire every active object past the boundary; returns how many
    ///
    /// Resolved objects are skipped, so a resolution earlier in the same
    /// tick always wins over expiry.
    pub fn expire_out_of_bounds(&mut self) -> usize {
        let boundary = self.boundary;
        let mut crossed: Vec<ObjectId> = self
            .slots
            .iter()
            .flatten()
            .filter(|o| o.lifecycle == Lifecycle::Active && boundary.crossed(o))
            .map(|o| o.id)
            .collect();
        crossed.sort();
        for id in &crossed {
            // Cannot fail: the id was just read from an active slot
            let _ = self.expire(*id);
        }
        crossed.len()
    }

    fn purge_retired(&mut self) {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if entry.as_ref().is_some_and(|o| o.lifecycle.is_retired()) {
                if let Some(obj) = entry.take() {
                    self.index.remove(&obj.id);
                    self.free.push(slot);
                }
            }
        }
    }

    /// Events emitted since the last drain, in emission order
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    /// All live objects in spawn order
    pub fn iter(&self) -> impl Iterator<Item = &GameObject> {
        let mut objects: Vec<&GameObject> = self.slots.iter().flatten().collect();
        objects.sort_by_key(|o| o.id);
        objects.into_iter()
    }

    /// Active objects in spawn order
    pub fn active(&self) -> impl Iterator<Item = &GameObject> {
        self.iter().filter(|o| o.lifecycle == Lifecycle::Active)
    }

    /// Objects still waiting on the player (spawning or active)
    pub fn unresolved_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|o| matches!(o.lifecycle, Lifecycle::Spawning | Lifecycle::Active))
            .count()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Slots allocated so far (live + free)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
