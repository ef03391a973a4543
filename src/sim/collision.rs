//! Hit testing
//!
//! Pointer games resolve a tap to the top-most active object whose box
//! contains it. Board games map straight to a cell or the top of the stack,
//! with no floating-point containment at all. `None` always means "nothing
//! there" and callers treat it as a no-op.

use glam::Vec2;

use super::entity::{EntityRegistry, GameObject, Lifecycle, ObjectId};
use super::grid::Grid;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn of(obj: &GameObject) -> Self {
        Self::from_center(obj.pos, obj.half_extents)
    }

    /// Inclusive on every edge
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Boxes that only touch along an edge do not overlap
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// Top-most active object under `point`
///
/// Overlapping boxes are tie-broken by the most recently spawned object,
/// which is drawn on top.
pub fn hit_test(registry: &EntityRegistry, point: Vec2) -> Option<ObjectId> {
    registry
        .active()
        .filter(|o| Aabb::of(o).contains(point))
        .map(|o| o.id)
        .max()
}

/// Live objects (spawning or active) whose boxes overlap `id`'s box
pub fn overlapping(registry: &EntityRegistry, id: ObjectId) -> Vec<ObjectId> {
    let Some(subject) = registry.get(id) else {
        return Vec::new();
    };
    let bounds = Aabb::of(subject);
    registry
        .iter()
        .filter(|o| o.id != id)
        .filter(|o| matches!(o.lifecycle, Lifecycle::Spawning | Lifecycle::Active))
        .filter(|o| bounds.overlaps(&Aabb::of(o)))
        .map(|o| o.id)
        .collect()
}

/// Board cell at a signed coordinate, if it is on the board
pub fn grid_hit<T>(grid: &Grid<T>, col: i64, row: i64) -> Option<(usize, usize)> {
    grid.index(col, row).map(|i| grid.coords(i))
}

/// Frame on top of a stack stored bottom-first
pub fn stack_top(stack: &[ObjectId]) -> Option<ObjectId> {
    stack.last().copied()
}
