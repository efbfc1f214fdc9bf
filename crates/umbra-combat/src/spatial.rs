//! External interface seams: broad-phase spatial index and terrain state.
//!
//! The combat core never resolves terrain collision and never owns the
//! authoritative spatial structure; both are injected behind these traits.
//! A uniform hash-grid implementation and test mocks ship here.

use ahash::{AHashMap, AHashSet};
use umbra_common::{Aabb, ActorId, Vec2};

use crate::actor::ActorArena;

/// Broad-phase candidate query.
///
/// Returns actors possibly overlapping the bounds; callers must follow up
/// with a precise test. Called once per active attacker per tick.
pub trait SpatialIndex {
    /// Queries broad-phase candidates for a bounding box.
    fn query(&self, bounds: Aabb) -> Vec<ActorId>;
}

/// Read-only terrain and physics state per actor.
///
/// Used only to gate movement-based attack behaviors (dash/lunge); the
/// core never integrates velocities or resolves contacts.
pub trait TerrainQuery {
    /// Whether the actor is standing on ground.
    fn on_ground(&self, actor: ActorId) -> bool;

    /// The actor's current velocity.
    fn velocity(&self, actor: ActorId) -> Vec2;
}

/// Uniform hash-grid broad phase.
///
/// Rebuilt from the arena each tick; each actor's body box is inserted
/// into every cell it touches.
#[derive(Debug)]
pub struct GridIndex {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<ActorId>>,
}

impl Default for GridIndex {
    fn default() -> Self {
        Self::new(64.0)
    }
}

impl GridIndex {
    /// Creates a grid with the given cell size.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: AHashMap::new(),
        }
    }

    /// Clears and re-inserts every live actor from the arena.
    pub fn rebuild(&mut self, arena: &ActorArena) {
        self.cells.clear();
        for actor in arena.iter() {
            let aabb = actor.aabb();
            let (min_cx, min_cy) = self.cell_of(aabb.min_x, aabb.min_y);
            let (max_cx, max_cy) = self.cell_of(aabb.max_x, aabb.max_y);
            for cx in min_cx..=max_cx {
                for cy in min_cy..=max_cy {
                    self.cells.entry((cx, cy)).or_default().push(actor.id());
                }
            }
        }
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }
}

impl SpatialIndex for GridIndex {
    fn query(&self, bounds: Aabb) -> Vec<ActorId> {
        let (min_cx, min_cy) = self.cell_of(bounds.min_x, bounds.min_y);
        let (max_cx, max_cy) = self.cell_of(bounds.max_x, bounds.max_y);

        let mut seen = AHashSet::new();
        let mut result = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                if let Some(ids) = self.cells.get(&(cx, cy)) {
                    for &id in ids {
                        if seen.insert(id) {
                            result.push(id);
                        }
                    }
                }
            }
        }
        result
    }
}

/// Mock spatial index for testing: returns a preset candidate list.
#[derive(Debug, Default)]
pub struct MockSpatialIndex {
    candidates: Vec<ActorId>,
}

impl MockSpatialIndex {
    /// Creates an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that always returns the given candidates.
    #[must_use]
    pub fn with_candidates(candidates: Vec<ActorId>) -> Self {
        Self { candidates }
    }

    /// Replaces the candidate list.
    pub fn set_candidates(&mut self, candidates: Vec<ActorId>) {
        self.candidates = candidates;
    }
}

impl SpatialIndex for MockSpatialIndex {
    fn query(&self, _bounds: Aabb) -> Vec<ActorId> {
        self.candidates.clone()
    }
}

/// Mock terrain for testing.
#[derive(Debug, Default)]
pub struct MockTerrain {
    airborne: AHashSet<ActorId>,
    velocities: AHashMap<ActorId, Vec2>,
}

impl MockTerrain {
    /// Creates a mock where every actor is grounded and still.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an actor as airborne.
    pub fn set_airborne(&mut self, actor: ActorId) {
        self.airborne.insert(actor);
    }

    /// Sets an actor's velocity.
    pub fn set_velocity(&mut self, actor: ActorId, velocity: Vec2) {
        self.velocities.insert(actor, velocity);
    }
}

impl TerrainQuery for MockTerrain {
    fn on_ground(&self, actor: ActorId) -> bool {
        !self.airborne.contains(&actor)
    }

    fn velocity(&self, actor: ActorId) -> Vec2 {
        self.velocities.get(&actor).copied().unwrap_or(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Faction};
    use crate::stats::StatSheet;

    fn spawn_at(arena: &mut ActorArena, x: f32, y: f32) -> ActorId {
        let actor = Actor::spec(Faction::Hostile)
            .position(Vec2::new(x, y))
            .half_extents(Vec2::new(10.0, 10.0))
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        arena.insert(actor)
    }

    #[test]
    fn test_grid_finds_nearby_actor() {
        let mut arena = ActorArena::new();
        let near = spawn_at(&mut arena, 30.0, 0.0);
        let far = spawn_at(&mut arena, 500.0, 500.0);

        let mut grid = GridIndex::new(64.0);
        grid.rebuild(&arena);

        let hits = grid.query(Aabb::new(0.0, -20.0, 60.0, 20.0));
        assert!(hits.contains(&near));
        assert!(!hits.contains(&far));
    }

    #[test]
    fn test_grid_deduplicates_spanning_actors() {
        let mut arena = ActorArena::new();
        // Straddles a cell boundary at x = 64.
        let spanning = spawn_at(&mut arena, 64.0, 0.0);

        let mut grid = GridIndex::new(64.0);
        grid.rebuild(&arena);

        let hits = grid.query(Aabb::new(0.0, -32.0, 128.0, 32.0));
        assert_eq!(hits.iter().filter(|&&id| id == spanning).count(), 1);
    }

    #[test]
    fn test_grid_rebuild_clears_previous() {
        let mut arena = ActorArena::new();
        let id = spawn_at(&mut arena, 30.0, 0.0);

        let mut grid = GridIndex::new(64.0);
        grid.rebuild(&arena);

        arena
            .get_mut(id)
            .expect("actor is live")
            .take_damage(1000.0, crate::stats::DamageType::True);
        arena.end_tick();
        grid.rebuild(&arena);

        assert!(grid.query(Aabb::new(0.0, -20.0, 60.0, 20.0)).is_empty());
    }

    #[test]
    fn test_mock_terrain_defaults() {
        let terrain = MockTerrain::new();
        let id = ActorId::from_raw(1);
        assert!(terrain.on_ground(id));
        assert_eq!(terrain.velocity(id), Vec2::ZERO);
    }

    #[test]
    fn test_mock_terrain_airborne() {
        let mut terrain = MockTerrain::new();
        let id = ActorId::from_raw(1);
        terrain.set_airborne(id);
        assert!(!terrain.on_ground(id));
    }
}
