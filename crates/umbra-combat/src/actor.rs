//! Actors and the simulation arena.
//!
//! This module provides:
//! - [`Actor`]: position, facing, health, hitstun, and an attack timeline
//! - [`ActorSpec`]: construction with a mandatory stat sheet
//! - [`ActorArena`]: index-stable storage with end-of-tick removal
//!
//! Defeat is a flag, not a removal: the arena keeps a defeated actor in
//! place until [`ActorArena::end_tick`] so the hit pass never mutates the
//! collection it is iterating.

use serde::{Deserialize, Serialize};
use umbra_common::{Aabb, ActorId, CombatError, CombatResult, Vec2};

use crate::stats::{DamageType, StatSheet};
use crate::timeline::AttackTimeline;

/// Which side of the fight an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// The player character.
    Player,
    /// Enemies and bosses.
    Hostile,
}

impl Faction {
    /// The opposing faction.
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Hostile,
            Self::Hostile => Self::Player,
        }
    }
}

/// A combat actor owned by the simulation.
#[derive(Debug, Clone)]
pub struct Actor {
    id: ActorId,
    /// Which side this actor fights for.
    pub faction: Faction,
    /// Center position in world units.
    pub position: Vec2,
    /// Half extents of the body box.
    pub half_extents: Vec2,
    /// Unit facing/aim direction.
    pub facing: Vec2,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Stat sheet attached at construction.
    pub stats: StatSheet,
    /// Attack timeline for this actor's own attacks.
    pub timeline: AttackTimeline,
    /// Remaining hitstun ticks; the actor is unresponsive while > 0.
    hitstun: u32,
    /// Knockback accumulated this tick, drained by the physics layer.
    pending_knockback: Vec2,
    /// Damage is ignored while set (boss phase transitions).
    pub invulnerable: bool,
    defeated: bool,
}

impl Actor {
    /// Starts building an actor for a faction.
    #[must_use]
    pub fn spec(faction: Faction) -> ActorSpec {
        ActorSpec::new(faction)
    }

    /// This actor's ID.
    #[must_use]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Body bounding box at the current position.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents.x, self.half_extents.y)
    }

    /// Health as a fraction of maximum, in [0, 1].
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Whether this actor has been defeated.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Remaining hitstun ticks.
    #[must_use]
    pub fn hitstun(&self) -> u32 {
        self.hitstun
    }

    /// Whether the actor is currently in hitstun.
    #[must_use]
    pub fn in_hitstun(&self) -> bool {
        self.hitstun > 0
    }

    /// Applies raw damage through the defense pipeline.
    ///
    /// Returns the final damage subtracted from health, or zero for a
    /// defeated or invulnerable actor (both are silent no-ops). Crossing
    /// zero health sets the terminal defeated flag; removal from the arena
    /// is deferred to end of tick.
    pub fn take_damage(&mut self, raw_damage: f32, damage_type: DamageType) -> f32 {
        if self.defeated || self.invulnerable {
            return 0.0;
        }

        let final_damage = self.stats.apply_defense(raw_damage, damage_type);
        self.health -= final_damage;

        if self.health <= 0.0 {
            self.health = 0.0;
            self.defeated = true;
        }

        final_damage
    }

    /// Applies hitstun; never shortens an existing stun.
    pub fn apply_hitstun(&mut self, ticks: u32) {
        self.hitstun = self.hitstun.max(ticks);
    }

    /// Accumulates knockback for the physics layer to drain.
    pub fn apply_knockback(&mut self, knockback: Vec2) {
        self.pending_knockback += knockback;
    }

    /// Drains accumulated knockback.
    pub fn drain_knockback(&mut self) -> Vec2 {
        std::mem::take(&mut self.pending_knockback)
    }

    /// Heals the actor, capped at maximum health. No-op once defeated.
    pub fn heal(&mut self, amount: f32) {
        if self.defeated {
            return;
        }
        self.health = (self.health + amount).min(self.max_health);
    }

    /// Per-tick bookkeeping: hitstun countdown and timeline advance.
    pub fn tick(&mut self) -> Option<crate::timeline::TimelineSignal> {
        if self.defeated {
            return None;
        }
        self.hitstun = self.hitstun.saturating_sub(1);
        self.timeline.tick()
    }
}

/// Builder for [`Actor`].
///
/// The stat sheet is mandatory: [`ActorSpec::build`] fails with
/// [`CombatError::MissingStats`] rather than defaulting to zero damage.
#[derive(Debug, Clone)]
pub struct ActorSpec {
    faction: Faction,
    position: Vec2,
    half_extents: Vec2,
    facing: Vec2,
    max_health: f32,
    stats: Option<StatSheet>,
}

impl ActorSpec {
    /// Creates a spec for a faction.
    #[must_use]
    pub fn new(faction: Faction) -> Self {
        Self {
            faction,
            position: Vec2::ZERO,
            half_extents: Vec2::new(16.0, 24.0),
            facing: Vec2::RIGHT,
            max_health: 100.0,
            stats: None,
        }
    }

    /// Sets the starting position.
    #[must_use]
    pub fn position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Sets the body half extents.
    #[must_use]
    pub fn half_extents(mut self, half_extents: Vec2) -> Self {
        self.half_extents = half_extents;
        self
    }

    /// Sets the initial facing direction.
    #[must_use]
    pub fn facing(mut self, facing: Vec2) -> Self {
        self.facing = facing.normalized();
        self
    }

    /// Sets maximum (and starting) health.
    #[must_use]
    pub fn max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health.max(1.0);
        self
    }

    /// Attaches the stat sheet. Required.
    #[must_use]
    pub fn stats(mut self, stats: StatSheet) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Builds the actor.
    pub fn build(self) -> CombatResult<Actor> {
        let stats = self.stats.ok_or(CombatError::MissingStats)?;

        Ok(Actor {
            id: ActorId::new(),
            faction: self.faction,
            position: self.position,
            half_extents: self.half_extents,
            facing: self.facing,
            health: self.max_health,
            max_health: self.max_health,
            stats,
            timeline: AttackTimeline::new(),
            hitstun: 0,
            pending_knockback: Vec2::ZERO,
            invulnerable: false,
            defeated: false,
        })
    }
}

/// Index-stable storage for live actors.
///
/// Slots are never reordered during a tick; defeated actors stay in place
/// until [`ActorArena::end_tick`] compacts them out.
#[derive(Debug, Default)]
pub struct ActorArena {
    slots: Vec<Option<Actor>>,
}

impl ActorArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an actor, reusing a free slot if one exists.
    pub fn insert(&mut self, actor: Actor) -> ActorId {
        let id = actor.id();
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(actor);
        } else {
            self.slots.push(Some(actor));
        }
        id
    }

    /// Looks up an actor by ID.
    #[must_use]
    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.slots
            .iter()
            .flatten()
            .find(|actor| actor.id() == id)
    }

    /// Looks up an actor mutably by ID.
    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|actor| actor.id() == id)
    }

    /// Iterates over live actors.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.slots.iter().flatten()
    }

    /// Iterates over live actors mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.slots.iter_mut().flatten()
    }

    /// Snapshot of live actor IDs, stable for the duration of a tick.
    #[must_use]
    pub fn ids(&self) -> Vec<ActorId> {
        self.slots
            .iter()
            .flatten()
            .map(Actor::id)
            .collect()
    }

    /// Number of live actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether the arena holds no live actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes defeated actors and returns their IDs.
    ///
    /// Must only be called at end of tick, after the hit pass.
    pub fn end_tick(&mut self) -> Vec<ActorId> {
        let mut removed = Vec::new();
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(Actor::is_defeated) {
                if let Some(actor) = slot.take() {
                    removed.push(actor.id());
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hostile() -> Actor {
        Actor::spec(Faction::Hostile)
            .max_health(50.0)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds")
    }

    #[test]
    fn test_missing_stats_is_hard_error() {
        let result = Actor::spec(Faction::Player).build();
        assert!(matches!(result, Err(CombatError::MissingStats)));
    }

    #[test]
    fn test_take_damage_applies_defense() {
        let mut actor = Actor::spec(Faction::Hostile)
            .max_health(100.0)
            .stats(StatSheet::new().with_defense(4.0))
            .build()
            .expect("spec with stats builds");

        let taken = actor.take_damage(10.0, DamageType::Physical);
        assert!((taken - 6.0).abs() < 1e-6);
        assert!((actor.health - 94.0).abs() < 1e-6);
    }

    #[test]
    fn test_lethal_damage_sets_defeated() {
        let mut actor = hostile();
        actor.take_damage(100.0, DamageType::True);
        assert!(actor.is_defeated());
        assert_eq!(actor.health, 0.0);
    }

    #[test]
    fn test_damage_on_defeated_is_noop() {
        let mut actor = hostile();
        actor.take_damage(100.0, DamageType::True);
        assert_eq!(actor.take_damage(10.0, DamageType::True), 0.0);
        assert_eq!(actor.health, 0.0);
    }

    #[test]
    fn test_damage_while_invulnerable_is_noop() {
        let mut actor = hostile();
        actor.invulnerable = true;
        assert_eq!(actor.take_damage(10.0, DamageType::Physical), 0.0);
        assert_eq!(actor.health, 50.0);
    }

    #[test]
    fn test_hitstun_never_shortens() {
        let mut actor = hostile();
        actor.apply_hitstun(12);
        actor.apply_hitstun(8);
        assert_eq!(actor.hitstun(), 12);
    }

    #[test]
    fn test_hitstun_counts_down() {
        let mut actor = hostile();
        actor.apply_hitstun(2);
        actor.tick();
        assert!(actor.in_hitstun());
        actor.tick();
        assert!(!actor.in_hitstun());
    }

    #[test]
    fn test_knockback_accumulates_and_drains() {
        let mut actor = hostile();
        actor.apply_knockback(Vec2::new(5.0, -2.0));
        actor.apply_knockback(Vec2::new(1.0, 0.0));

        assert_eq!(actor.drain_knockback(), Vec2::new(6.0, -2.0));
        assert_eq!(actor.drain_knockback(), Vec2::ZERO);
    }

    #[test]
    fn test_defeated_tick_is_noop() {
        let mut actor = hostile();
        actor.take_damage(100.0, DamageType::True);

        let before = actor.health;
        for _ in 0..10 {
            assert!(actor.tick().is_none());
        }
        assert_eq!(actor.health, before);
        assert!(actor.is_defeated());
    }

    #[test]
    fn test_arena_deferred_removal() {
        let mut arena = ActorArena::new();
        let a = arena.insert(hostile());
        let b = arena.insert(hostile());

        arena
            .get_mut(a)
            .expect("actor a is live")
            .take_damage(100.0, DamageType::True);

        // Still present mid-tick.
        assert_eq!(arena.len(), 2);

        let removed = arena.end_tick();
        assert_eq!(removed, vec![a]);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn test_arena_reuses_slots() {
        let mut arena = ActorArena::new();
        let a = arena.insert(hostile());
        arena
            .get_mut(a)
            .expect("actor a is live")
            .take_damage(100.0, DamageType::True);
        arena.end_tick();

        arena.insert(hostile());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_health_fraction() {
        let mut actor = hostile();
        assert!((actor.health_fraction() - 1.0).abs() < 1e-6);
        actor.take_damage(25.0, DamageType::True);
        assert!((actor.health_fraction() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut actor = hostile();
        actor.take_damage(20.0, DamageType::True);
        actor.heal(100.0);
        assert_eq!(actor.health, 50.0);
    }
}
