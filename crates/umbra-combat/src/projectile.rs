//! Boss volley projectiles.
//!
//! Projectiles are spawned by Volley pattern behaviors, advanced by the
//! simulation each tick, and removed on expiry or on their first hit.
//! They hit through a direct overlap test against opposing actors; the
//! broad phase is unnecessary at volley counts.

use serde::{Deserialize, Serialize};
use umbra_common::{Aabb, ActorId, Vec2};

use crate::actor::{ActorArena, Faction};
use crate::events::{CombatEvent, EventBus};
use crate::hit::HitReport;
use crate::stats::DamageType;

/// Default projectile lifetime in ticks.
const DEFAULT_LIFETIME: u32 = 180;
/// Default projectile hitbox radius.
const DEFAULT_RADIUS: f32 = 6.0;

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Actor that fired it.
    pub source: ActorId,
    /// Faction whose actors it can hit.
    pub target_faction: Faction,
    /// Current position.
    pub position: Vec2,
    /// Velocity in units per tick.
    pub velocity: Vec2,
    /// Raw damage on hit.
    pub damage: f32,
    /// Damage type fed to the defense pipeline.
    pub damage_type: DamageType,
    /// Hitbox radius.
    pub radius: f32,
    /// Remaining lifetime in ticks.
    pub lifetime: u32,
}

impl Projectile {
    /// Creates a projectile aimed from a position toward a target point.
    #[must_use]
    pub fn aimed(
        source: ActorId,
        target_faction: Faction,
        from: Vec2,
        toward: Vec2,
        speed: f32,
        damage: f32,
    ) -> Self {
        let dir = (toward - from).normalized();
        let dir = if dir == Vec2::ZERO { Vec2::RIGHT } else { dir };
        Self {
            source,
            target_faction,
            position: from,
            velocity: dir.scaled(speed),
            damage,
            damage_type: DamageType::Physical,
            radius: DEFAULT_RADIUS,
            lifetime: DEFAULT_LIFETIME,
        }
    }

    /// Bounding box at the current position.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.radius, self.radius)
    }

    /// Advances the projectile one tick.
    pub fn tick(&mut self) {
        self.position += self.velocity;
        self.lifetime = self.lifetime.saturating_sub(1);
    }

    /// Whether the projectile has run out of lifetime.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.lifetime == 0
    }
}

/// Owns and advances the live projectiles.
#[derive(Debug, Default)]
pub struct ProjectilePool {
    projectiles: Vec<Projectile>,
}

impl ProjectilePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Adds a projectile.
    pub fn spawn(&mut self, projectile: Projectile) {
        self.projectiles.push(projectile);
    }

    /// Advances every projectile, applies hits, and removes spent ones.
    ///
    /// Returns the hits landed this tick.
    pub fn update(&mut self, arena: &mut ActorArena, bus: &EventBus) -> Vec<HitReport> {
        let mut reports = Vec::new();

        for projectile in &mut self.projectiles {
            projectile.tick();
            if projectile.is_expired() {
                continue;
            }

            let hit = arena.iter().find(|actor| {
                actor.faction == projectile.target_faction
                    && !actor.is_defeated()
                    && !actor.invulnerable
                    && projectile.aabb().overlaps(&actor.aabb())
            });
            let Some(target_id) = hit.map(crate::actor::Actor::id) else {
                continue;
            };

            let position = projectile.position;
            let Some(target) = arena.get_mut(target_id) else {
                continue;
            };
            let damage = target.take_damage(projectile.damage, projectile.damage_type);

            let report = HitReport {
                attacker: projectile.source,
                target: target_id,
                damage,
                is_crit: false,
                is_heavy: false,
                position,
            };
            bus.publish(CombatEvent::HitLanded {
                attacker: projectile.source,
                target: target_id,
                damage,
                is_crit: false,
                is_heavy: false,
                position,
            });
            reports.push(report);

            // Spent on first hit.
            projectile.lifetime = 0;
        }

        self.projectiles.retain(|projectile| !projectile.is_expired());
        reports
    }

    /// Removes every live projectile.
    pub fn clear(&mut self) {
        self.projectiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::stats::StatSheet;

    fn player_at(x: f32) -> Actor {
        Actor::spec(Faction::Player)
            .position(Vec2::new(x, 0.0))
            .half_extents(Vec2::new(10.0, 15.0))
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds")
    }

    #[test]
    fn test_projectile_flies_and_expires() {
        let mut projectile = Projectile::aimed(
            ActorId::from_raw(1),
            Faction::Player,
            Vec2::ZERO,
            Vec2::new(100.0, 0.0),
            4.0,
            10.0,
        );
        projectile.lifetime = 3;

        projectile.tick();
        assert!((projectile.position.x - 4.0).abs() < 1e-5);
        assert!(!projectile.is_expired());

        projectile.tick();
        projectile.tick();
        assert!(projectile.is_expired());
    }

    #[test]
    fn test_projectile_hits_and_is_removed() {
        let mut arena = ActorArena::new();
        let target = arena.insert(player_at(10.0));

        let mut pool = ProjectilePool::new();
        pool.spawn(Projectile::aimed(
            ActorId::from_raw(99),
            Faction::Player,
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
            5.0,
            10.0,
        ));

        let bus = EventBus::default();
        let reports = pool.update(&mut arena, &bus);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].target, target);
        assert!(pool.projectiles().is_empty());
        assert!(arena.get(target).expect("target is live").health < 100.0);
    }

    #[test]
    fn test_projectile_ignores_own_faction() {
        let mut arena = ActorArena::new();
        let hostile = Actor::spec(Faction::Hostile)
            .position(Vec2::new(10.0, 0.0))
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        arena.insert(hostile);

        let mut pool = ProjectilePool::new();
        pool.spawn(Projectile::aimed(
            ActorId::from_raw(99),
            Faction::Player,
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
            5.0,
            10.0,
        ));

        let bus = EventBus::default();
        assert!(pool.update(&mut arena, &bus).is_empty());
        assert_eq!(pool.projectiles().len(), 1);
    }

    #[test]
    fn test_degenerate_aim_defaults_right() {
        let projectile = Projectile::aimed(
            ActorId::from_raw(1),
            Faction::Player,
            Vec2::ZERO,
            Vec2::ZERO,
            3.0,
            10.0,
        );
        assert!(projectile.velocity.x > 0.0);
    }
}
