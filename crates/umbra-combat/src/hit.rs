//! Hit resolution.
//!
//! This module builds hitboxes for every attacker whose timeline is in the
//! Active phase, queries the broad-phase index, performs precise overlap
//! and arc tests, and computes damage, crits, knockback, and hitstun.
//!
//! The resolver damages targets through their defense pipeline but never
//! removes them; defeat is a flag the arena compacts at end of tick.

use tracing::trace;
use umbra_common::{ActorId, Vec2};

use crate::actor::ActorArena;
use crate::combo::ComboConfig;
use crate::events::{CombatEvent, EventBus};
use crate::spatial::SpatialIndex;

/// Damage multiplier for heavy attacks.
const HEAVY_DAMAGE_MULT: f32 = 1.8;
/// Knockback multiplier for heavy attacks.
const HEAVY_KNOCKBACK_MULT: f32 = 1.8;
/// Maximum damage bonus for hits early in the Active phase.
const EARLY_ACTIVE_BONUS: f32 = 0.15;
/// Vertical knockback is damped to support juggling.
const KNOCKBACK_VERTICAL_SCALE: f32 = 0.7;
/// Constant upward knockback bias.
const KNOCKBACK_LIFT: f32 = 2.0;
/// Hitstun for heavy attacks, in ticks.
const HITSTUN_HEAVY: u32 = 12;
/// Hitstun for normal attacks, in ticks.
const HITSTUN_LIGHT: u32 = 8;
/// Broad-phase query inflation margin.
const BROADPHASE_MARGIN: f32 = 8.0;

/// Hitstun duration for an attack.
#[must_use]
pub fn hitstun_ticks(heavy: bool) -> u32 {
    if heavy {
        HITSTUN_HEAVY
    } else {
        HITSTUN_LIGHT
    }
}

/// Knockback magnitude before the directional bias is applied.
#[must_use]
pub fn knockback_magnitude(base: f32, heavy: bool, combo_count: u8, config: &ComboConfig) -> f32 {
    let heavy_mult = if heavy { HEAVY_KNOCKBACK_MULT } else { 1.0 };
    base * heavy_mult * config.knockback_multiplier(combo_count)
}

/// Full knockback vector: magnitude along the aim direction, vertical
/// component damped and biased upward for juggle potential.
#[must_use]
pub fn knockback_vector(aim: Vec2, magnitude: f32) -> Vec2 {
    let dir = aim.normalized();
    Vec2::new(
        dir.x * magnitude,
        dir.y * magnitude * KNOCKBACK_VERTICAL_SCALE - KNOCKBACK_LIFT,
    )
}

/// One confirmed hit, fed to CombatFeel and mirrored on the event bus.
#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    /// Attacking actor
    pub attacker: ActorId,
    /// Actor that was hit
    pub target: ActorId,
    /// Final damage after defenses
    pub damage: f32,
    /// Whether the hit was a critical
    pub is_crit: bool,
    /// Whether the attack was heavy
    pub is_heavy: bool,
    /// World position of the hit
    pub position: Vec2,
}

/// Resolves hits for active attackers against broad-phase candidates.
#[derive(Debug)]
pub struct HitResolver {
    rng: fastrand::Rng,
    combo: ComboConfig,
}

impl HitResolver {
    /// Creates a resolver with a deterministic seed.
    #[must_use]
    pub fn new(seed: u64, combo: ComboConfig) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            combo,
        }
    }

    /// Resolves every actor with an open damage window against the
    /// opposing faction. Returns the confirmed hits of this tick.
    pub fn resolve_all<S: SpatialIndex>(
        &mut self,
        arena: &mut ActorArena,
        spatial: &S,
        bus: &EventBus,
    ) -> Vec<HitReport> {
        let mut reports = Vec::new();
        for attacker in arena.ids() {
            self.resolve_attacker(attacker, arena, spatial, bus, &mut reports);
        }
        reports
    }

    /// Resolves one attacker's Active hitbox against candidates.
    pub fn resolve_attacker<S: SpatialIndex>(
        &mut self,
        attacker_id: ActorId,
        arena: &mut ActorArena,
        spatial: &S,
        bus: &EventBus,
        reports: &mut Vec<HitReport>,
    ) {
        // Snapshot everything needed from the attacker up front.
        let Some(attacker) = arena.get(attacker_id) else {
            return;
        };
        if attacker.is_defeated() {
            return;
        }
        let Some(hitbox) = attacker.timeline.hitbox(attacker.position) else {
            return;
        };
        let Some(instance) = attacker.timeline.instance() else {
            return;
        };

        let origin = attacker.position;
        let faction = attacker.faction;
        let aim = instance.aim;
        let combo_count = instance.combo_index;
        let def_damage = instance.def.base_damage;
        let def_knockback = instance.def.base_knockback;
        let heavy = instance.def.heavy;
        let damage_type = instance.def.damage_type;
        let crit_chance =
            (attacker.stats.critical_chance + instance.def.crit_bonus).clamp(0.0, 1.0);
        let crit_multiplier = attacker.stats.critical_multiplier;
        let attack_damage = attacker.stats.attack_damage;
        let active_progress = attacker.timeline.active_progress();

        let candidates = spatial.query(hitbox.expanded(BROADPHASE_MARGIN));

        for target_id in candidates {
            if target_id == attacker_id {
                continue;
            }

            // Precise tests against the candidate's current body box.
            let Some(target) = arena.get(target_id) else {
                continue;
            };
            if target.faction == faction || target.is_defeated() {
                continue;
            }
            if !hitbox.overlaps(&target.aabb()) {
                continue;
            }

            let target_center = target.position;
            let target_invulnerable = target.invulnerable;

            {
                let Some(attacker) = arena.get_mut(attacker_id) else {
                    return;
                };
                let Some(instance) = attacker.timeline.instance_mut() else {
                    return;
                };
                if !instance.within_arc(origin, target_center) {
                    continue;
                }
                // Each target is damaged at most once per attempt.
                if !instance.register_hit(target_id) {
                    continue;
                }
            }

            if target_invulnerable {
                trace!(?target_id, "hit absorbed by invulnerability");
                continue;
            }

            // Damage: base x combo x heavy x crit x phase.
            let combo_mult = self.combo.damage_multiplier(combo_count);
            let heavy_mult = if heavy { HEAVY_DAMAGE_MULT } else { 1.0 };
            let is_crit = self.rng.f32() < crit_chance;
            let crit_mult = if is_crit { crit_multiplier } else { 1.0 };
            let phase_mult = 1.0 + (1.0 - active_progress) * EARLY_ACTIVE_BONUS;
            let raw_damage =
                (def_damage + attack_damage) * combo_mult * heavy_mult * crit_mult * phase_mult;

            let magnitude = knockback_magnitude(def_knockback, heavy, combo_count, &self.combo);
            let knockback = knockback_vector(aim, magnitude);
            let stun = hitstun_ticks(heavy);

            let Some(target) = arena.get_mut(target_id) else {
                continue;
            };
            let final_damage = target.take_damage(raw_damage, damage_type);
            target.apply_knockback(knockback);
            target.apply_hitstun(stun);

            let report = HitReport {
                attacker: attacker_id,
                target: target_id,
                damage: final_damage,
                is_crit,
                is_heavy: heavy,
                position: target_center,
            };
            bus.publish(CombatEvent::HitLanded {
                attacker: attacker_id,
                target: target_id,
                damage: final_damage,
                is_crit,
                is_heavy: heavy,
                position: target_center,
            });
            reports.push(report);
        }
    }
}
