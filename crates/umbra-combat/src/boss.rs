//! Boss encounter orchestration.
//!
//! This module provides:
//! - [`BossPhase`]: a health-bounded behavior profile with its own pattern
//!   pool and pacing
//! - [`BossEncounter`]: the AI state machine driving pattern selection,
//!   telegraphed attacks, phase transitions, and defeat
//!
//! The boss itself is an ordinary arena actor; the encounter drives that
//! actor's attack timeline and position. Pattern execution dispatches on
//! [`crate::attack::BehaviorTag`], never on pattern names.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use umbra_common::{ActorId, AttackId, CombatError, CombatResult, Vec2};

use crate::actor::ActorArena;
use crate::attack::{AttackDefinition, BehaviorTag};
use crate::events::{CombatEvent, EventBus};
use crate::projectile::{Projectile, ProjectilePool};
use crate::spatial::TerrainQuery;
use crate::timeline::TimelinePhase;

/// Telegraph visibility ramps from 0 to this value across the windup.
const TELEGRAPH_MAX: f32 = 200.0;
/// Cosmetic shake amplitude during a phase transition.
const TRANSITION_SHAKE: f32 = 5.0;
/// Ticks of damage flash after a hit (cosmetic).
const DAMAGE_FLASH_TICKS: u32 = 10;

/// Boss AI states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossState {
    /// Waiting between actions.
    Idle,
    /// Post-transition taunt.
    Taunt,
    /// Choosing the next attack pattern.
    PatternSelect,
    /// Telegraphing the chosen pattern.
    AttackWindup,
    /// The pattern's damage/behavior window.
    AttackExecute,
    /// Recovering after a pattern.
    AttackRecovery,
    /// Opened up for punishment.
    Vulnerable,
    /// Crossing into a new phase; invulnerable.
    PhaseTransition,
    /// Externally stunned (parried).
    Stunned,
    /// Terminal.
    Defeated,
}

/// Fixed state durations and cooldowns, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossTimings {
    /// Phase transition hold.
    pub phase_transition: u32,
    /// Taunt duration after a transition.
    pub taunt: u32,
    /// Stun hold.
    pub stun: u32,
    /// Vulnerable hold.
    pub vulnerable: u32,
    /// Global cooldown after any pattern completes.
    pub global_cooldown: u32,
}

impl Default for BossTimings {
    fn default() -> Self {
        Self {
            phase_transition: 180,
            taunt: 60,
            stun: 120,
            vulnerable: 120,
            global_cooldown: 60,
        }
    }
}

fn default_attack_frequency() -> u32 {
    120
}

fn default_special_chance() -> f32 {
    0.2
}

/// A health-bounded behavior profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossPhase {
    /// Health fraction at or below which this phase is active.
    pub health_threshold: f32,
    /// Patterns available in this phase.
    pub patterns: Vec<AttackDefinition>,
    /// Ticks the decision timer must reach before the next attack.
    #[serde(default = "default_attack_frequency")]
    pub attack_frequency: u32,
    /// Chance to prefer a special pattern when one is off cooldown.
    #[serde(default = "default_special_chance")]
    pub special_attack_chance: f32,
    /// Set once the entry transition for this phase has played.
    #[serde(default, skip_serializing)]
    pub transition_played: bool,
}

impl BossPhase {
    /// Creates a phase with a threshold and pattern pool.
    #[must_use]
    pub fn new(health_threshold: f32, patterns: Vec<AttackDefinition>) -> Self {
        Self {
            health_threshold,
            patterns,
            attack_frequency: 120,
            special_attack_chance: 0.2,
            transition_played: false,
        }
    }

    /// Sets the decision pacing.
    #[must_use]
    pub fn with_frequency(mut self, ticks: u32) -> Self {
        self.attack_frequency = ticks;
        self
    }

    /// Sets the special-attack chance.
    #[must_use]
    pub fn with_special_chance(mut self, chance: f32) -> Self {
        self.special_attack_chance = chance.clamp(0.0, 1.0);
        self
    }
}

/// Multi-phase boss AI state machine.
#[derive(Debug)]
pub struct BossEncounter {
    actor: ActorId,
    /// Phases sorted by descending health threshold.
    phases: Vec<BossPhase>,
    current_phase_index: usize,
    state: BossState,
    /// Ticks spent in the current state.
    state_ticks: u32,
    /// Per-pattern cooldowns; definitions stay immutable.
    cooldowns: AHashMap<AttackId, u32>,
    /// Global cooldown between any two patterns.
    attack_cooldown: u32,
    decision_timer: u32,
    current_pattern: Option<AttackDefinition>,
    volley_spawned: u32,
    telegraph: f32,
    shake_offset: Vec2,
    damage_flash: u32,
    last_health: Option<f32>,
    timings: BossTimings,
    rng: fastrand::Rng,
    defeated: bool,
}

impl BossEncounter {
    /// Creates an encounter driving the given arena actor.
    ///
    /// Phases are sorted by descending threshold; an empty phase list is a
    /// configuration error.
    pub fn new(actor: ActorId, mut phases: Vec<BossPhase>, seed: u64) -> CombatResult<Self> {
        if phases.is_empty() {
            return Err(CombatError::NoPhases);
        }
        phases.sort_by(|a, b| {
            b.health_threshold
                .partial_cmp(&a.health_threshold)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(Self {
            actor,
            phases,
            current_phase_index: 0,
            state: BossState::Idle,
            state_ticks: 0,
            cooldowns: AHashMap::new(),
            attack_cooldown: 0,
            decision_timer: 0,
            current_pattern: None,
            volley_spawned: 0,
            telegraph: 0.0,
            shake_offset: Vec2::ZERO,
            damage_flash: 0,
            last_health: None,
            timings: BossTimings::default(),
            rng: fastrand::Rng::with_seed(seed),
            defeated: false,
        })
    }

    /// Overrides the fixed state durations.
    #[must_use]
    pub fn with_timings(mut self, timings: BossTimings) -> Self {
        self.timings = timings;
        self
    }

    /// The arena actor this encounter drives.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Current AI state.
    #[must_use]
    pub fn state(&self) -> BossState {
        self.state
    }

    /// Index of the active phase.
    #[must_use]
    pub fn current_phase_index(&self) -> usize {
        self.current_phase_index
    }

    /// The active phase.
    #[must_use]
    pub fn current_phase(&self) -> &BossPhase {
        &self.phases[self.current_phase_index]
    }

    /// Telegraph visibility, 0 to 200, for the presentation layer.
    #[must_use]
    pub fn telegraph(&self) -> f32 {
        self.telegraph
    }

    /// Cosmetic shake offset during phase transitions.
    #[must_use]
    pub fn shake_offset(&self) -> Vec2 {
        self.shake_offset
    }

    /// Whether the damage flash is showing (cosmetic).
    #[must_use]
    pub fn damage_flash(&self) -> bool {
        self.damage_flash > 0
    }

    /// Whether the encounter has ended.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// The pattern currently being executed, if any.
    #[must_use]
    pub fn current_pattern(&self) -> Option<&AttackDefinition> {
        self.current_pattern.as_ref()
    }

    /// Resolves the phase for a health fraction: the lowest threshold still
    /// at or above the fraction, falling back to the lowest-threshold phase.
    #[must_use]
    pub fn phase_index_for(&self, health_fraction: f32) -> usize {
        let mut resolved = None;
        for (index, phase) in self.phases.iter().enumerate() {
            if phase.health_threshold >= health_fraction {
                resolved = Some(index);
            }
        }
        resolved.unwrap_or(self.phases.len() - 1)
    }

    /// Externally stuns the boss (e.g. a parry).
    ///
    /// Ignored while defeated or mid phase transition.
    pub fn stun(&mut self, arena: &mut ActorArena) {
        if matches!(self.state, BossState::Defeated | BossState::PhaseTransition) {
            return;
        }
        if let Some(actor) = arena.get_mut(self.actor) {
            actor.timeline.reset();
        }
        self.current_pattern = None;
        self.telegraph = 0.0;
        self.enter(BossState::Stunned);
    }

    /// Opens the boss up for punishment.
    pub fn make_vulnerable(&mut self, arena: &mut ActorArena) {
        if matches!(self.state, BossState::Defeated | BossState::PhaseTransition) {
            return;
        }
        if let Some(actor) = arena.get_mut(self.actor) {
            actor.timeline.reset();
        }
        self.current_pattern = None;
        self.telegraph = 0.0;
        self.enter(BossState::Vulnerable);
    }

    fn enter(&mut self, state: BossState) {
        self.state = state;
        self.state_ticks = 0;
    }

    /// Advances the encounter one tick.
    ///
    /// Drives the boss actor's timeline, cooldowns, phase transitions, and
    /// the state machine. `target` is the actor the boss fights.
    pub fn tick<T: TerrainQuery>(
        &mut self,
        arena: &mut ActorArena,
        terrain: &T,
        projectiles: &mut ProjectilePool,
        target: ActorId,
        bus: &EventBus,
    ) {
        if self.state == BossState::Defeated {
            return;
        }

        // Cooldown and cosmetic bookkeeping.
        for cooldown in self.cooldowns.values_mut() {
            *cooldown = cooldown.saturating_sub(1);
        }
        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);
        self.damage_flash = self.damage_flash.saturating_sub(1);

        // Advance the boss actor (timeline + hitstun).
        let (health, health_fraction, actor_defeated) = {
            let Some(actor) = arena.get_mut(self.actor) else {
                return;
            };
            actor.tick();
            (actor.health, actor.health_fraction(), actor.is_defeated())
        };

        if self.last_health.is_some_and(|last| health < last) {
            self.damage_flash = DAMAGE_FLASH_TICKS;
        }
        self.last_health = Some(health);

        if actor_defeated {
            self.trigger_defeat(bus);
            return;
        }

        // Phase transition check.
        if self.state != BossState::PhaseTransition {
            let resolved = self.phase_index_for(health_fraction);
            if resolved != self.current_phase_index && !self.phases[resolved].transition_played {
                self.begin_phase_transition(resolved, arena, bus);
                return;
            }
        }

        self.state_ticks += 1;

        match self.state {
            BossState::Idle => self.tick_idle(),
            BossState::Taunt => {
                if self.state_ticks >= self.timings.taunt {
                    self.enter(BossState::Idle);
                }
            }
            BossState::PatternSelect => self.tick_pattern_select(arena, target, bus),
            BossState::AttackWindup => self.tick_attack_windup(arena),
            BossState::AttackExecute => {
                self.tick_attack_execute(arena, terrain, projectiles, target, bus);
            }
            BossState::AttackRecovery => self.tick_attack_recovery(arena),
            BossState::Vulnerable => {
                if self.state_ticks >= self.timings.vulnerable {
                    self.enter(BossState::Idle);
                }
            }
            BossState::PhaseTransition => self.tick_phase_transition(arena),
            BossState::Stunned => {
                if self.state_ticks >= self.timings.stun {
                    self.enter(BossState::Idle);
                }
            }
            BossState::Defeated => {}
        }

        // Face the target outside terminal/transition states.
        if !matches!(self.state, BossState::Defeated | BossState::PhaseTransition) {
            self.face_target(arena, target);
        }
    }

    fn tick_idle(&mut self) {
        self.decision_timer += 1;
        if self.decision_timer >= self.current_phase().attack_frequency && self.attack_cooldown == 0
        {
            self.decision_timer = 0;
            self.enter(BossState::PatternSelect);
        }
    }

    fn tick_pattern_select(&mut self, arena: &mut ActorArena, target: ActorId, bus: &EventBus) {
        let Some(pattern) = self.select_pattern() else {
            // Everything on cooldown; benign, wait for the next decision.
            debug!(phase = self.current_phase_index, "no pattern available");
            self.enter(BossState::Idle);
            return;
        };

        let aim = self.aim_at(arena, target);
        let started = arena
            .get_mut(self.actor)
            .is_some_and(|actor| actor.timeline.start(&pattern, aim, 0));
        if !started {
            self.enter(BossState::Idle);
            return;
        }

        bus.publish(CombatEvent::AttackStarted {
            actor: self.actor,
            heavy: pattern.heavy,
        });
        self.current_pattern = Some(pattern);
        self.volley_spawned = 0;
        self.telegraph = 0.0;
        self.enter(BossState::AttackWindup);
    }

    /// Filters the phase pool by cooldown and rolls for a special pattern.
    fn select_pattern(&mut self) -> Option<AttackDefinition> {
        let phase = &self.phases[self.current_phase_index];
        let available: Vec<&AttackDefinition> = phase
            .patterns
            .iter()
            .filter(|pattern| self.cooldowns.get(&pattern.id).copied().unwrap_or(0) == 0)
            .collect();

        if available.is_empty() {
            return None;
        }

        if self.rng.f32() < phase.special_attack_chance {
            let specials: Vec<&&AttackDefinition> = available
                .iter()
                .filter(|pattern| pattern.special)
                .collect();
            if !specials.is_empty() {
                let pick = self.rng.usize(..specials.len());
                return Some((*specials[pick]).clone());
            }
        }

        let pick = self.rng.usize(..available.len());
        Some(available[pick].clone())
    }

    fn tick_attack_windup(&mut self, arena: &mut ActorArena) {
        let Some(actor) = arena.get(self.actor) else {
            return;
        };
        match actor.timeline.phase() {
            TimelinePhase::Windup => {
                self.telegraph = TELEGRAPH_MAX * actor.timeline.phase_progress();
            }
            TimelinePhase::Active => {
                self.telegraph = TELEGRAPH_MAX;
                self.enter(BossState::AttackExecute);
            }
            // Timeline was interrupted out from under the attack.
            _ => self.abort_attack(),
        }
    }

    fn tick_attack_execute<T: TerrainQuery>(
        &mut self,
        arena: &mut ActorArena,
        terrain: &T,
        projectiles: &mut ProjectilePool,
        target: ActorId,
        bus: &EventBus,
    ) {
        let Some(pattern) = self.current_pattern.clone() else {
            self.abort_attack();
            return;
        };

        let phase = arena.get(self.actor).map(|actor| actor.timeline.phase());
        match phase {
            Some(TimelinePhase::Active) => {
                self.dispatch_behavior(&pattern, arena, terrain, projectiles, target, bus);
            }
            Some(TimelinePhase::Recovery) => {
                self.telegraph = 0.0;
                self.enter(BossState::AttackRecovery);
            }
            _ => self.abort_attack(),
        }
    }

    /// Per-pattern behavior, dispatched by capability tag.
    fn dispatch_behavior<T: TerrainQuery>(
        &mut self,
        pattern: &AttackDefinition,
        arena: &mut ActorArena,
        terrain: &T,
        projectiles: &mut ProjectilePool,
        target: ActorId,
        bus: &EventBus,
    ) {
        match pattern.behavior {
            // The timeline's Active hitbox does all the work.
            BehaviorTag::Strike => {}
            BehaviorTag::Volley { count, speed } => {
                if count == 0 {
                    return;
                }
                let interval = (pattern.active / count).max(1);
                let due = (self.state_ticks - 1) % interval == 0 && self.volley_spawned < count;
                if !due {
                    return;
                }

                let Some(target_pos) = arena.get(target).map(|actor| actor.position) else {
                    return;
                };
                let Some(boss) = arena.get(self.actor) else {
                    return;
                };
                let damage = pattern.base_damage + boss.stats.attack_damage;
                let projectile = Projectile::aimed(
                    self.actor,
                    boss.faction.opponent(),
                    boss.position,
                    target_pos,
                    speed,
                    damage,
                );
                bus.publish(CombatEvent::ProjectileSpawned {
                    position: projectile.position,
                    velocity: projectile.velocity,
                });
                projectiles.spawn(projectile);
                self.volley_spawned += 1;
            }
            BehaviorTag::Rush { speed } => {
                // Grounded dashes only; the terrain seam is read-only.
                if !terrain.on_ground(self.actor) {
                    return;
                }
                if let Some(boss) = arena.get_mut(self.actor) {
                    let direction = if boss.facing.x < 0.0 { -1.0 } else { 1.0 };
                    boss.position.x += direction * speed;
                }
            }
            BehaviorTag::Blink { offset } => {
                if self.state_ticks != 1 {
                    return;
                }
                let Some(target_pos) = arena.get(target).map(|actor| actor.position) else {
                    return;
                };
                if let Some(boss) = arena.get_mut(self.actor) {
                    let side = if boss.facing.x < 0.0 { -1.0 } else { 1.0 };
                    boss.position = Vec2::new(target_pos.x + side * offset, target_pos.y);
                }
            }
        }
    }

    fn tick_attack_recovery(&mut self, arena: &mut ActorArena) {
        let phase = arena.get(self.actor).map(|actor| actor.timeline.phase());
        match phase {
            Some(TimelinePhase::Recovery) => {}
            _ => {
                // Pattern complete: cooldowns, then back to Idle.
                if let Some(pattern) = self.current_pattern.take() {
                    self.cooldowns.insert(pattern.id, pattern.cooldown);
                }
                self.attack_cooldown = self.timings.global_cooldown;
                self.telegraph = 0.0;
                self.enter(BossState::Idle);
            }
        }
    }

    fn begin_phase_transition(
        &mut self,
        resolved: usize,
        arena: &mut ActorArena,
        bus: &EventBus,
    ) {
        info!(
            from = self.current_phase_index,
            to = resolved,
            "boss phase transition"
        );

        self.current_phase_index = resolved;
        self.phases[resolved].transition_played = true;
        self.current_pattern = None;
        self.telegraph = 0.0;

        if let Some(actor) = arena.get_mut(self.actor) {
            actor.timeline.reset();
            actor.invulnerable = true;
        }

        bus.publish(CombatEvent::PhaseTransition {
            phase_index: resolved,
        });
        self.enter(BossState::PhaseTransition);
    }

    fn tick_phase_transition(&mut self, arena: &mut ActorArena) {
        // Cosmetic shudder in bursts while the transition holds.
        if self.state_ticks % 10 < 5 {
            self.shake_offset = Vec2::new(
                (self.rng.f32() * 2.0 - 1.0) * TRANSITION_SHAKE,
                (self.rng.f32() * 2.0 - 1.0) * TRANSITION_SHAKE,
            );
        } else {
            self.shake_offset = Vec2::ZERO;
        }

        if self.state_ticks >= self.timings.phase_transition {
            self.shake_offset = Vec2::ZERO;
            if let Some(actor) = arena.get_mut(self.actor) {
                actor.invulnerable = false;
            }
            self.enter(BossState::Taunt);
        }
    }

    /// Publishes the defeat if the boss actor died during the hit pass.
    ///
    /// Call after hit resolution and before arena compaction, so a killing
    /// blow lands the `BossDefeated` event in the tick it happened.
    pub fn sync_defeat(&mut self, arena: &ActorArena, bus: &EventBus) {
        if self.defeated {
            return;
        }
        let gone = arena
            .get(self.actor)
            .map_or(true, crate::actor::Actor::is_defeated);
        if gone {
            self.trigger_defeat(bus);
        }
    }

    fn trigger_defeat(&mut self, bus: &EventBus) {
        if self.defeated {
            return;
        }
        info!("boss defeated");
        self.defeated = true;
        self.current_pattern = None;
        self.telegraph = 0.0;
        self.shake_offset = Vec2::ZERO;
        bus.publish(CombatEvent::BossDefeated { boss: self.actor });
        self.enter(BossState::Defeated);
    }

    fn abort_attack(&mut self) {
        self.current_pattern = None;
        self.telegraph = 0.0;
        self.enter(BossState::Idle);
    }

    fn aim_at(&self, arena: &ActorArena, target: ActorId) -> Vec2 {
        let Some(boss) = arena.get(self.actor) else {
            return Vec2::RIGHT;
        };
        let Some(target) = arena.get(target) else {
            return boss.facing;
        };
        let aim = (target.position - boss.position).normalized();
        if aim == Vec2::ZERO {
            Vec2::RIGHT
        } else {
            aim
        }
    }

    fn face_target(&self, arena: &mut ActorArena, target: ActorId) {
        let target_x = arena.get(target).map(|actor| actor.position.x);
        let Some(target_x) = target_x else {
            return;
        };
        if let Some(boss) = arena.get_mut(self.actor) {
            if !boss.timeline.is_attacking() {
                boss.facing = if target_x < boss.position.x {
                    Vec2::new(-1.0, 0.0)
                } else {
                    Vec2::RIGHT
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Faction};
    use crate::spatial::MockTerrain;
    use crate::stats::{DamageType, StatSheet};

    fn strike_pattern(id: u32) -> AttackDefinition {
        AttackDefinition::new(AttackId::new(id), "Slash", 30, 15, 30)
            .with_damage(15.0)
            .with_cooldown(180)
    }

    fn three_phase_boss(arena: &mut ActorArena) -> (BossEncounter, ActorId, ActorId) {
        let boss_actor = Actor::spec(Faction::Hostile)
            .position(Vec2::new(200.0, 0.0))
            .max_health(1000.0)
            .stats(StatSheet::new().with_attack_damage(0.0))
            .build()
            .expect("spec with stats builds");
        let boss_id = arena.insert(boss_actor);

        let player = Actor::spec(Faction::Player)
            .position(Vec2::ZERO)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        let player_id = arena.insert(player);

        let phases = vec![
            BossPhase::new(1.0, vec![strike_pattern(1)]).with_frequency(10),
            BossPhase::new(0.66, vec![strike_pattern(2)]).with_frequency(10),
            BossPhase::new(0.33, vec![strike_pattern(3)]).with_frequency(10),
        ];
        let encounter =
            BossEncounter::new(boss_id, phases, 42).expect("non-empty phases construct");
        (encounter, boss_id, player_id)
    }

    fn tick_n(
        encounter: &mut BossEncounter,
        arena: &mut ActorArena,
        player: ActorId,
        bus: &EventBus,
        n: u32,
    ) {
        let terrain = MockTerrain::new();
        let mut projectiles = ProjectilePool::new();
        for _ in 0..n {
            encounter.tick(arena, &terrain, &mut projectiles, player, bus);
        }
    }

    #[test]
    fn test_empty_phases_rejected() {
        let result = BossEncounter::new(ActorId::from_raw(1), Vec::new(), 0);
        assert!(matches!(result, Err(CombatError::NoPhases)));
    }

    #[test]
    fn test_phases_sorted_descending() {
        let mut arena = ActorArena::new();
        let (encounter, _, _) = three_phase_boss(&mut arena);
        let thresholds: Vec<f32> = encounter
            .phases
            .iter()
            .map(|phase| phase.health_threshold)
            .collect();
        assert_eq!(thresholds, vec![1.0, 0.66, 0.33]);
    }

    #[test]
    fn test_phase_lookup() {
        let mut arena = ActorArena::new();
        let (encounter, _, _) = three_phase_boss(&mut arena);

        assert_eq!(encounter.phase_index_for(1.0), 0);
        assert_eq!(encounter.phase_index_for(0.8), 0);
        assert_eq!(encounter.phase_index_for(0.66), 1);
        assert_eq!(encounter.phase_index_for(0.65), 1);
        assert_eq!(encounter.phase_index_for(0.33), 2);
        assert_eq!(encounter.phase_index_for(0.1), 2);
    }

    #[test]
    fn test_phase_lookup_monotonic_with_decreasing_health() {
        let mut arena = ActorArena::new();
        let (encounter, _, _) = three_phase_boss(&mut arena);

        let mut last = 0;
        let mut fraction = 1.0;
        while fraction > 0.0 {
            let index = encounter.phase_index_for(fraction);
            assert!(index >= last);
            last = index;
            fraction -= 0.01;
        }
    }

    #[test]
    fn test_attack_cycle_reaches_recovery_and_sets_cooldowns() {
        let mut arena = ActorArena::new();
        let (mut encounter, _, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        let mut seen = Vec::new();
        let terrain = MockTerrain::new();
        let mut projectiles = ProjectilePool::new();
        for _ in 0..120 {
            encounter.tick(&mut arena, &terrain, &mut projectiles, player, &bus);
            if seen.last() != Some(&encounter.state()) {
                seen.push(encounter.state());
            }
        }

        assert!(seen.contains(&BossState::PatternSelect));
        assert!(seen.contains(&BossState::AttackWindup));
        assert!(seen.contains(&BossState::AttackExecute));
        assert!(seen.contains(&BossState::AttackRecovery));
        // Pattern went on cooldown when it completed.
        assert!(encounter
            .cooldowns
            .get(&AttackId::new(1))
            .is_some_and(|&cd| cd > 0));
        assert!(encounter.attack_cooldown > 0);

        let events = bus.drain();
        assert!(events
            .iter()
            .any(|event| matches!(event, CombatEvent::AttackStarted { .. })));
    }

    #[test]
    fn test_telegraph_ramps_during_windup() {
        let mut arena = ActorArena::new();
        let (mut encounter, _, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        // Reach windup.
        tick_n(&mut encounter, &mut arena, player, &bus, 12);
        assert_eq!(encounter.state(), BossState::AttackWindup);

        let early = encounter.telegraph();
        tick_n(&mut encounter, &mut arena, player, &bus, 10);
        let later = encounter.telegraph();

        assert!(later > early);
        assert!(later <= TELEGRAPH_MAX);
    }

    #[test]
    fn test_single_phase_transition_on_big_hit() {
        // Phases [1.0, 0.66, 0.33]; a single hit takes health from 100%
        // to 65%, which must fire exactly one transition into phase 1.
        let mut arena = ActorArena::new();
        let (mut encounter, boss_id, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        tick_n(&mut encounter, &mut arena, player, &bus, 1);
        bus.drain();

        arena
            .get_mut(boss_id)
            .expect("boss is live")
            .take_damage(350.0, DamageType::True);

        tick_n(&mut encounter, &mut arena, player, &bus, 1);

        assert_eq!(encounter.state(), BossState::PhaseTransition);
        assert_eq!(encounter.current_phase_index(), 1);
        assert!(arena.get(boss_id).expect("boss is live").invulnerable);

        let transitions: Vec<_> = bus
            .drain()
            .into_iter()
            .filter(|event| matches!(event, CombatEvent::PhaseTransition { .. }))
            .collect();
        assert_eq!(
            transitions,
            vec![CombatEvent::PhaseTransition { phase_index: 1 }]
        );

        // Invulnerability holds for the full 180-tick transition.
        tick_n(&mut encounter, &mut arena, player, &bus, 179);
        assert_eq!(encounter.state(), BossState::PhaseTransition);
        assert!(arena.get(boss_id).expect("boss is live").invulnerable);

        tick_n(&mut encounter, &mut arena, player, &bus, 1);
        assert_eq!(encounter.state(), BossState::Taunt);
        assert!(!arena.get(boss_id).expect("boss is live").invulnerable);

        // No second transition fires for the same phase.
        tick_n(&mut encounter, &mut arena, player, &bus, 120);
        assert!(bus
            .drain()
            .iter()
            .all(|event| !matches!(event, CombatEvent::PhaseTransition { .. })));
    }

    #[test]
    fn test_no_available_pattern_returns_to_idle() {
        let mut arena = ActorArena::new();
        let (mut encounter, _, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        // Put the only phase-1 pattern on cooldown.
        encounter.cooldowns.insert(AttackId::new(1), 1000);

        tick_n(&mut encounter, &mut arena, player, &bus, 30);
        assert_eq!(encounter.state(), BossState::Idle);
        assert!(encounter.current_pattern().is_none());
    }

    #[test]
    fn test_special_preferred_when_rolled() {
        let mut arena = ActorArena::new();
        let boss_actor = Actor::spec(Faction::Hostile)
            .max_health(1000.0)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        let boss_id = arena.insert(boss_actor);

        let phases = vec![BossPhase::new(
            1.0,
            vec![strike_pattern(1), strike_pattern(2).as_special()],
        )
        .with_special_chance(1.0)];
        let mut encounter =
            BossEncounter::new(boss_id, phases, 7).expect("non-empty phases construct");

        for _ in 0..20 {
            let picked = encounter.select_pattern().expect("pool is off cooldown");
            assert!(picked.special);
        }
    }

    #[test]
    fn test_defeat_is_terminal() {
        let mut arena = ActorArena::new();
        let (mut encounter, boss_id, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        arena
            .get_mut(boss_id)
            .expect("boss is live")
            .take_damage(5000.0, DamageType::True);
        tick_n(&mut encounter, &mut arena, player, &bus, 1);

        assert_eq!(encounter.state(), BossState::Defeated);
        assert!(encounter.is_defeated());
        assert!(bus
            .drain()
            .iter()
            .any(|event| matches!(event, CombatEvent::BossDefeated { .. })));

        // Further damage and ticks are no-ops.
        let damaged = arena
            .get_mut(boss_id)
            .expect("boss slot still present this tick")
            .take_damage(100.0, DamageType::True);
        assert_eq!(damaged, 0.0);

        tick_n(&mut encounter, &mut arena, player, &bus, 10);
        assert_eq!(encounter.state(), BossState::Defeated);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_stun_holds_then_returns_to_idle() {
        let mut arena = ActorArena::new();
        let (mut encounter, _, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        encounter.stun(&mut arena);
        assert_eq!(encounter.state(), BossState::Stunned);

        tick_n(&mut encounter, &mut arena, player, &bus, 119);
        assert_eq!(encounter.state(), BossState::Stunned);
        tick_n(&mut encounter, &mut arena, player, &bus, 1);
        assert_eq!(encounter.state(), BossState::Idle);
    }

    #[test]
    fn test_vulnerable_holds_then_returns_to_idle() {
        let mut arena = ActorArena::new();
        let (mut encounter, _, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        encounter.make_vulnerable(&mut arena);
        assert_eq!(encounter.state(), BossState::Vulnerable);

        tick_n(&mut encounter, &mut arena, player, &bus, 119);
        assert_eq!(encounter.state(), BossState::Vulnerable);
        tick_n(&mut encounter, &mut arena, player, &bus, 1);
        assert_eq!(encounter.state(), BossState::Idle);
    }

    #[test]
    fn test_volley_spawns_projectiles() {
        let mut arena = ActorArena::new();
        let boss_actor = Actor::spec(Faction::Hostile)
            .position(Vec2::new(200.0, 0.0))
            .max_health(1000.0)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        let boss_id = arena.insert(boss_actor);
        let player = arena.insert(
            Actor::spec(Faction::Player)
                .position(Vec2::ZERO)
                .stats(StatSheet::new())
                .build()
                .expect("spec with stats builds"),
        );

        let volley = AttackDefinition::new(AttackId::new(9), "Soul Barrage", 10, 12, 20)
            .with_behavior(BehaviorTag::Volley {
                count: 3,
                speed: 6.0,
            });
        let phases = vec![BossPhase::new(1.0, vec![volley]).with_frequency(5)];
        let mut encounter =
            BossEncounter::new(boss_id, phases, 3).expect("non-empty phases construct");

        let bus = EventBus::default();
        let terrain = MockTerrain::new();
        let mut projectiles = ProjectilePool::new();
        for _ in 0..40 {
            encounter.tick(&mut arena, &terrain, &mut projectiles, player, &bus);
        }

        let spawned = bus
            .drain()
            .iter()
            .filter(|event| matches!(event, CombatEvent::ProjectileSpawned { .. }))
            .count();
        assert_eq!(spawned, 3);
    }

    #[test]
    fn test_rush_translates_boss_when_grounded() {
        let mut arena = ActorArena::new();
        let boss_actor = Actor::spec(Faction::Hostile)
            .position(Vec2::new(200.0, 0.0))
            .max_health(1000.0)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        let boss_id = arena.insert(boss_actor);
        let player = arena.insert(
            Actor::spec(Faction::Player)
                .position(Vec2::ZERO)
                .stats(StatSheet::new())
                .build()
                .expect("spec with stats builds"),
        );

        let rush = AttackDefinition::new(AttackId::new(9), "Dash Slash", 5, 10, 20)
            .with_behavior(BehaviorTag::Rush { speed: 15.0 });
        let phases = vec![BossPhase::new(1.0, vec![rush]).with_frequency(5)];
        let mut encounter =
            BossEncounter::new(boss_id, phases, 3).expect("non-empty phases construct");

        let bus = EventBus::default();
        let terrain = MockTerrain::new();
        let mut projectiles = ProjectilePool::new();
        for _ in 0..25 {
            encounter.tick(&mut arena, &terrain, &mut projectiles, player, &bus);
        }

        // The boss dashed toward the player (leftward).
        let x = arena.get(boss_id).expect("boss is live").position.x;
        assert!(x < 200.0);
    }

    #[test]
    fn test_rush_gated_by_terrain() {
        let mut arena = ActorArena::new();
        let boss_actor = Actor::spec(Faction::Hostile)
            .position(Vec2::new(200.0, 0.0))
            .max_health(1000.0)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        let boss_id = arena.insert(boss_actor);
        let player = arena.insert(
            Actor::spec(Faction::Player)
                .position(Vec2::ZERO)
                .stats(StatSheet::new())
                .build()
                .expect("spec with stats builds"),
        );

        let rush = AttackDefinition::new(AttackId::new(9), "Dash Slash", 5, 10, 20)
            .with_behavior(BehaviorTag::Rush { speed: 15.0 });
        let phases = vec![BossPhase::new(1.0, vec![rush]).with_frequency(5)];
        let mut encounter =
            BossEncounter::new(boss_id, phases, 3).expect("non-empty phases construct");

        let bus = EventBus::default();
        let mut terrain = MockTerrain::new();
        terrain.set_airborne(boss_id);
        let mut projectiles = ProjectilePool::new();
        for _ in 0..25 {
            encounter.tick(&mut arena, &terrain, &mut projectiles, player, &bus);
        }

        assert_eq!(arena.get(boss_id).expect("boss is live").position.x, 200.0);
    }

    #[test]
    fn test_blink_teleports_beside_target() {
        let mut arena = ActorArena::new();
        let boss_actor = Actor::spec(Faction::Hostile)
            .position(Vec2::new(400.0, 50.0))
            .max_health(1000.0)
            .stats(StatSheet::new())
            .build()
            .expect("spec with stats builds");
        let boss_id = arena.insert(boss_actor);
        let player = arena.insert(
            Actor::spec(Faction::Player)
                .position(Vec2::ZERO)
                .stats(StatSheet::new())
                .build()
                .expect("spec with stats builds"),
        );

        let blink = AttackDefinition::new(AttackId::new(9), "Shadow Step", 5, 10, 20)
            .with_behavior(BehaviorTag::Blink { offset: 40.0 });
        let phases = vec![BossPhase::new(1.0, vec![blink]).with_frequency(5)];
        let mut encounter =
            BossEncounter::new(boss_id, phases, 3).expect("non-empty phases construct");

        let bus = EventBus::default();
        let terrain = MockTerrain::new();
        let mut projectiles = ProjectilePool::new();
        for _ in 0..25 {
            encounter.tick(&mut arena, &terrain, &mut projectiles, player, &bus);
        }

        let position = arena.get(boss_id).expect("boss is live").position;
        assert!((position.x.abs() - 40.0).abs() < 1e-4);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn test_idempotent_ticks_after_defeat() {
        let mut arena = ActorArena::new();
        let (mut encounter, boss_id, player) = three_phase_boss(&mut arena);
        let bus = EventBus::default();

        arena
            .get_mut(boss_id)
            .expect("boss is live")
            .take_damage(5000.0, DamageType::True);
        tick_n(&mut encounter, &mut arena, player, &bus, 1);
        bus.drain();

        let state_before = encounter.state();
        tick_n(&mut encounter, &mut arena, player, &bus, 50);
        assert_eq!(encounter.state(), state_before);
        assert_eq!(bus.pending_count(), 0);
    }
}
