//! Fixed-timestep combat simulation.
//!
//! [`CombatSim`] owns the arena, the player's combo state, the boss
//! encounter, projectiles, and the feedback timers, and advances them in a
//! fixed per-tick order:
//!
//! input -> player timeline -> movement gate -> boss AI -> projectiles ->
//! hit resolution -> feel timers -> deferred removal -> event drain.
//!
//! The simulation runs at a fixed logical rate ([`TICK_RATE`]) regardless
//! of the render frame rate; nothing here ever touches a display clock.
//! While the hit-pause freeze is active the entire gameplay tick is
//! skipped; only the feel timers advance.

use tracing::debug;
use umbra_common::{ActorId, AttackId, CombatResult, Vec2};

use crate::actor::{Actor, ActorArena};
use crate::boss::{BossEncounter, BossPhase};
use crate::combo::{ComboConfig, ComboTracker};
use crate::data::AttackTable;
use crate::events::{CombatEvent, EventBus};
use crate::feel::CombatFeel;
use crate::hit::HitResolver;
use crate::projectile::ProjectilePool;
use crate::spatial::{SpatialIndex, TerrainQuery};
use crate::timeline::{TimelinePhase, TimelineSignal};

/// Logical simulation ticks per second.
pub const TICK_RATE: u32 = 60;

/// A player attack request for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackRequest {
    /// Which attack definition to use.
    pub attack: AttackId,
    /// Aim direction; zero falls back to the player's facing.
    pub aim: Vec2,
}

/// Player input for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    /// Attack request, if the attack button was pressed.
    pub attack: Option<AttackRequest>,
    /// Movement direction; only the sign of x matters to this core.
    pub move_dir: Vec2,
}

/// The combat core simulation.
pub struct CombatSim {
    arena: ActorArena,
    attacks: AttackTable,
    combo: ComboTracker,
    resolver: HitResolver,
    feel: CombatFeel,
    bus: EventBus,
    projectiles: ProjectilePool,
    boss: Option<BossEncounter>,
    player: ActorId,
    tick_count: u64,
}

impl CombatSim {
    /// Creates a simulation around a player actor and an attack table.
    ///
    /// The table must already be validated by the data loader; the seed
    /// drives crit rolls, boss pattern picks, and shake offsets.
    pub fn new(player: Actor, attacks: AttackTable, seed: u64) -> Self {
        let combo_config = ComboConfig::default();
        let mut arena = ActorArena::new();
        let player_id = arena.insert(player);

        Self {
            arena,
            attacks,
            combo: ComboTracker::new(combo_config),
            resolver: HitResolver::new(seed, combo_config),
            feel: CombatFeel::new(seed.wrapping_add(1)),
            bus: EventBus::default(),
            projectiles: ProjectilePool::new(),
            boss: None,
            player: player_id,
            tick_count: 0,
        }
    }

    /// Spawns an additional actor (enemy) into the arena.
    pub fn spawn(&mut self, actor: Actor) -> ActorId {
        self.arena.insert(actor)
    }

    /// Inserts a boss actor and attaches an encounter driving it.
    pub fn add_boss(
        &mut self,
        actor: Actor,
        phases: Vec<BossPhase>,
        seed: u64,
    ) -> CombatResult<ActorId> {
        let id = self.arena.insert(actor);
        self.boss = Some(BossEncounter::new(id, phases, seed)?);
        Ok(id)
    }

    /// The player actor's ID.
    #[must_use]
    pub fn player(&self) -> ActorId {
        self.player
    }

    /// The actor arena.
    #[must_use]
    pub fn arena(&self) -> &ActorArena {
        &self.arena
    }

    /// Mutable access to the arena (spawning, scripted damage).
    pub fn arena_mut(&mut self) -> &mut ActorArena {
        &mut self.arena
    }

    /// The boss encounter, if one is attached.
    #[must_use]
    pub fn boss(&self) -> Option<&BossEncounter> {
        self.boss.as_ref()
    }

    /// Mutable access to the boss encounter (external stuns).
    pub fn boss_mut(&mut self) -> Option<&mut BossEncounter> {
        self.boss.as_mut()
    }

    /// The player's combo tracker.
    #[must_use]
    pub fn combo(&self) -> &ComboTracker {
        &self.combo
    }

    /// The feedback timers.
    #[must_use]
    pub fn feel(&self) -> &CombatFeel {
        &self.feel
    }

    /// Live projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Drains the events accumulated since the last drain.
    #[must_use]
    pub fn drain_events(&self) -> Vec<CombatEvent> {
        self.bus.drain()
    }

    /// Whether the movement layer should accept input this tick.
    ///
    /// Movement itself is resolved by the external terrain collaborator;
    /// this core only gates it (freeze, attack lock, hitstun).
    #[must_use]
    pub fn movement_allowed(&self) -> bool {
        if self.feel.is_frozen() || self.feel.is_movement_locked() {
            return false;
        }
        self.arena
            .get(self.player)
            .is_some_and(|player| !player.in_hitstun() && !player.is_defeated())
    }

    /// Advances the simulation by one tick.
    pub fn tick<S: SpatialIndex, T: TerrainQuery>(
        &mut self,
        input: &TickInput,
        spatial: &S,
        terrain: &T,
    ) {
        self.tick_count += 1;

        // Global freeze-frame: the gameplay tick is skipped wholesale.
        if self.feel.update() {
            return;
        }

        // Input.
        if let Some(request) = input.attack {
            self.handle_attack_request(&request);
        }
        if !self.feel.is_movement_locked() && input.move_dir.x != 0.0 {
            if let Some(player) = self.arena.get_mut(self.player) {
                if !player.timeline.is_attacking() && !player.in_hitstun() {
                    player.facing = Vec2::new(input.move_dir.x.signum(), 0.0);
                }
            }
        }

        // Timelines and hitstun; the boss actor is advanced by its encounter.
        let boss_actor = self.boss.as_ref().map(BossEncounter::actor);
        let mut restarted = Vec::new();
        for id in self.arena.ids() {
            if Some(id) == boss_actor {
                continue;
            }
            if let Some(actor) = self.arena.get_mut(id) {
                if actor.tick() == Some(TimelineSignal::Restarted) {
                    restarted.push(id);
                }
            }
        }
        self.combo.tick();
        for id in restarted {
            self.on_timeline_restart(id);
        }

        // Boss AI and its own timeline.
        if let Some(boss) = &mut self.boss {
            boss.tick(
                &mut self.arena,
                terrain,
                &mut self.projectiles,
                self.player,
                &self.bus,
            );
        }

        // Projectiles, then the melee hit pass.
        let mut reports = self.projectiles.update(&mut self.arena, &self.bus);
        reports.extend(self.resolver.resolve_all(&mut self.arena, spatial, &self.bus));

        if let Some(boss) = &mut self.boss {
            boss.sync_defeat(&self.arena, &self.bus);
        }

        // Feedback is purely reactive to the hits above.
        for report in &reports {
            self.feel.on_hit(report.is_heavy, report.is_crit);
        }

        // Deferred removal of everything defeated this tick.
        for id in self.arena.end_tick() {
            self.bus.publish(CombatEvent::ActorDefeated { actor: id });
        }
    }

    /// Starts or buffers the player's requested attack.
    fn handle_attack_request(&mut self, request: &AttackRequest) {
        let Some(def) = self.attacks.get(request.attack).cloned() else {
            debug!(id = ?request.attack, "unknown attack id in request");
            return;
        };

        let Some(player) = self.arena.get_mut(self.player) else {
            return;
        };
        if player.is_defeated() || player.in_hitstun() {
            return;
        }

        let aim = request.aim.normalized();
        let aim = if aim == Vec2::ZERO { player.facing } else { aim };

        if player.timeline.phase() == TimelinePhase::Idle || player.timeline.can_cancel() {
            let combo_index = self.combo.on_start();
            if player.timeline.start(&def, aim, combo_index) {
                if aim.x != 0.0 {
                    player.facing = Vec2::new(aim.x.signum(), 0.0);
                }
                // Commit the player through the windup.
                self.feel.start_attack_lock(def.windup);
                self.bus.publish(CombatEvent::AttackStarted {
                    actor: self.player,
                    heavy: def.heavy,
                });
            }
        } else {
            // Mid-attack and not cancel-eligible yet: buffer the follow-up.
            player.timeline.queue_next(&def);
        }
    }

    /// A queued follow-up restarted a timeline at the end of recovery.
    fn on_timeline_restart(&mut self, id: ActorId) {
        let is_player = id == self.player;
        let combo_index = if is_player { self.combo.on_start() } else { 0 };

        let Some(actor) = self.arena.get_mut(id) else {
            return;
        };
        let Some(instance) = actor.timeline.instance_mut() else {
            return;
        };
        if is_player {
            instance.combo_index = combo_index;
        }
        let heavy = instance.def.heavy;

        self.bus
            .publish(CombatEvent::AttackStarted { actor: id, heavy });
    }
}
