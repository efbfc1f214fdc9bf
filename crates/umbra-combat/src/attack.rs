//! Attack definitions and per-attempt attack state.
//!
//! This module provides:
//! - [`AttackDefinition`]: immutable, data-driven attack parameters
//! - [`HitboxShape`]: offset-box and arc hitbox geometry
//! - [`BehaviorTag`]: capability tags for boss pattern dispatch
//! - [`AttackInstance`]: mutable state for one attack attempt

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use umbra_common::{Aabb, ActorId, AttackId, Vec2};

use crate::stats::DamageType;

/// Fraction of an arc attack's range at which the hitbox is centered.
const ARC_CENTER_FACTOR: f32 = 0.6;

/// Hitbox geometry for an attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitboxShape {
    /// A box at a fixed offset from the attacker, mirrored along facing.
    Offset {
        /// Offset from the attacker's center (x is along facing).
        offset: Vec2,
        /// Full width and height of the box.
        size: Vec2,
    },
    /// A box projected along the aim direction, with an angular gate.
    Arc {
        /// Maximum reach of the attack.
        range: f32,
        /// Full arc angle in radians; targets outside half this angle
        /// from the aim direction are rejected.
        arc: f32,
        /// Hitbox side length as a fraction of `range`.
        box_scale: f32,
    },
}

impl Default for HitboxShape {
    fn default() -> Self {
        Self::Arc {
            range: 45.0,
            arc: std::f32::consts::PI * 2.0 / 3.0,
            box_scale: 0.85,
        }
    }
}

/// Cancel-window configuration for an attack.
///
/// An attack may be cancelled into a new one during the trailing fraction
/// of its Active phase and, optionally, anywhere in Recovery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CancelWindow {
    /// Trailing fraction of the Active phase that is cancel-eligible
    /// (0.4 = the last 40% of Active). Zero disables Active cancels.
    pub active_fraction: f32,
    /// Whether the whole Recovery phase is cancel-eligible.
    pub recovery: bool,
}

impl Default for CancelWindow {
    fn default() -> Self {
        Self {
            active_fraction: 0.4,
            recovery: true,
        }
    }
}

/// Capability tag selecting the behavior an attack performs while active.
///
/// Boss pattern execution dispatches on this tag; there is no name-string
/// comparison anywhere in the dispatch path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BehaviorTag {
    /// Opens a melee hitbox driven by the attack timeline.
    Strike,
    /// Spawns projectiles toward the target while executing.
    Volley {
        /// Number of projectiles across the Active phase.
        count: u32,
        /// Projectile speed in units per tick.
        speed: f32,
    },
    /// Translates the attacker along its facing direction while executing.
    Rush {
        /// Horizontal speed in units per tick.
        speed: f32,
    },
    /// Teleports the attacker beside its target at execute start.
    Blink {
        /// Horizontal offset from the target after the teleport.
        offset: f32,
    },
}

impl Default for BehaviorTag {
    fn default() -> Self {
        Self::Strike
    }
}

/// Immutable, data-driven parameters for one attack.
///
/// Definitions are loaded from data tables (see [`crate::data`]) and never
/// mutated by the core; per-attempt state lives in [`AttackInstance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDefinition {
    /// Identifier in the data tables.
    pub id: AttackId,
    /// Display name (presentation only; never used for dispatch).
    pub name: String,
    /// Windup duration in ticks.
    pub windup: u32,
    /// Active duration in ticks.
    pub active: u32,
    /// Recovery duration in ticks.
    pub recovery: u32,
    /// Base damage before stat and combo scaling.
    #[serde(default)]
    pub base_damage: f32,
    /// Base knockback magnitude.
    #[serde(default)]
    pub base_knockback: f32,
    /// Whether this is a heavy attack (damage, knockback, hitstun bonus).
    #[serde(default)]
    pub heavy: bool,
    /// Damage type fed to the defense pipeline.
    #[serde(default)]
    pub damage_type: DamageType,
    /// Hitbox geometry.
    #[serde(default)]
    pub shape: HitboxShape,
    /// Cancel-window configuration.
    #[serde(default)]
    pub cancel: CancelWindow,
    /// Cooldown in ticks once the attack completes (boss patterns).
    #[serde(default)]
    pub cooldown: u32,
    /// Additive critical chance bonus.
    #[serde(default)]
    pub crit_bonus: f32,
    /// Whether this is a phase-specific special pattern.
    #[serde(default)]
    pub special: bool,
    /// Behavior performed while the attack is active.
    #[serde(default)]
    pub behavior: BehaviorTag,
}

impl AttackDefinition {
    /// Creates a definition with the given id, name, and timing.
    #[must_use]
    pub fn new(id: AttackId, name: impl Into<String>, windup: u32, active: u32, recovery: u32) -> Self {
        Self {
            id,
            name: name.into(),
            windup,
            active,
            recovery,
            base_damage: 10.0,
            base_knockback: 12.0,
            heavy: false,
            damage_type: DamageType::Physical,
            shape: HitboxShape::default(),
            cancel: CancelWindow::default(),
            cooldown: 0,
            crit_bonus: 0.0,
            special: false,
            behavior: BehaviorTag::Strike,
        }
    }

    /// Reference light attack: 4 windup / 8 active / 10 recovery.
    #[must_use]
    pub fn light(id: AttackId) -> Self {
        Self::new(id, "Light Slash", 4, 8, 10)
    }

    /// Reference heavy attack: 8 windup / 12 active / 18 recovery.
    #[must_use]
    pub fn heavy(id: AttackId) -> Self {
        let mut def = Self::new(id, "Heavy Slash", 8, 12, 18);
        def.heavy = true;
        def
    }

    /// Reference upward attack: 5 windup / 10 active / 12 recovery.
    #[must_use]
    pub fn upward(id: AttackId) -> Self {
        Self::new(id, "Up Slash", 5, 10, 12)
    }

    /// Sets base damage.
    #[must_use]
    pub fn with_damage(mut self, damage: f32) -> Self {
        self.base_damage = damage;
        self
    }

    /// Sets base knockback.
    #[must_use]
    pub fn with_knockback(mut self, knockback: f32) -> Self {
        self.base_knockback = knockback;
        self
    }

    /// Sets the hitbox shape.
    #[must_use]
    pub fn with_shape(mut self, shape: HitboxShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the cancel window.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelWindow) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the completion cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the behavior tag.
    #[must_use]
    pub fn with_behavior(mut self, behavior: BehaviorTag) -> Self {
        self.behavior = behavior;
        self
    }

    /// Marks this as a special pattern.
    #[must_use]
    pub fn as_special(mut self) -> Self {
        self.special = true;
        self
    }

    /// Total duration of the attack in ticks.
    #[must_use]
    pub fn total_ticks(&self) -> u32 {
        self.windup + self.active + self.recovery
    }
}

/// Mutable state for one attack attempt.
///
/// Created by [`crate::timeline::AttackTimeline::start`]; records the aim
/// captured at start, the combo index at start, the set of targets already
/// hit (each target is damaged at most once per instance), and an optional
/// queued follow-up.
#[derive(Debug, Clone)]
pub struct AttackInstance {
    /// The definition driving this attempt.
    pub def: AttackDefinition,
    /// Aim/facing direction captured when the attack started.
    pub aim: Vec2,
    /// Combo count at the time the attack started.
    pub combo_index: u8,
    /// Follow-up queued during the cancel window.
    pub queued: Option<AttackDefinition>,
    hit_targets: AHashSet<ActorId>,
}

impl AttackInstance {
    /// Creates a new instance for a definition.
    #[must_use]
    pub fn new(def: AttackDefinition, aim: Vec2, combo_index: u8) -> Self {
        Self {
            def,
            aim: aim.normalized(),
            combo_index,
            queued: None,
            hit_targets: AHashSet::new(),
        }
    }

    /// Checks whether a target has already been hit by this attempt.
    #[must_use]
    pub fn already_hit(&self, target: ActorId) -> bool {
        self.hit_targets.contains(&target)
    }

    /// Records a hit on a target. Returns false if already hit.
    pub fn register_hit(&mut self, target: ActorId) -> bool {
        self.hit_targets.insert(target)
    }

    /// Number of targets hit by this attempt.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hit_targets.len()
    }

    /// Computes the hitbox for this attack around an origin point.
    ///
    /// The caller is responsible for gating on the Active phase; see
    /// [`crate::timeline::AttackTimeline::hitbox`].
    #[must_use]
    pub fn shape_hitbox(&self, origin: Vec2) -> Aabb {
        match self.def.shape {
            HitboxShape::Offset { offset, size } => {
                let mirrored = Vec2::new(
                    if self.aim.x < 0.0 { -offset.x } else { offset.x },
                    offset.y,
                );
                Aabb::from_center(origin + mirrored, size.x / 2.0, size.y / 2.0)
            }
            HitboxShape::Arc {
                range, box_scale, ..
            } => {
                let center = origin + self.aim.scaled(range * ARC_CENTER_FACTOR);
                let half = range * box_scale / 2.0;
                Aabb::from_center(center, half, half)
            }
        }
    }

    /// Checks the angular gate for arc attacks.
    ///
    /// Offset-box attacks have no angular constraint and always pass.
    #[must_use]
    pub fn within_arc(&self, origin: Vec2, target_center: Vec2) -> bool {
        let HitboxShape::Arc { arc, .. } = self.def.shape else {
            return true;
        };

        let to_target = target_center - origin;
        if to_target.length() < 1e-4 {
            return true;
        }

        let angle_diff = (to_target.angle() - self.aim.angle()).abs();
        let wrapped = if angle_diff > std::f32::consts::PI {
            std::f32::consts::TAU - angle_diff
        } else {
            angle_diff
        };

        wrapped <= arc / 2.0
    }
}
