//! Stat and defense model.
//!
//! This module provides:
//! - The stat sheet attached to every actor at construction
//! - Damage types and the defense pipeline (flat defense, armor, resistance)
//!
//! The combat core never defaults a missing sheet to zero damage; actor
//! construction without one is a hard error (see [`crate::actor`]).

use serde::{Deserialize, Serialize};

/// Maximum fraction of damage that armor or resistance can absorb.
const MITIGATION_CAP: f32 = 0.75;

/// Type of damage dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Physical damage (reduced by flat defense and armor)
    Physical,
    /// Fire damage
    Fire,
    /// Ice damage
    Ice,
    /// Lightning damage
    Lightning,
    /// Poison damage
    Poison,
    /// True damage (ignores all mitigation)
    True,
}

impl DamageType {
    /// Checks whether this damage type is mitigated by elemental resistance.
    #[must_use]
    pub fn is_elemental(self) -> bool {
        matches!(self, Self::Fire | Self::Ice | Self::Lightning | Self::Poison)
    }
}

impl Default for DamageType {
    fn default() -> Self {
        Self::Physical
    }
}

/// Combat stat sheet for an actor.
///
/// Offensive stats feed the hit resolver's damage and crit math; defensive
/// stats drive [`StatSheet::apply_defense`], which every incoming hit passes
/// through before health is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSheet {
    /// Flat attack damage added to every attack's base damage.
    pub attack_damage: f32,
    /// Critical hit chance (0.0 to 1.0).
    pub critical_chance: f32,
    /// Critical hit damage multiplier.
    pub critical_multiplier: f32,
    /// Flat damage reduction applied before percentage mitigation.
    pub defense: f32,
    /// Percentage reduction for physical damage (0.0 to 1.0, capped at 0.75).
    pub armor: f32,
    /// Percentage reduction for elemental damage (0.0 to 1.0, capped at 0.75).
    pub elemental_resistance: f32,
}

impl Default for StatSheet {
    fn default() -> Self {
        Self {
            attack_damage: 10.0,
            critical_chance: 0.05,
            critical_multiplier: 1.5,
            defense: 0.0,
            armor: 0.0,
            elemental_resistance: 0.0,
        }
    }
}

impl StatSheet {
    /// Creates a new stat sheet with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets attack damage.
    #[must_use]
    pub fn with_attack_damage(mut self, damage: f32) -> Self {
        self.attack_damage = damage.max(0.0);
        self
    }

    /// Sets critical chance.
    #[must_use]
    pub fn with_critical_chance(mut self, chance: f32) -> Self {
        self.critical_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Sets critical multiplier.
    #[must_use]
    pub fn with_critical_multiplier(mut self, multiplier: f32) -> Self {
        self.critical_multiplier = multiplier.max(1.0);
        self
    }

    /// Sets flat defense.
    #[must_use]
    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense.max(0.0);
        self
    }

    /// Sets percentage armor.
    #[must_use]
    pub fn with_armor(mut self, armor: f32) -> Self {
        self.armor = armor.clamp(0.0, 1.0);
        self
    }

    /// Sets elemental resistance.
    #[must_use]
    pub fn with_elemental_resistance(mut self, resistance: f32) -> Self {
        self.elemental_resistance = resistance.clamp(0.0, 1.0);
        self
    }

    /// Passes raw damage through the defense pipeline.
    ///
    /// Flat defense is subtracted first, then the matching percentage
    /// mitigation (armor for physical, resistance for elemental) is applied,
    /// capped at 75%. True damage bypasses everything.
    #[must_use]
    pub fn apply_defense(&self, raw_damage: f32, damage_type: DamageType) -> f32 {
        if damage_type == DamageType::True {
            return raw_damage.max(0.0);
        }

        let after_flat = (raw_damage - self.defense).max(0.0);

        let mitigation = match damage_type {
            DamageType::Physical => self.armor,
            t if t.is_elemental() => self.elemental_resistance,
            _ => 0.0,
        };

        after_flat * (1.0 - mitigation.min(MITIGATION_CAP))
    }
}
