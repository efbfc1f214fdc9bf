//! Data table loading and validation.
//!
//! Attack definitions and boss encounter layouts are authored in versioned
//! RON tables. Everything is validated here, before it reaches the core:
//! the simulation assumes definitions are well-formed and never re-checks
//! them in the tick loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use umbra_common::AttackId;

use crate::attack::{AttackDefinition, HitboxShape};
use crate::boss::BossPhase;

/// Errors raised while loading data tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// RON syntax or type error.
    #[error("failed to parse data table: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// An attack has no active window.
    #[error("attack {name:?}: active window must be at least one tick")]
    ZeroActiveWindow {
        /// Offending attack name
        name: String,
    },

    /// An attack's damage is negative or not finite.
    #[error("attack {name:?}: damage must be finite and non-negative, got {value}")]
    InvalidDamage {
        /// Offending attack name
        name: String,
        /// Rejected value
        value: f32,
    },

    /// An attack's knockback is negative or not finite.
    #[error("attack {name:?}: knockback must be finite and non-negative, got {value}")]
    InvalidKnockback {
        /// Offending attack name
        name: String,
        /// Rejected value
        value: f32,
    },

    /// An attack's crit bonus is outside [0, 1].
    #[error("attack {name:?}: crit bonus must be within [0, 1], got {value}")]
    InvalidCritBonus {
        /// Offending attack name
        name: String,
        /// Rejected value
        value: f32,
    },

    /// An attack's hitbox geometry is degenerate.
    #[error("attack {name:?}: degenerate hitbox geometry")]
    InvalidHitbox {
        /// Offending attack name
        name: String,
    },

    /// An attack's cancel window fraction is outside [0, 1].
    #[error("attack {name:?}: cancel fraction must be within [0, 1], got {value}")]
    InvalidCancelWindow {
        /// Offending attack name
        name: String,
        /// Rejected value
        value: f32,
    },

    /// Two attacks share an ID.
    #[error("duplicate attack id {id:?}")]
    DuplicateAttackId {
        /// The duplicated ID
        id: AttackId,
    },

    /// The encounter has no phases.
    #[error("encounter requires at least one phase")]
    NoPhases,

    /// A phase threshold is outside (0, 1].
    #[error("phase {index}: threshold must be within (0, 1], got {value}")]
    InvalidThreshold {
        /// Phase index in the table
        index: usize,
        /// Rejected value
        value: f32,
    },

    /// Phase thresholds are not strictly decreasing.
    #[error("phase {index}: thresholds must be strictly decreasing")]
    ThresholdOrder {
        /// Phase index in the table
        index: usize,
    },

    /// A phase's special chance is outside [0, 1].
    #[error("phase {index}: special chance must be within [0, 1], got {value}")]
    InvalidChance {
        /// Phase index in the table
        index: usize,
        /// Rejected value
        value: f32,
    },

    /// A phase has no patterns.
    #[error("phase {index} has an empty pattern pool")]
    EmptyPatternPool {
        /// Phase index in the table
        index: usize,
    },
}

/// Validates a single attack definition.
pub fn validate_attack(def: &AttackDefinition) -> Result<(), DataError> {
    if def.active == 0 {
        return Err(DataError::ZeroActiveWindow {
            name: def.name.clone(),
        });
    }
    if !def.base_damage.is_finite() || def.base_damage < 0.0 {
        return Err(DataError::InvalidDamage {
            name: def.name.clone(),
            value: def.base_damage,
        });
    }
    if !def.base_knockback.is_finite() || def.base_knockback < 0.0 {
        return Err(DataError::InvalidKnockback {
            name: def.name.clone(),
            value: def.base_knockback,
        });
    }
    if !def.crit_bonus.is_finite() || !(0.0..=1.0).contains(&def.crit_bonus) {
        return Err(DataError::InvalidCritBonus {
            name: def.name.clone(),
            value: def.crit_bonus,
        });
    }
    if !(0.0..=1.0).contains(&def.cancel.active_fraction) {
        return Err(DataError::InvalidCancelWindow {
            name: def.name.clone(),
            value: def.cancel.active_fraction,
        });
    }

    let shape_ok = match def.shape {
        HitboxShape::Offset { size, .. } => size.x > 0.0 && size.y > 0.0,
        HitboxShape::Arc {
            range,
            arc,
            box_scale,
        } => range > 0.0 && arc > 0.0 && arc <= std::f32::consts::TAU && box_scale > 0.0,
    };
    if !shape_ok {
        return Err(DataError::InvalidHitbox {
            name: def.name.clone(),
        });
    }

    Ok(())
}

/// A versioned table of attack definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackTable {
    /// Table schema version.
    pub version: u32,
    /// The attack definitions.
    pub attacks: Vec<AttackDefinition>,
}

impl AttackTable {
    /// Parses and validates a table from RON source.
    pub fn load(source: &str) -> Result<Self, DataError> {
        let table: Self = ron::from_str(source)?;
        table.validate()?;
        info!(count = table.attacks.len(), "loaded attack table");
        Ok(table)
    }

    /// Validates every definition and ID uniqueness.
    pub fn validate(&self) -> Result<(), DataError> {
        let mut seen = std::collections::HashSet::new();
        for def in &self.attacks {
            if !seen.insert(def.id) {
                return Err(DataError::DuplicateAttackId { id: def.id });
            }
            validate_attack(def)?;
        }
        Ok(())
    }

    /// Looks up a definition by ID.
    #[must_use]
    pub fn get(&self, id: AttackId) -> Option<&AttackDefinition> {
        self.attacks.iter().find(|def| def.id == id)
    }

    /// The reference player moveset: light, heavy, and upward attacks.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            version: 1,
            attacks: vec![
                AttackDefinition::light(AttackId::new(1)),
                AttackDefinition::heavy(AttackId::new(2)),
                AttackDefinition::upward(AttackId::new(3)),
            ],
        }
    }
}

/// A versioned boss encounter layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterTable {
    /// Table schema version.
    pub version: u32,
    /// Boss display name.
    pub name: String,
    /// Maximum boss health.
    pub max_health: f32,
    /// Phases, ordered by strictly decreasing threshold.
    pub phases: Vec<BossPhase>,
}

impl EncounterTable {
    /// Parses and validates an encounter from RON source.
    pub fn load(source: &str) -> Result<Self, DataError> {
        let table: Self = ron::from_str(source)?;
        table.validate()?;
        info!(
            name = %table.name,
            phases = table.phases.len(),
            "loaded encounter table"
        );
        Ok(table)
    }

    /// Validates phase ordering, chances, and every pattern.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.phases.is_empty() {
            return Err(DataError::NoPhases);
        }

        let mut previous: Option<f32> = None;
        for (index, phase) in self.phases.iter().enumerate() {
            if !phase.health_threshold.is_finite()
                || phase.health_threshold <= 0.0
                || phase.health_threshold > 1.0
            {
                return Err(DataError::InvalidThreshold {
                    index,
                    value: phase.health_threshold,
                });
            }
            if previous.is_some_and(|p| phase.health_threshold >= p) {
                return Err(DataError::ThresholdOrder { index });
            }
            previous = Some(phase.health_threshold);

            if !(0.0..=1.0).contains(&phase.special_attack_chance) {
                return Err(DataError::InvalidChance {
                    index,
                    value: phase.special_attack_chance,
                });
            }
            if phase.patterns.is_empty() {
                return Err(DataError::EmptyPatternPool { index });
            }
            for pattern in &phase.patterns {
                validate_attack(pattern)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTACKS_RON: &str = r#"
(
    version: 1,
    attacks: [
        (
            id: (1),
            name: "Light Slash",
            windup: 4,
            active: 8,
            recovery: 10,
            base_damage: 10.0,
            base_knockback: 12.0,
        ),
        (
            id: (2),
            name: "Heavy Slash",
            windup: 8,
            active: 12,
            recovery: 18,
            base_damage: 10.0,
            base_knockback: 12.0,
            heavy: true,
        ),
    ],
)
"#;

    const ENCOUNTER_RON: &str = r#"
(
    version: 1,
    name: "Shadow Knight",
    max_health: 1000.0,
    phases: [
        (
            health_threshold: 1.0,
            attack_frequency: 120,
            special_attack_chance: 0.15,
            patterns: [
                (
                    id: (10),
                    name: "Sword Slash",
                    windup: 30,
                    active: 15,
                    recovery: 30,
                    base_damage: 15.0,
                    cooldown: 180,
                ),
            ],
        ),
        (
            health_threshold: 0.66,
            patterns: [
                (
                    id: (11),
                    name: "Dash Slash",
                    windup: 25,
                    active: 20,
                    recovery: 30,
                    base_damage: 30.0,
                    cooldown: 180,
                    special: true,
                    behavior: Rush(speed: 15.0),
                ),
            ],
        ),
    ],
)
"#;

    #[test]
    fn test_load_attack_table() {
        let table = AttackTable::load(ATTACKS_RON).expect("reference table parses");
        assert_eq!(table.attacks.len(), 2);

        let light = table.get(AttackId::new(1)).expect("id 1 is present");
        assert_eq!((light.windup, light.active, light.recovery), (4, 8, 10));
        assert!(!light.heavy);
        assert!(table.get(AttackId::new(2)).is_some_and(|def| def.heavy));
    }

    #[test]
    fn test_load_encounter_table() {
        let table = EncounterTable::load(ENCOUNTER_RON).expect("reference encounter parses");
        assert_eq!(table.phases.len(), 2);
        assert_eq!(table.phases[1].attack_frequency, 120);
        assert!(!table.phases[0].transition_played);
        assert!(table.phases[1].patterns[0].special);
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            AttackTable::load("(version: 1,"),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_active_window_rejected() {
        let mut table = AttackTable::reference();
        table.attacks[0].active = 0;
        assert!(matches!(
            table.validate(),
            Err(DataError::ZeroActiveWindow { .. })
        ));
    }

    #[test]
    fn test_negative_damage_rejected() {
        let mut table = AttackTable::reference();
        table.attacks[0].base_damage = -5.0;
        assert!(matches!(
            table.validate(),
            Err(DataError::InvalidDamage { .. })
        ));
    }

    #[test]
    fn test_nan_damage_rejected() {
        let mut table = AttackTable::reference();
        table.attacks[0].base_damage = f32::NAN;
        assert!(matches!(
            table.validate(),
            Err(DataError::InvalidDamage { .. })
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = AttackTable::reference();
        let dup = table.attacks[0].clone();
        table.attacks.push(dup);
        assert!(matches!(
            table.validate(),
            Err(DataError::DuplicateAttackId { .. })
        ));
    }

    #[test]
    fn test_degenerate_hitbox_rejected() {
        let mut table = AttackTable::reference();
        table.attacks[0].shape = HitboxShape::Arc {
            range: 0.0,
            arc: 1.0,
            box_scale: 0.85,
        };
        assert!(matches!(
            table.validate(),
            Err(DataError::InvalidHitbox { .. })
        ));
    }

    #[test]
    fn test_threshold_order_enforced() {
        let mut table = EncounterTable::load(ENCOUNTER_RON).expect("reference encounter parses");
        table.phases[1].health_threshold = 1.0;
        assert!(matches!(
            table.validate(),
            Err(DataError::ThresholdOrder { index: 1 })
        ));
    }

    #[test]
    fn test_threshold_range_enforced() {
        let mut table = EncounterTable::load(ENCOUNTER_RON).expect("reference encounter parses");
        table.phases[0].health_threshold = 1.5;
        assert!(matches!(
            table.validate(),
            Err(DataError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_empty_phase_list_rejected() {
        let mut table = EncounterTable::load(ENCOUNTER_RON).expect("reference encounter parses");
        table.phases.clear();
        assert!(matches!(table.validate(), Err(DataError::NoPhases)));
    }

    #[test]
    fn test_empty_pattern_pool_rejected() {
        let mut table = EncounterTable::load(ENCOUNTER_RON).expect("reference encounter parses");
        table.phases[0].patterns.clear();
        assert!(matches!(
            table.validate(),
            Err(DataError::EmptyPatternPool { index: 0 })
        ));
    }

    #[test]
    fn test_reference_moveset_is_valid() {
        assert!(AttackTable::reference().validate().is_ok());
    }
}
