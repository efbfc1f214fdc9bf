//! Combo chain tracking.
//!
//! This module provides:
//! - [`ComboConfig`]: the continuation window and scaling rates
//! - [`ComboTracker`]: chain length and window countdown
//!
//! The canonical model is the directional one: a 15-tick window and a
//! 3-hit chain. Both are configurable; the aimed 45-tick/5-hit variant is
//! reachable through [`ComboConfig`] alone.

use serde::{Deserialize, Serialize};

/// Combo timing and scaling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    /// Ticks after an attack start during which a follow-up chains.
    pub window: u32,
    /// Number of hits in a full chain; the count is bounded by this.
    pub max_chain: u8,
    /// Damage bonus per chained hit.
    pub damage_step: f32,
    /// Knockback bonus per chained hit.
    pub knockback_step: f32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            window: 15,
            max_chain: 3,
            damage_step: 0.12,
            knockback_step: 0.1,
        }
    }
}

impl ComboConfig {
    /// The aimed-model configuration: 45-tick window, 5-hit chain.
    #[must_use]
    pub fn aimed() -> Self {
        Self {
            window: 45,
            max_chain: 5,
            ..Self::default()
        }
    }

    /// Damage multiplier for a given combo count.
    ///
    /// The first hit of a chain multiplies by exactly 1.0; each further
    /// link adds `damage_step`.
    #[must_use]
    pub fn damage_multiplier(&self, count: u8) -> f32 {
        1.0 + f32::from(count.saturating_sub(1)) * self.damage_step
    }

    /// Knockback multiplier for a given combo count.
    #[must_use]
    pub fn knockback_multiplier(&self, count: u8) -> f32 {
        1.0 + f32::from(count.saturating_sub(1)) * self.knockback_step
    }
}

/// Presentation hint for the current chain position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboTier {
    /// No chain in progress.
    Opener,
    /// Mid-chain link.
    Link,
    /// Final hit of the chain.
    Finisher,
}

/// Tracks an attacker's combo chain and continuation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboTracker {
    config: ComboConfig,
    count: u8,
    timer: u32,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new(ComboConfig::default())
    }
}

impl ComboTracker {
    /// Creates a tracker with the given configuration.
    #[must_use]
    pub fn new(config: ComboConfig) -> Self {
        Self {
            config,
            count: 0,
            timer: 0,
        }
    }

    /// Current chain count, bounded to `[0, max_chain - 1]`.
    #[must_use]
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Ticks remaining in the continuation window.
    #[must_use]
    pub fn timer(&self) -> u32 {
        self.timer
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ComboConfig {
        &self.config
    }

    /// Registers an attack start.
    ///
    /// Extends the chain if the window is still open, otherwise restarts
    /// it; the window resets either way. Returns the count in effect for
    /// the new attack.
    pub fn on_start(&mut self) -> u8 {
        if self.timer > 0 {
            self.count = (self.count + 1).min(self.config.max_chain.saturating_sub(1));
        } else {
            self.count = 0;
        }
        self.timer = self.config.window;
        self.count
    }

    /// Advances the window countdown by one tick.
    pub fn tick(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            if self.timer == 0 {
                self.count = 0;
            }
        }
    }

    /// Resets the chain and window.
    pub fn reset(&mut self) {
        self.count = 0;
        self.timer = 0;
    }

    /// Whether a chain is currently alive.
    #[must_use]
    pub fn is_chaining(&self) -> bool {
        self.timer > 0
    }

    /// Presentation hint for the current chain position.
    #[must_use]
    pub fn tier(&self) -> ComboTier {
        if self.count == 0 {
            ComboTier::Opener
        } else if self.count + 1 >= self.config.max_chain {
            ComboTier::Finisher
        } else {
            ComboTier::Link
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_within_window() {
        // Two attacks started 10 ticks apart inside a 15-tick window.
        let mut combo = ComboTracker::default();

        assert_eq!(combo.on_start(), 0);
        for _ in 0..10 {
            combo.tick();
        }
        assert_eq!(combo.on_start(), 1);
    }

    #[test]
    fn test_expired_window_resets_not_continues() {
        let mut combo = ComboTracker::default();

        combo.on_start();
        for _ in 0..10 {
            combo.tick();
        }
        combo.on_start();
        assert_eq!(combo.count(), 1);

        // Let the window lapse entirely; the next attack opens a new chain.
        for _ in 0..15 {
            combo.tick();
        }
        assert_eq!(combo.count(), 0);
        assert_eq!(combo.on_start(), 0);
    }

    #[test]
    fn test_count_capped_at_max_chain() {
        let mut combo = ComboTracker::default();
        for _ in 0..10 {
            combo.on_start();
            combo.tick();
        }
        assert_eq!(combo.count(), 2);
    }

    #[test]
    fn test_window_resets_on_every_start() {
        let mut combo = ComboTracker::default();
        combo.on_start();
        for _ in 0..14 {
            combo.tick();
        }
        assert_eq!(combo.timer(), 1);
        combo.on_start();
        assert_eq!(combo.timer(), 15);
    }

    #[test]
    fn test_damage_multiplier_first_hit_is_unity() {
        let config = ComboConfig::default();
        assert!((config.damage_multiplier(0) - 1.0).abs() < 1e-6);
        assert!((config.damage_multiplier(1) - 1.0).abs() < 1e-6);
        assert!((config.damage_multiplier(2) - 1.12).abs() < 1e-6);
    }

    #[test]
    fn test_knockback_multiplier() {
        let config = ComboConfig::default();
        assert!((config.knockback_multiplier(3) - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_aimed_model() {
        let combo = ComboTracker::new(ComboConfig::aimed());
        assert_eq!(combo.config().window, 45);
        assert_eq!(combo.config().max_chain, 5);
    }

    #[test]
    fn test_tier_hint() {
        let mut combo = ComboTracker::default();
        assert_eq!(combo.tier(), ComboTier::Opener);

        combo.on_start();
        combo.on_start();
        assert_eq!(combo.tier(), ComboTier::Link);

        combo.on_start();
        assert_eq!(combo.tier(), ComboTier::Finisher);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // The count never leaves [0, max_chain - 1] for any interleaving
            // of starts and ticks.
            #[test]
            fn count_stays_bounded(ops in proptest::collection::vec(any::<bool>(), 0..256)) {
                let mut combo = ComboTracker::default();
                for start in ops {
                    if start {
                        combo.on_start();
                    } else {
                        combo.tick();
                    }
                    prop_assert!(combo.count() <= combo.config().max_chain - 1);
                }
            }
        }
    }
}
