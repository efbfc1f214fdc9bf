//! Combat feel: hit-pause, screen shake, attack lock.
//!
//! Purely reactive to hit and attack events; none of these timers hold
//! gameplay authority. The hit-pause counter freezes the entire gameplay
//! tick while it runs down, screen shake feeds the camera a decaying
//! random offset, and the attack lock commits the player through early
//! attack frames by gating movement input.

use umbra_common::Vec2;

/// Hit-pause ticks for a heavy hit.
const PAUSE_HEAVY: u32 = 5;
/// Hit-pause ticks for a normal hit.
const PAUSE_LIGHT: u32 = 2;
/// Extra hit-pause ticks for a critical hit.
const PAUSE_CRIT_BONUS: u32 = 2;
/// Shake intensity and duration for a heavy hit.
const SHAKE_HEAVY: (f32, u32) = (8.0, 12);
/// Shake intensity and duration for a normal hit.
const SHAKE_LIGHT: (f32, u32) = (4.0, 6);

/// Secondary feedback timers driven by combat events.
#[derive(Debug)]
pub struct CombatFeel {
    hit_pause: u32,
    shake_intensity: f32,
    shake_duration: u32,
    shake_timer: u32,
    shake_offset: Vec2,
    attack_lock: u32,
    rng: fastrand::Rng,
}

impl Default for CombatFeel {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CombatFeel {
    /// Creates the feel state with a deterministic shake seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            hit_pause: 0,
            shake_intensity: 0.0,
            shake_duration: 0,
            shake_timer: 0,
            shake_offset: Vec2::ZERO,
            attack_lock: 0,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Registers a landed hit, driving pause and shake.
    pub fn on_hit(&mut self, is_heavy: bool, is_crit: bool) {
        let mut pause = if is_heavy { PAUSE_HEAVY } else { PAUSE_LIGHT };
        if is_crit {
            pause += PAUSE_CRIT_BONUS;
        }
        self.add_hit_pause(pause);

        let (intensity, duration) = if is_heavy { SHAKE_HEAVY } else { SHAKE_LIGHT };
        self.add_shake(intensity, duration);
    }

    /// Adds hit-pause ticks; never shortens an ongoing pause.
    pub fn add_hit_pause(&mut self, ticks: u32) {
        self.hit_pause = self.hit_pause.max(ticks);
    }

    /// Adds screen shake; never weakens an ongoing shake.
    pub fn add_shake(&mut self, intensity: f32, duration: u32) {
        self.shake_intensity = self.shake_intensity.max(intensity);
        self.shake_duration = self.shake_duration.max(duration);
        self.shake_timer = self.shake_duration;
    }

    /// Locks movement input for the given number of ticks.
    pub fn start_attack_lock(&mut self, ticks: u32) {
        self.attack_lock = self.attack_lock.max(ticks);
    }

    /// Whether the simulation-wide freeze-frame is in effect.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.hit_pause > 0
    }

    /// Whether movement input should be ignored.
    #[must_use]
    pub fn is_movement_locked(&self) -> bool {
        self.attack_lock > 0
    }

    /// Current camera shake offset.
    #[must_use]
    pub fn shake_offset(&self) -> Vec2 {
        self.shake_offset
    }

    /// Advances the feel timers by one tick.
    ///
    /// Returns true while the hit-pause freeze is in effect; the caller
    /// must skip the gameplay portion of the tick. The shake is purely
    /// cosmetic and keeps decaying through the freeze; the attack lock is
    /// gameplay-facing and does not.
    pub fn update(&mut self) -> bool {
        self.update_shake();

        if self.hit_pause > 0 {
            self.hit_pause -= 1;
            return true;
        }

        if self.attack_lock > 0 {
            self.attack_lock -= 1;
        }

        false
    }

    fn update_shake(&mut self) {
        if self.shake_timer == 0 {
            self.shake_offset = Vec2::ZERO;
            return;
        }

        self.shake_timer -= 1;
        // Intensity decays linearly to zero over the duration.
        let progress = 1.0 - self.shake_timer as f32 / self.shake_duration.max(1) as f32;
        let current = self.shake_intensity * (1.0 - progress);
        self.shake_offset = Vec2::new(
            (self.rng.f32() * 2.0 - 1.0) * current,
            (self.rng.f32() * 2.0 - 1.0) * current,
        );
        if self.shake_timer == 0 {
            self.shake_intensity = 0.0;
            self.shake_offset = Vec2::ZERO;
        }
    }
}
