//! Attack timing state machine.
//!
//! This module provides [`AttackTimeline`], the windup/active/recovery
//! finite-state machine shared by every attacker: the player weapon and
//! each boss pattern drive their own instance.
//!
//! Tick semantics: a phase lasting N ticks is observed for exactly N
//! simulation ticks. An attack started during a tick's input stage is in
//! Windup for that same tick.

use serde::{Deserialize, Serialize};
use umbra_common::{Aabb, Vec2};

use crate::attack::{AttackDefinition, AttackInstance};

/// Upper bound on phase transitions processed in a single tick.
///
/// A restart through a zero-length windup takes at most three transitions;
/// the bound only guards against a malformed all-zero definition that the
/// data loader should have rejected.
const MAX_TRANSITIONS_PER_TICK: u32 = 4;

/// Phase of an attack timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimelinePhase {
    /// No attack in progress.
    Idle,
    /// Preparing to strike; the telegraph window.
    Windup,
    /// The damage window; the hitbox exists only here.
    Active,
    /// Recovering after the attack.
    Recovery,
    /// Externally held (stun or phase-transition interrupt).
    Stunned,
}

/// Signal produced by [`AttackTimeline::tick`] on a completed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineSignal {
    /// The attack finished and the timeline returned to Idle.
    Finished,
    /// Recovery ended and a queued follow-up restarted the timeline.
    Restarted,
}

/// Windup/active/recovery state machine for a single attacker.
#[derive(Debug, Clone, Default)]
pub struct AttackTimeline {
    phase: TimelinePhase,
    /// Ticks spent in the current phase, counting the current one.
    elapsed: u32,
    stun_remaining: u32,
    instance: Option<AttackInstance>,
}

impl Default for TimelinePhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl AttackTimeline {
    /// Creates an idle timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TimelinePhase {
        self.phase
    }

    /// The attack attempt currently in flight, if any.
    #[must_use]
    pub fn instance(&self) -> Option<&AttackInstance> {
        self.instance.as_ref()
    }

    /// Mutable access to the attack attempt in flight.
    pub fn instance_mut(&mut self) -> Option<&mut AttackInstance> {
        self.instance.as_mut()
    }

    /// Whether the damage window is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == TimelinePhase::Active
    }

    /// Whether an attack is in progress (any non-Idle, non-Stunned phase).
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        matches!(
            self.phase,
            TimelinePhase::Windup | TimelinePhase::Active | TimelinePhase::Recovery
        )
    }

    /// Whether the timeline is inside a cancel-eligible window.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        let Some(instance) = &self.instance else {
            return false;
        };
        let cancel = instance.def.cancel;

        match self.phase {
            TimelinePhase::Active => {
                let active = instance.def.active as f32;
                self.elapsed as f32 > active * (1.0 - cancel.active_fraction)
            }
            TimelinePhase::Recovery => cancel.recovery,
            _ => false,
        }
    }

    /// Attempts to start an attack.
    ///
    /// Fails (returns false, no mutation) unless the timeline is Idle or
    /// inside a cancel-eligible window; on success the phase resets to
    /// Windup with zero elapsed ticks.
    pub fn start(&mut self, def: &AttackDefinition, aim: Vec2, combo_index: u8) -> bool {
        if self.phase != TimelinePhase::Idle && !self.can_cancel() {
            return false;
        }

        self.instance = Some(AttackInstance::new(def.clone(), aim, combo_index));
        self.phase = TimelinePhase::Windup;
        self.elapsed = 0;
        true
    }

    /// Queues a follow-up to fire when Recovery completes.
    ///
    /// Only allowed inside a cancel-eligible window. The follow-up replaces
    /// any previously queued one.
    pub fn queue_next(&mut self, def: &AttackDefinition) -> bool {
        if !self.can_cancel() {
            return false;
        }
        if let Some(instance) = &mut self.instance {
            instance.queued = Some(def.clone());
            return true;
        }
        false
    }

    /// Interrupts the timeline, dropping any attack in flight.
    ///
    /// The timeline holds in Stunned for the given number of ticks, then
    /// returns to Idle. Zero ticks resets straight to Idle.
    pub fn interrupt(&mut self, ticks: u32) {
        self.instance = None;
        self.elapsed = 0;
        if ticks == 0 {
            self.phase = TimelinePhase::Idle;
            self.stun_remaining = 0;
        } else {
            self.phase = TimelinePhase::Stunned;
            self.stun_remaining = ticks;
        }
    }

    /// Resets the timeline to Idle, dropping any attack in flight.
    pub fn reset(&mut self) {
        self.interrupt(0);
    }

    /// Advances the timeline by one tick.
    ///
    /// Returns a signal when the attack finished or chained into a queued
    /// follow-up this tick.
    pub fn tick(&mut self) -> Option<TimelineSignal> {
        match self.phase {
            TimelinePhase::Idle => None,
            TimelinePhase::Stunned => {
                self.stun_remaining = self.stun_remaining.saturating_sub(1);
                if self.stun_remaining == 0 {
                    self.phase = TimelinePhase::Idle;
                }
                None
            }
            _ => {
                let signal = self.advance_transitions();
                if self.phase != TimelinePhase::Idle {
                    self.elapsed += 1;
                }
                signal
            }
        }
    }

    /// Performs all phase transitions due before this tick is observed.
    fn advance_transitions(&mut self) -> Option<TimelineSignal> {
        let mut signal = None;

        for _ in 0..MAX_TRANSITIONS_PER_TICK {
            let duration = self.current_phase_duration();
            if self.elapsed < duration {
                break;
            }

            match self.phase {
                TimelinePhase::Windup => {
                    self.phase = TimelinePhase::Active;
                    self.elapsed = 0;
                }
                TimelinePhase::Active => {
                    self.phase = TimelinePhase::Recovery;
                    self.elapsed = 0;
                }
                TimelinePhase::Recovery => {
                    let queued = self
                        .instance
                        .as_mut()
                        .and_then(|instance| instance.queued.take());

                    match queued {
                        Some(def) => {
                            // Chain into the follow-up with a fresh windup;
                            // aim and combo index carry over until the owner
                            // re-aims via `instance_mut`.
                            let (aim, combo_index) = self
                                .instance
                                .as_ref()
                                .map_or((Vec2::RIGHT, 0), |i| (i.aim, i.combo_index));
                            self.instance = Some(AttackInstance::new(def, aim, combo_index));
                            self.phase = TimelinePhase::Windup;
                            self.elapsed = 0;
                            signal = Some(TimelineSignal::Restarted);
                        }
                        None => {
                            self.instance = None;
                            self.phase = TimelinePhase::Idle;
                            self.elapsed = 0;
                            signal = Some(TimelineSignal::Finished);
                            break;
                        }
                    }
                }
                _ => break,
            }
        }

        signal
    }

    fn current_phase_duration(&self) -> u32 {
        let Some(instance) = &self.instance else {
            return 0;
        };
        match self.phase {
            TimelinePhase::Windup => instance.def.windup,
            TimelinePhase::Active => instance.def.active,
            TimelinePhase::Recovery => instance.def.recovery,
            _ => 0,
        }
    }

    /// Progress through the whole attack, in [0, 1]. Zero when idle.
    #[must_use]
    pub fn progress(&self) -> f32 {
        let Some(instance) = &self.instance else {
            return 0.0;
        };
        let total = instance.def.total_ticks();
        if total == 0 {
            return 1.0;
        }

        let done = match self.phase {
            TimelinePhase::Windup => self.elapsed,
            TimelinePhase::Active => instance.def.windup + self.elapsed,
            TimelinePhase::Recovery => instance.def.windup + instance.def.active + self.elapsed,
            _ => 0,
        };

        (done as f32 / total as f32).clamp(0.0, 1.0)
    }

    /// Progress through the current phase, in [0, 1].
    #[must_use]
    pub fn phase_progress(&self) -> f32 {
        let duration = self.current_phase_duration();
        if duration == 0 {
            return 1.0;
        }
        (self.elapsed as f32 / duration as f32).clamp(0.0, 1.0)
    }

    /// Progress through the Active phase, in [0, 1]. Zero outside Active.
    #[must_use]
    pub fn active_progress(&self) -> f32 {
        if self.phase != TimelinePhase::Active {
            return 0.0;
        }
        let Some(instance) = &self.instance else {
            return 0.0;
        };
        if instance.def.active == 0 {
            return 1.0;
        }
        (self.elapsed as f32 / instance.def.active as f32).clamp(0.0, 1.0)
    }

    /// Returns the hitbox for this tick, or None outside the Active phase.
    #[must_use]
    pub fn hitbox(&self, origin: Vec2) -> Option<Aabb> {
        if self.phase != TimelinePhase::Active {
            return None;
        }
        self.instance
            .as_ref()
            .map(|instance| instance.shape_hitbox(origin))
    }
}
