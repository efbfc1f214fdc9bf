//! Combat event bus.
//!
//! The presentation layer (rendering, audio cues, health bars, combo
//! counters) consumes discrete events drained from this bus; the core
//! never draws. The bus is injected where events are produced, never
//! fetched from process-wide state.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use umbra_common::{ActorId, Vec2};

/// Discrete combat events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An attack left Idle and entered Windup.
    AttackStarted {
        /// Attacking actor
        actor: ActorId,
        /// Whether the attack is heavy
        heavy: bool,
    },
    /// A hit connected.
    HitLanded {
        /// Attacking actor
        attacker: ActorId,
        /// Actor that was hit
        target: ActorId,
        /// Final damage after defenses
        damage: f32,
        /// Whether the hit was a critical
        is_crit: bool,
        /// Whether the attack was heavy
        is_heavy: bool,
        /// World position of the hit
        position: Vec2,
    },
    /// The boss crossed into a new phase.
    PhaseTransition {
        /// Index of the newly active phase
        phase_index: usize,
    },
    /// The boss was defeated.
    BossDefeated {
        /// The boss actor
        boss: ActorId,
    },
    /// An actor was removed at end of tick after defeat.
    ActorDefeated {
        /// The defeated actor
        actor: ActorId,
    },
    /// A boss volley spawned a projectile.
    ProjectileSpawned {
        /// Spawn position
        position: Vec2,
        /// Initial velocity
        velocity: Vec2,
    },
}

/// Bounded event bus for broadcasting combat events.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for publishing events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: CombatEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<CombatEvent> {
        self.sender.clone()
    }
}
