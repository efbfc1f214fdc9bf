//! # Umbra Combat
//!
//! Real-time combat resolution and boss-encounter orchestration for Umbra.
//!
//! This crate is the deterministic, tick-by-tick core that decides who can
//! be hit, when, for how much, and how an adversary's behavior evolves:
//! - Attack timing state machine (windup/active/recovery) shared by every
//!   attacker
//! - Combo chains with continuation windows and damage scaling
//! - Hitbox construction, broad-phase queries, precise overlap and arc
//!   tests, damage/crit/knockback/hitstun math
//! - Multi-phase boss AI with telegraphed, data-driven attack patterns
//! - Combat feel: hit-pause, screen shake, attack lock
//!
//! Rendering, audio, terrain collision, and persistence live elsewhere;
//! they connect through the trait seams in [`spatial`] and the event bus
//! in [`events`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actor;
pub mod attack;
pub mod boss;
pub mod combo;
pub mod data;
pub mod events;
pub mod feel;
pub mod hit;
pub mod projectile;
pub mod sim;
pub mod spatial;
pub mod stats;
pub mod timeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::attack::*;
    pub use crate::boss::*;
    pub use crate::combo::*;
    pub use crate::data::*;
    pub use crate::events::*;
    pub use crate::feel::*;
    pub use crate::hit::*;
    pub use crate::projectile::*;
    pub use crate::sim::*;
    pub use crate::spatial::*;
    pub use crate::stats::*;
    pub use crate::timeline::*;
}

pub use prelude::*;
