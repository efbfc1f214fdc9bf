//! # Umbra Common
//!
//! Common types, utilities, and shared abstractions for Umbra.
//!
//! This crate provides foundational types used across all Umbra subsystems:
//! - ID types (ActorId, PatternId)
//! - Math primitives (Vec2, Aabb)
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod math;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::*;
}

pub use prelude::*;
