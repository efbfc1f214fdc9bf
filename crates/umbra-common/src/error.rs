//! Error types shared across Umbra crates.

use thiserror::Error;

use crate::ids::ActorId;

/// Errors raised by the combat core.
///
/// State-machine rejections (starting an attack mid-swing, damaging a
/// defeated actor) are not errors; they are ordinary `false`/no-op results.
/// These variants cover genuine construction and lookup failures.
#[derive(Debug, Clone, Error)]
pub enum CombatError {
    /// Actor was constructed without a stat sheet.
    #[error("actor construction requires a stat sheet")]
    MissingStats,

    /// Actor not found in the arena.
    #[error("actor not found: {0:?}")]
    ActorNotFound(ActorId),

    /// Boss encounter was configured without any phases.
    #[error("boss encounter requires at least one phase")]
    NoPhases,
}

/// Result type alias for combat operations.
pub type CombatResult<T> = Result<T, CombatError>;
