//! Error types for the combat simulation.
//!
//! Most "nothing happened" outcomes (no target in range, path search over
//! budget, intercept without a real root) are normal gameplay results and
//! are returned as `Option` or fallback values, not as errors.

use thiserror::Error;

use crate::components::EntityId;
use crate::physics::BodyHandle;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with this id is already registered.
    #[error("Entity {0} is already registered")]
    DuplicateEntity(EntityId),

    /// A physics body has no owner in the registry.
    #[error("Body {0:?} is not owned by any registered entity")]
    UnregisteredBody(BodyHandle),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid simulation state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
