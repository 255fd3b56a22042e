//! Core error types.

use thiserror::Error;

/// Errors raised while computing audit change sets.
#[derive(Debug, Error)]
pub enum Error {
    /// An update event arrived without the entity's previous state.
    ///
    /// The entity was modified without being loaded into the tracking
    /// session first. Retrying will not help.
    #[error(
        "update of {entity} carries no previous state; load the entity in the session before modifying it"
    )]
    MissingPreviousState {
        /// Entity type name.
        entity: String,
    },

    /// A state array does not line up with the entity's properties.
    #[error("state of {entity} has {actual} values, expected {expected}")]
    StateMismatch {
        /// Entity type name.
        entity: String,
        /// Number of mapped properties.
        expected: usize,
        /// Number of values in the event.
        actual: usize,
    },

    /// Entity type not registered.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}
