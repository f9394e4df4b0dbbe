//! Error types for engine control operations.

use thiserror::Error;

use crate::engine::RunState;

/// Errors surfaced by the engine's control surface.
///
/// Per-item lookup failures are not represented here; those are absorbed
/// into failed records and the run keeps going.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Start was requested with no identifiers loaded.
    #[error("cannot start: the identifier queue is empty")]
    EmptyQueue,

    /// A destructive operation was requested without confirmation.
    ///
    /// The operation is a no-op until the caller passes `confirmed = true`.
    #[error("{operation} requires explicit confirmation")]
    ConfirmationRequired { operation: &'static str },

    /// The queue or the results cannot be replaced while a run is active.
    #[error("operation not permitted while a run is {state}")]
    RunActive { state: RunState },
}
