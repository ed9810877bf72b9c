//! Domain error types.

use thiserror::Error;

use crate::model::ProcedureStepState;

/// Errors surfaced by the worklist services.
///
/// The HTTP layer maps these onto status codes and warning headers; the
/// services themselves never talk HTTP.
#[derive(Debug, Error)]
pub enum Error {
    /// A work item with this UID already exists.
    #[error("workitem already exists: {0}")]
    Duplicate(String),

    /// The target work item or subscription does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The work item is already in the requested terminal state.
    #[error("workitem is already in the requested state of {state}")]
    AlreadyInState {
        /// The terminal state the work item is in.
        state: ProcedureStepState,
    },

    /// The requested transition is not allowed by the state machine.
    #[error("illegal state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: ProcedureStepState,
        /// Requested state.
        to: ProcedureStepState,
    },

    /// The request conflicts with the work item's current state.
    #[error("request conflicts with workitem state {state}")]
    StateConflict {
        /// Current state.
        state: ProcedureStepState,
    },

    /// A transaction UID was required but not supplied.
    #[error("transaction UID is missing")]
    TransactionUidMissing,

    /// The supplied transaction UID does not match the stored one.
    #[error("transaction UID is incorrect")]
    TransactionUidMismatch,

    /// The request payload failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A malformed attribute payload.
    #[error(transparent)]
    Dicom(#[from] upsrs_dicom::Error),
}
