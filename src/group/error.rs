//! Engine error types.

use crate::builder::BuildError;
use crate::core::StateId;
use crate::redo::{RedoError, RowId};
use thiserror::Error;

/// Errors returned by a group and its events
#[derive(Debug, Error)]
pub enum GroupError {
    /// No transition is registered for the action out of the present state
    #[error("No transition for action '{action}' from state {state}")]
    NoTransition { state: StateId, action: String },

    /// The present state is final and the policy rejects submits from it
    #[error("State {state} is final, submits are rejected")]
    FinalState { state: StateId },

    /// The redo log failed
    #[error("Redo log failed: {0}")]
    Persistence(#[from] RedoError),

    /// The event is not the transition currently open on its group
    #[error("Event {row} is not the open transition")]
    NotInFlight { row: RowId },

    /// There is no open transition to act on
    #[error("No transition is open")]
    Idle,

    /// A transition is already open
    #[error("A transition is already open")]
    Busy,

    /// The submit was cancelled while waiting for the admission slot
    #[error("Submit cancelled while waiting for the admission slot")]
    Cancelled,

    /// The event receiver has already been handed out
    #[error("Event watcher already taken")]
    WatcherTaken,

    /// The group has been dropped or destroyed
    #[error("State machine group is closed")]
    Closed,

    #[error("Invalid group definition: {0}")]
    Build(#[from] BuildError),
}

impl GroupError {
    /// True for errors raised before anything was written. The instance is
    /// unchanged and the submit may be retried.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::NoTransition { .. } | Self::FinalState { .. } | Self::Cancelled
        )
    }
}
