//! Conditions that need an operator rather than a caller.

use crate::redo::{InstanceId, RowId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Published on a group's alert channel. Each alert is also logged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alert {
    /// Committing the outcome of a transition failed. The admission slot is
    /// still held; the instance accepts no submits until
    /// [`Group::resolve_in_flight`](crate::Group::resolve_in_flight) succeeds.
    ResolutionFailed {
        instance: InstanceId,
        row: RowId,
        error: String,
    },

    /// A settled row could not be deleted. The checkpoint is correct; the
    /// row is cleaned up by the next [`Group::start`](crate::Group::start).
    CompactionFailed {
        instance: InstanceId,
        row: RowId,
        error: String,
    },

    /// An open transition outlived the resolve deadline
    Stalled {
        instance: InstanceId,
        row: RowId,
        waited: Duration,
    },

    /// An open event was dropped without being completed or failed
    TicketDropped { instance: InstanceId, row: RowId },

    /// The event receiver is gone, so an event could not be delivered
    Undelivered { instance: InstanceId, row: RowId },
}

impl Alert {
    pub fn instance(&self) -> InstanceId {
        match self {
            Self::ResolutionFailed { instance, .. }
            | Self::CompactionFailed { instance, .. }
            | Self::Stalled { instance, .. }
            | Self::TicketDropped { instance, .. }
            | Self::Undelivered { instance, .. } => *instance,
        }
    }
}
