//! Transition tickets delivered to a group's watcher.

use super::alert::Alert;
use super::error::GroupError;
use super::Shared;
use crate::core::StateFrame;
use crate::redo::{EventStatus, InstanceId, LogRow, RowId};
use std::sync::Weak;

/// One step of a transition, as seen by the watcher.
///
/// A group delivers two events per transition: a `Doing` event when the
/// transition is admitted and a `Done` event once it has settled. The
/// watcher performs the side effect for a `Doing` event and then reports
/// the outcome with [`complete`](Event::complete) or [`fail`](Event::fail).
/// Both consume the event, so an outcome can be reported at most once.
///
/// Dropping a `Doing` event without resolving it does not free the
/// instance: no further submit is admitted until the transition is resolved
/// through [`Group::resolve_in_flight`](crate::Group::resolve_in_flight) or
/// the policy's resolve deadline. The drop is logged and alerted.
#[derive(Debug)]
pub struct Event {
    row: RowId,
    instance: InstanceId,
    group: Weak<Shared>,
    from: StateFrame,
    to: StateFrame,
    fail: StateFrame,
    action: String,
    data: Vec<u8>,
    status: EventStatus,
    armed: bool,
}

impl Event {
    pub(crate) fn from_row(group: Weak<Shared>, row: &LogRow) -> Self {
        Self {
            row: row.id,
            instance: row.instance,
            group,
            from: row.from,
            to: row.to,
            fail: row.fail,
            action: row.action.clone(),
            data: row.data.clone(),
            status: row.status,
            armed: row.status == EventStatus::Doing,
        }
    }

    /// Id of the log row this event was committed as.
    pub fn id(&self) -> RowId {
        self.row
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// For `Doing` events the state being left; for `Done` events the state
    /// that was reached.
    pub fn from(&self) -> StateFrame {
        self.from
    }

    pub fn to(&self) -> StateFrame {
        self.to
    }

    /// Where the instance lands if the transition fails.
    pub fn fail_state(&self) -> StateFrame {
        self.fail
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Opaque payload: the submit payload for `Doing` events, the outcome
    /// payload for `Done` events.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// Report success: the instance moves to [`to`](Event::to).
    ///
    /// Returns once the destination has been checkpointed, the log rows
    /// compacted, and the `Done` event handed to the watcher.
    pub async fn complete(self, data: Vec<u8>) -> Result<(), GroupError> {
        self.resolve(true, data).await
    }

    /// Report failure: the instance moves to [`fail_state`](Event::fail_state).
    pub async fn fail(self, data: Vec<u8>) -> Result<(), GroupError> {
        self.resolve(false, data).await
    }

    async fn resolve(mut self, succeeded: bool, data: Vec<u8>) -> Result<(), GroupError> {
        self.armed = false;
        if self.status != EventStatus::Doing {
            return Err(GroupError::NotInFlight { row: self.row });
        }
        let group = self.group.upgrade().ok_or(GroupError::Closed)?;
        group.resolve(self.row, succeeded, data).await
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(
            instance = self.instance,
            row = self.row,
            action = %self.action,
            "open event dropped without complete or fail; instance stays blocked"
        );
        if let Some(group) = self.group.upgrade() {
            group.alert(Alert::TicketDropped {
                instance: self.instance,
                row: self.row,
            });
        }
    }
}
