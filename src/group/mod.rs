//! The state machine engine.
//!
//! A [`Group`] drives one instance through its transition table. At most one
//! transition per instance is open at any time: [`Group::submit`] takes the
//! instance's single admission slot and only the resolution of the delivered
//! event gives it back. Groups never wait on each other.
//!
//! # Lifecycle of a transition
//!
//! 1. `submit` matches `(present state, action)` and commits a `Doing` row.
//! 2. A `Doing` [`Event`] is delivered to the watcher.
//! 3. The watcher performs the side effect and calls `complete` or `fail`.
//! 4. A `Done` row checkpoints the destination, both rows are deleted, a
//!    `Done` event is delivered, and the slot is released.
//!
//! Per instance the watcher therefore sees `Doing(n)`, `Done(n)`,
//! `Doing(n + 1)`, and so on, never interleaved.

mod alert;
mod error;
mod event;

pub use alert::Alert;
pub use error::GroupError;
pub use event::Event;

use crate::core::{StateFrame, Transition, TransitionTable};
use crate::policy::{GroupPolicy, StallStrategy};
use crate::redo::{CheckpointRecord, EventStatus, InstanceId, LogEntry, RedoLog, RowId};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;

/// Handle to one state machine instance.
///
/// Cloning is cheap; clones drive the same instance.
#[derive(Clone)]
pub struct Group {
    shared: Arc<Shared>,
}

/// The open transition. Holding it holds the admission slot.
struct InFlight {
    row: RowId,
    transition: Transition,
    _permit: OwnedSemaphorePermit,
}

pub(crate) struct Shared {
    id: InstanceId,
    owner_type: String,
    owner_id: String,
    table: TransitionTable,
    log: Arc<dyn RedoLog>,
    policy: GroupPolicy,
    present: Mutex<StateFrame>,
    slot: Arc<Semaphore>,
    in_flight: Mutex<Option<InFlight>>,
    events_tx: mpsc::Sender<Event>,
    events_rx: Mutex<Option<mpsc::Receiver<Event>>>,
    alerts: broadcast::Sender<Alert>,
}

impl Group {
    pub(crate) fn assemble(
        record: CheckpointRecord,
        table: TransitionTable,
        log: Arc<dyn RedoLog>,
        policy: GroupPolicy,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1);
        let (alerts, _) = broadcast::channel(policy.alert_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                id: record.id,
                owner_type: record.owner_type,
                owner_id: record.owner_id,
                table,
                log,
                policy,
                present: Mutex::new(record.state),
                slot: Arc::new(Semaphore::new(1)),
                in_flight: Mutex::new(None),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                alerts,
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.shared.id
    }

    pub fn owner_type(&self) -> &str {
        &self.shared.owner_type
    }

    pub fn owner_id(&self) -> &str {
        &self.shared.owner_id
    }

    /// The state of the last event delivered to the watcher.
    pub fn present_state(&self) -> StateFrame {
        *self.shared.present.lock()
    }

    /// True while a transition is open.
    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight.lock().is_some()
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.shared.table
    }

    pub fn policy(&self) -> &GroupPolicy {
        &self.shared.policy
    }

    /// Take the event receiver. There is exactly one per group.
    ///
    /// The channel holds a single event; the watcher must keep draining it
    /// or the next delivery waits.
    pub fn watch_events(&self) -> Result<mpsc::Receiver<Event>, GroupError> {
        self.shared
            .events_rx
            .lock()
            .take()
            .ok_or(GroupError::WatcherTaken)
    }

    /// Subscribe to operator alerts.
    pub fn alerts(&self) -> broadcast::Receiver<Alert> {
        self.shared.alerts.subscribe()
    }

    /// Start a transition.
    ///
    /// Waits while another transition of this instance is open. Errors
    /// returned before the `Doing` row is committed leave the instance
    /// untouched.
    pub async fn submit(&self, action: &str, payload: Vec<u8>) -> Result<(), GroupError> {
        let permit = Arc::clone(&self.shared.slot)
            .acquire_owned()
            .await
            .map_err(|_| GroupError::Closed)?;
        self.shared.begin(permit, action, payload).await
    }

    /// Like [`submit`](Group::submit), but gives up waiting for the
    /// admission slot when `cancel` fires. Once the slot is taken the submit
    /// runs to completion.
    pub async fn submit_with_cancel(
        &self,
        action: &str,
        payload: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<(), GroupError> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GroupError::Cancelled),
            permit = Arc::clone(&self.shared.slot).acquire_owned() => {
                permit.map_err(|_| GroupError::Closed)?
            }
        };
        self.shared.begin(permit, action, payload).await
    }

    /// Resolve the open transition without its event.
    ///
    /// This is the way out after [`Alert::ResolutionFailed`] or a lost
    /// event: once the log is healthy again the host reports the outcome it
    /// actually observed, success included.
    pub async fn resolve_in_flight(
        &self,
        succeeded: bool,
        data: Vec<u8>,
    ) -> Result<(), GroupError> {
        let row = self
            .shared
            .in_flight
            .lock()
            .as_ref()
            .map(|flight| flight.row)
            .ok_or(GroupError::Idle)?;
        tracing::warn!(
            instance = self.shared.id,
            row,
            succeeded,
            "resolving open transition without its event"
        );
        self.shared.resolve(row, succeeded, data).await
    }

    /// Resolve the open transition with its fail destination.
    pub async fn abort_in_flight(&self, data: Vec<u8>) -> Result<(), GroupError> {
        self.resolve_in_flight(false, data).await
    }

    /// Reconcile the instance with its redo log after a restart.
    ///
    /// Rows left behind by a transition that already checkpointed its
    /// destination are deleted. A pending `Doing` row is adopted as the open
    /// transition and its event delivered again, so the host can re-drive
    /// the same action. Returns the id of the re-delivered row.
    pub async fn start(&self) -> Result<Option<RowId>, GroupError> {
        self.shared.recover().await
    }

    /// Retire the instance: delete its checkpoint and any log rows.
    ///
    /// Submits waiting on this instance, and any later ones through other
    /// handles, fail with [`GroupError::Closed`].
    pub async fn destroy(self) -> Result<(), GroupError> {
        self.shared.log.destroy_fsm(self.shared.id).await?;
        self.shared.slot.close();
        tracing::info!(
            instance = self.shared.id,
            owner_type = %self.shared.owner_type,
            owner_id = %self.shared.owner_id,
            "state machine destroyed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.shared.id)
            .field("owner_type", &self.shared.owner_type)
            .field("owner_id", &self.shared.owner_id)
            .field("present", &self.present_state())
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

impl Shared {
    async fn begin(
        self: &Arc<Self>,
        permit: OwnedSemaphorePermit,
        action: &str,
        data: Vec<u8>,
    ) -> Result<(), GroupError> {
        let present = *self.present.lock();
        if self.policy.reject_from_final && present.is_final() {
            return Err(GroupError::FinalState {
                state: present.state,
            });
        }
        let transition = self
            .table
            .lookup(present.state, action)
            .cloned()
            .ok_or_else(|| GroupError::NoTransition {
                state: present.state,
                action: action.to_string(),
            })?;

        let row = self
            .log
            .commit(LogEntry {
                instance: self.id,
                from: transition.from,
                to: transition.to,
                fail: transition.fail,
                action: transition.action.clone(),
                data,
                status: EventStatus::Doing,
            })
            .await
            .map_err(|err| {
                tracing::warn!(instance = self.id, action, error = %err, "commit failed");
                GroupError::Persistence(err)
            })?;

        tracing::info!(
            instance = self.id,
            action,
            row = row.id,
            from = %transition.from,
            to = %transition.to,
            "transition admitted"
        );
        *self.present.lock() = transition.from;
        *self.in_flight.lock() = Some(InFlight {
            row: row.id,
            transition,
            _permit: permit,
        });
        self.arm_deadline(row.id);
        self.deliver(Event::from_row(Arc::downgrade(self), &row))
            .await;
        Ok(())
    }

    pub(crate) async fn resolve(
        self: &Arc<Self>,
        row: RowId,
        succeeded: bool,
        data: Vec<u8>,
    ) -> Result<(), GroupError> {
        let flight = {
            let mut open = self.in_flight.lock();
            match open.take() {
                Some(flight) if flight.row == row => flight,
                other => {
                    *open = other;
                    return Err(GroupError::NotInFlight { row });
                }
            }
        };

        let transition = &flight.transition;
        let destination = transition.destination(succeeded);
        let committed = self
            .log
            .commit(LogEntry {
                instance: self.id,
                from: destination,
                to: transition.to,
                fail: transition.fail,
                action: transition.action.clone(),
                data,
                status: EventStatus::Done,
            })
            .await;
        let done = match committed {
            Ok(done) => done,
            Err(err) => {
                tracing::error!(
                    instance = self.id,
                    row,
                    error = %err,
                    "failed to commit transition outcome; instance is stuck"
                );
                self.alert(Alert::ResolutionFailed {
                    instance: self.id,
                    row,
                    error: err.to_string(),
                });
                *self.in_flight.lock() = Some(flight);
                self.arm_deadline(row);
                return Err(GroupError::Persistence(err));
            }
        };

        *self.present.lock() = destination;
        self.compact(flight.row, done.id).await;

        tracing::info!(
            instance = self.id,
            action = %transition.action,
            row,
            state = %destination,
            succeeded,
            "transition settled"
        );
        self.deliver(Event::from_row(Arc::downgrade(self), &done))
            .await;
        drop(flight);
        Ok(())
    }

    /// Delete the `Doing` row, then the `Done` row. If the first delete
    /// fails the `Done` row is kept so recovery knows the transition settled.
    async fn compact(&self, doing: RowId, done: RowId) {
        let mut failed = None;
        match self.log.apply(doing).await {
            Ok(()) => {
                if let Err(err) = self.log.apply(done).await {
                    failed = Some((done, err));
                }
            }
            Err(err) => failed = Some((doing, err)),
        }
        if let Some((row, err)) = failed {
            tracing::warn!(instance = self.id, row, error = %err, "compaction failed");
            self.alert(Alert::CompactionFailed {
                instance: self.id,
                row,
                error: err.to_string(),
            });
        }
    }

    async fn recover(self: &Arc<Self>) -> Result<Option<RowId>, GroupError> {
        let rows = self.log.rows_for(self.id).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let permit = self.try_claim_slot()?;

        if rows.iter().any(|row| row.status == EventStatus::Done) {
            // The outcome was checkpointed before the crash.
            for row in &rows {
                self.log.apply(row.id).await?;
            }
            tracing::info!(
                instance = self.id,
                rows = rows.len(),
                "compacted rows of a settled transition"
            );
            return Ok(None);
        }

        let Some(pending) = self.log.recover_event_for_group(self.id).await? else {
            return Ok(None);
        };
        for stale in rows.iter().filter(|row| row.id != pending.id) {
            self.log.apply(stale.id).await?;
        }

        let transition = Transition::new(
            pending.action.clone(),
            pending.from,
            pending.to,
            pending.fail,
        );
        tracing::info!(
            instance = self.id,
            row = pending.id,
            action = %pending.action,
            from = %pending.from,
            "re-delivering interrupted transition"
        );
        *self.present.lock() = pending.from;
        *self.in_flight.lock() = Some(InFlight {
            row: pending.id,
            transition,
            _permit: permit,
        });
        self.arm_deadline(pending.id);
        self.deliver(Event::from_row(Arc::downgrade(self), &pending))
            .await;
        Ok(Some(pending.id))
    }

    fn try_claim_slot(&self) -> Result<OwnedSemaphorePermit, GroupError> {
        Arc::clone(&self.slot)
            .try_acquire_owned()
            .map_err(|err| match err {
                TryAcquireError::Closed => GroupError::Closed,
                TryAcquireError::NoPermits => GroupError::Busy,
            })
    }

    async fn deliver(&self, event: Event) {
        let row = event.id();
        if let Err(mpsc::error::SendError(mut event)) = self.events_tx.send(event).await {
            event.disarm();
            tracing::warn!(instance = self.id, row, "event receiver dropped");
            self.alert(Alert::Undelivered {
                instance: self.id,
                row,
            });
        }
    }

    fn arm_deadline(self: &Arc<Self>, row: RowId) {
        let Some(timeout) = self.policy.resolve_timeout else {
            return;
        };
        let group = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = group.upgrade() {
                shared.on_deadline(row, timeout).await;
            }
        });
    }

    async fn on_deadline(self: &Arc<Self>, row: RowId, waited: std::time::Duration) {
        let open = self
            .in_flight
            .lock()
            .as_ref()
            .is_some_and(|flight| flight.row == row);
        if !open {
            return;
        }

        tracing::warn!(instance = self.id, row, ?waited, "transition stalled");
        self.alert(Alert::Stalled {
            instance: self.id,
            row,
            waited,
        });
        if self.policy.on_stall == StallStrategy::ForceFail {
            if let Err(err) = self.resolve(row, false, Vec::new()).await {
                tracing::error!(instance = self.id, row, error = %err, "force-fail failed");
            }
        }
    }

    pub(crate) fn alert(&self, alert: Alert) {
        // No subscribers is fine; the condition has been logged.
        let _ = self.alerts.send(alert);
    }
}
