//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use durafsm::core::{StateFrame, Transition};
use durafsm::frames;
use durafsm::redo::{
    CheckpointRecord, EventStatus, InstanceId, LogEntry, LogRow, RedoError, RedoLog, RowId,
    TableLog,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

frames! {
    pub INIT = 0;
    pub CREATED = 1;
    pub CREATE_FAILED = 2, final;
    pub RUNNING = 4, final;
    pub START_FAILED = 5, final;
}

/// `create: Init -> Created / CreateFailed`, `start: Created -> Running / StartFailed`.
pub fn cluster_transitions() -> Vec<Transition> {
    vec![
        Transition::new("create", INIT, CREATED, CREATE_FAILED),
        Transition::new("start", CREATED, RUNNING, START_FAILED),
    ]
}

/// A self-loop usable any number of times.
pub fn ping() -> Transition {
    Transition::new("ping", INIT, INIT, INIT)
}

/// Table log with switchable faults.
pub struct FlakyLog {
    inner: TableLog,
    fail_commit: Mutex<Option<EventStatus>>,
    fail_apply: AtomicBool,
}

impl FlakyLog {
    pub fn new() -> Self {
        Self {
            inner: TableLog::in_memory().expect("in-memory redo log"),
            fail_commit: Mutex::new(None),
            fail_apply: AtomicBool::new(false),
        }
    }

    /// Fail every commit of rows with `status`; `None` heals.
    pub fn fail_commits(&self, status: Option<EventStatus>) {
        *self.fail_commit.lock() = status;
    }

    pub fn fail_applies(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }
}

fn injected() -> RedoError {
    RedoError::Backend("injected fault".to_string())
}

#[async_trait]
impl RedoLog for FlakyLog {
    async fn commit(&self, entry: LogEntry) -> Result<LogRow, RedoError> {
        if *self.fail_commit.lock() == Some(entry.status) {
            return Err(injected());
        }
        self.inner.commit(entry).await
    }

    async fn apply(&self, row: RowId) -> Result<(), RedoError> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.apply(row).await
    }

    async fn fsm_persist(
        &self,
        owner_type: &str,
        owner_id: &str,
        initial: StateFrame,
    ) -> Result<CheckpointRecord, RedoError> {
        self.inner.fsm_persist(owner_type, owner_id, initial).await
    }

    async fn destroy_fsm(&self, instance: InstanceId) -> Result<(), RedoError> {
        self.inner.destroy_fsm(instance).await
    }

    async fn recover_fsm(&self) -> Result<Vec<CheckpointRecord>, RedoError> {
        self.inner.recover_fsm().await
    }

    async fn recover_event_for_group(
        &self,
        instance: InstanceId,
    ) -> Result<Option<LogRow>, RedoError> {
        self.inner.recover_event_for_group(instance).await
    }

    async fn checkpoint(
        &self,
        instance: InstanceId,
    ) -> Result<Option<CheckpointRecord>, RedoError> {
        self.inner.checkpoint(instance).await
    }

    async fn rows_for(&self, instance: InstanceId) -> Result<Vec<LogRow>, RedoError> {
        self.inner.rows_for(instance).await
    }
}
