//! The redo log port and its durable implementation.
//!
//! A group persists every step of a transition through a [`RedoLog`]:
//! a short-lived log row per step plus one long-lived checkpoint record per
//! instance holding its settled state. On restart the same port answers the
//! recovery queries used to rebuild groups.
//!
//! # Protocol
//!
//! Every transition cycle commits exactly two rows:
//!
//! 1. A `Doing` row, with the transition's `from` as its own `from`. The
//!    checkpoint is rewritten with `from`, which is already true.
//! 2. A `Done` row, with the destination (`to` or `fail`) as its `from`. The
//!    checkpoint is rewritten with the destination, which makes the arrival
//!    durable.
//!
//! Only then are both rows deleted with [`RedoLog::apply`]. A checkpoint is
//! always written before the row it supersedes is deleted.

use crate::core::StateFrame;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod codec;
pub mod error;
mod table;

pub use codec::{Encoding, SCHEMA_VERSION};
pub use error::RedoError;
pub use table::{TableLog, TableLogOptions};

/// Identifier of a log row, assigned by the store.
pub type RowId = u64;

/// Identifier of a state machine instance (its checkpoint record).
pub type InstanceId = u64;

/// Phase of a transition recorded by a log row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    /// The transition has been admitted and is waiting for its outcome
    Doing,
    /// The transition reached its destination
    Done,
}

/// A log row before the store has assigned it an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub instance: InstanceId,
    pub from: StateFrame,
    pub to: StateFrame,
    pub fail: StateFrame,
    pub action: String,
    pub data: Vec<u8>,
    pub status: EventStatus,
}

/// A persisted redo log row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub id: RowId,
    pub instance: InstanceId,
    pub from: StateFrame,
    pub to: StateFrame,
    pub fail: StateFrame,
    pub action: String,
    pub data: Vec<u8>,
    pub status: EventStatus,
    pub committed_at: DateTime<Utc>,
}

impl LogRow {
    pub(crate) fn from_entry(id: RowId, entry: LogEntry) -> Self {
        Self {
            id,
            instance: entry.instance,
            from: entry.from,
            to: entry.to,
            fail: entry.fail,
            action: entry.action,
            data: entry.data,
            status: entry.status,
            committed_at: Utc::now(),
        }
    }
}

/// The durable current state of one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub id: InstanceId,
    /// Kind of business object the machine is attached to
    pub owner_type: String,
    /// Identifier of that business object
    pub owner_id: String,
    pub state: StateFrame,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage contract the engine depends on.
///
/// Implementations must make [`commit`](RedoLog::commit) atomic: the row
/// insert and the checkpoint overwrite either both happen or neither does.
#[async_trait]
pub trait RedoLog: Send + Sync {
    /// Append a log row and overwrite the instance checkpoint with
    /// `entry.from`. Returns the stored row.
    async fn commit(&self, entry: LogEntry) -> Result<LogRow, RedoError>;

    /// Delete a log row whose information has been checkpointed.
    async fn apply(&self, row: RowId) -> Result<(), RedoError>;

    /// Create the checkpoint record for a new instance.
    async fn fsm_persist(
        &self,
        owner_type: &str,
        owner_id: &str,
        initial: StateFrame,
    ) -> Result<CheckpointRecord, RedoError>;

    /// Delete an instance's checkpoint record and any leftover log rows.
    async fn destroy_fsm(&self, instance: InstanceId) -> Result<(), RedoError>;

    /// List every live instance.
    async fn recover_fsm(&self) -> Result<Vec<CheckpointRecord>, RedoError>;

    /// Find the pending `Doing` row of an instance, if any.
    async fn recover_event_for_group(
        &self,
        instance: InstanceId,
    ) -> Result<Option<LogRow>, RedoError>;

    /// Read one checkpoint record.
    async fn checkpoint(
        &self,
        instance: InstanceId,
    ) -> Result<Option<CheckpointRecord>, RedoError>;

    /// All log rows of an instance in commit order.
    async fn rows_for(&self, instance: InstanceId) -> Result<Vec<LogRow>, RedoError>;
}
