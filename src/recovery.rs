//! Rebuilding groups when a process starts.
//!
//! Checkpoint records only say which kind of object an instance belongs to;
//! the transitions live in code. A [`Recovery`] maps each owner type to its
//! transitions and policy, rebuilds a group for every live record, and
//! starts it so interrupted transitions are delivered again.
//!
//! # Example
//!
//! ```rust
//! use durafsm::core::{StateFrame, Transition};
//! use durafsm::recovery::Recovery;
//! use durafsm::redo::TableLog;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let log = Arc::new(TableLog::in_memory().unwrap());
//! let recovery = Recovery::new(log).register(
//!     "cluster",
//!     vec![Transition::new(
//!         "create",
//!         StateFrame::new(0),
//!         StateFrame::new(1),
//!         StateFrame::terminal(2),
//!     )],
//! );
//!
//! let report = recovery.recover().await.unwrap();
//! assert!(report.groups.is_empty());
//! # });
//! ```

use crate::builder::GroupBuilder;
use crate::core::Transition;
use crate::group::{Group, GroupError};
use crate::policy::GroupPolicy;
use crate::redo::{CheckpointRecord, InstanceId, RedoLog, RowId};
use std::collections::HashMap;
use std::sync::Arc;

struct Kind {
    transitions: Vec<Transition>,
    policy: GroupPolicy,
}

/// Registry of owner types used to rebuild groups.
pub struct Recovery {
    log: Arc<dyn RedoLog>,
    kinds: HashMap<String, Kind>,
}

/// Outcome of [`Recovery::recover`].
#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Every rebuilt and started group
    pub groups: Vec<Group>,
    /// Instances whose interrupted transition was delivered again, with the
    /// id of the re-delivered row
    pub redelivered: Vec<(InstanceId, RowId)>,
    /// Records whose owner type has no registration
    pub unknown: Vec<CheckpointRecord>,
}

impl Recovery {
    pub fn new(log: Arc<dyn RedoLog>) -> Self {
        Self {
            log,
            kinds: HashMap::new(),
        }
    }

    /// Register the transitions of an owner type with the default policy.
    pub fn register(self, owner_type: impl Into<String>, transitions: Vec<Transition>) -> Self {
        self.register_with_policy(owner_type, transitions, GroupPolicy::default())
    }

    pub fn register_with_policy(
        mut self,
        owner_type: impl Into<String>,
        transitions: Vec<Transition>,
        policy: GroupPolicy,
    ) -> Self {
        self.kinds.insert(
            owner_type.into(),
            Kind {
                transitions,
                policy,
            },
        );
        self
    }

    /// Rebuild and start a group for every live instance.
    ///
    /// Re-delivered events wait in each group's event channel until its
    /// watcher is attached with [`Group::watch_events`].
    pub async fn recover(&self) -> Result<RecoveryReport, GroupError> {
        let records = self.log.recover_fsm().await?;
        let mut report = RecoveryReport::default();

        for record in records {
            let Some(kind) = self.kinds.get(&record.owner_type) else {
                tracing::warn!(
                    instance = record.id,
                    owner_type = %record.owner_type,
                    "no transitions registered for owner type"
                );
                report.unknown.push(record);
                continue;
            };

            let group = GroupBuilder::new(Arc::clone(&self.log))
                .transitions(kind.transitions.iter().cloned())
                .policy(kind.policy.clone())
                .restore(record)?;
            if let Some(row) = group.start().await? {
                report.redelivered.push((group.id(), row));
            }
            report.groups.push(group);
        }

        tracing::info!(
            groups = report.groups.len(),
            redelivered = report.redelivered.len(),
            unknown = report.unknown.len(),
            "recovery finished"
        );
        Ok(report)
    }
}
