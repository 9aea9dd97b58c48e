//! Builder for constructing groups.

use crate::builder::error::BuildError;
use crate::core::{StateFrame, Transition, TransitionTable};
use crate::group::{Group, GroupError};
use crate::policy::GroupPolicy;
use crate::redo::{CheckpointRecord, RedoLog};
use std::sync::Arc;

/// Builder for constructing groups with a fluent API.
///
/// A group is either born with [`persist`](GroupBuilder::persist), which
/// creates its checkpoint record, or rebuilt from a recovered record with
/// [`restore`](GroupBuilder::restore).
pub struct GroupBuilder {
    log: Arc<dyn RedoLog>,
    initial: Option<StateFrame>,
    transitions: Vec<Transition>,
    policy: GroupPolicy,
}

impl GroupBuilder {
    /// Create a new builder persisting through `log`.
    pub fn new(log: Arc<dyn RedoLog>) -> Self {
        Self {
            log,
            initial: None,
            transitions: Vec::new(),
            policy: GroupPolicy::default(),
        }
    }

    /// Set the initial state (required by `persist`).
    pub fn initial(mut self, frame: StateFrame) -> Self {
        self.initial = Some(frame);
        self
    }

    /// Add a transition. Registration order decides between duplicates.
    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions<I>(mut self, transitions: I) -> Self
    where
        I: IntoIterator<Item = Transition>,
    {
        self.transitions.extend(transitions);
        self
    }

    pub fn policy(mut self, policy: GroupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create the checkpoint record for a new instance and return its group.
    pub async fn persist(self, owner_type: &str, owner_id: &str) -> Result<Group, GroupError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        let table = table(self.transitions)?;
        let record = self.log.fsm_persist(owner_type, owner_id, initial).await?;
        tracing::info!(
            instance = record.id,
            owner_type,
            owner_id,
            state = %initial,
            "state machine persisted"
        );
        Ok(Group::assemble(record, table, self.log, self.policy))
    }

    /// Rebuild the group of an existing checkpoint record.
    ///
    /// The present state comes from the record; any initial state set on the
    /// builder is ignored. Call [`Group::start`] afterwards to pick up an
    /// interrupted transition.
    pub fn restore(self, record: CheckpointRecord) -> Result<Group, BuildError> {
        let table = table(self.transitions)?;
        Ok(Group::assemble(record, table, self.log, self.policy))
    }
}

fn table(transitions: Vec<Transition>) -> Result<TransitionTable, BuildError> {
    if transitions.is_empty() {
        return Err(BuildError::NoTransitions);
    }
    if let Some(index) = transitions.iter().position(Transition::is_empty) {
        return Err(BuildError::EmptyTransition { index });
    }
    Ok(TransitionTable::from_transitions(transitions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redo::TableLog;

    const INIT: StateFrame = StateFrame::new(0);
    const CREATED: StateFrame = StateFrame::new(1);
    const CREATE_FAILED: StateFrame = StateFrame::terminal(2);

    fn log() -> Arc<dyn RedoLog> {
        Arc::new(TableLog::in_memory().unwrap())
    }

    fn create() -> Transition {
        Transition::new("create", INIT, CREATED, CREATE_FAILED)
    }

    #[tokio::test]
    async fn builder_validates_required_fields() {
        let result = GroupBuilder::new(log())
            .transition(create())
            .persist("cluster", "c-1")
            .await;

        assert!(matches!(
            result,
            Err(GroupError::Build(BuildError::MissingInitialState))
        ));
    }

    #[tokio::test]
    async fn builder_requires_transitions() {
        let log = log();
        let result = GroupBuilder::new(Arc::clone(&log))
            .initial(INIT)
            .persist("cluster", "c-1")
            .await;

        assert!(matches!(result, Err(GroupError::Build(BuildError::NoTransitions))));
        assert!(log.recover_fsm().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_transition_is_rejected() {
        let zero = StateFrame::default();
        let result = GroupBuilder::new(log())
            .initial(INIT)
            .transition(create())
            .transition(Transition::new("", zero, zero, zero))
            .persist("cluster", "c-1")
            .await;

        assert!(matches!(
            result,
            Err(GroupError::Build(BuildError::EmptyTransition { index: 1 }))
        ));
    }

    #[tokio::test]
    async fn persist_creates_checkpoint() {
        let log = log();
        let group = GroupBuilder::new(Arc::clone(&log))
            .initial(INIT)
            .transition(create())
            .persist("cluster", "c-1")
            .await
            .unwrap();

        let record = log.checkpoint(group.id()).await.unwrap().unwrap();
        assert_eq!(record.state, INIT);
        assert_eq!(record.owner_type, "cluster");
        assert_eq!(group.owner_id(), "c-1");
        assert_eq!(group.present_state(), INIT);
    }

    #[tokio::test]
    async fn restore_takes_state_from_record() {
        let log = log();
        let record = log.fsm_persist("cluster", "c-1", CREATED).await.unwrap();

        let group = GroupBuilder::new(log)
            .initial(INIT)
            .transition(create())
            .restore(record.clone())
            .unwrap();

        assert_eq!(group.id(), record.id);
        assert_eq!(group.present_state(), CREATED);
        assert!(!group.is_in_flight());
    }
}
