//! Property-based tests for the transition table and the engine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

mod common;

use common::*;
use durafsm::builder::GroupBuilder;
use durafsm::core::{StateFrame, Transition, TransitionTable};
use durafsm::group::GroupError;
use durafsm::redo::{EventStatus, RedoLog, TableLog};
use proptest::prelude::*;
use std::sync::Arc;

const ACTIONS: [&str; 3] = ["create", "start", "ping"];

prop_compose! {
    fn arbitrary_frame()(state in 0..4i64, is_final in any::<bool>()) -> StateFrame {
        StateFrame { state, is_final }
    }
}

prop_compose! {
    fn arbitrary_transition()(
        from in arbitrary_frame(),
        to in arbitrary_frame(),
        fail in arbitrary_frame(),
        action in 0..ACTIONS.len(),
    ) -> Transition {
        Transition::new(ACTIONS[action], from, to, fail)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn first_registration_wins(
        transitions in prop::collection::vec(arbitrary_transition(), 0..20)
    ) {
        let table = TransitionTable::from_transitions(transitions.clone());

        for state in 0..4i64 {
            for action in ACTIONS {
                let expected = transitions
                    .iter()
                    .find(|t| t.from.state == state && t.action == action);
                prop_assert_eq!(table.lookup(state, action), expected);
            }
        }
        prop_assert_eq!(table.registered(), transitions.len());
    }

    #[test]
    fn checkpoint_tracks_every_outcome(
        steps in prop::collection::vec((0..ACTIONS.len(), any::<bool>()), 1..12)
    ) {
        runtime().block_on(async {
            let log: Arc<dyn RedoLog> = Arc::new(TableLog::in_memory().unwrap());
            let group = GroupBuilder::new(Arc::clone(&log))
                .initial(INIT)
                .transitions(cluster_transitions())
                .transition(ping())
                .persist("cluster", "prop")
                .await
                .unwrap();
            let table = TransitionTable::from_transitions(
                cluster_transitions().into_iter().chain([ping()]),
            );
            let mut events = group.watch_events().unwrap();
            let mut model = INIT;

            for (action, succeed) in steps {
                let action = ACTIONS[action];
                match table.lookup(model.state, action) {
                    Some(transition) => {
                        group.submit(action, Vec::new()).await.unwrap();
                        let doing = events.recv().await.unwrap();
                        prop_assert_eq!(doing.status(), EventStatus::Doing);
                        prop_assert_eq!(doing.from(), model);

                        if succeed {
                            doing.complete(Vec::new()).await.unwrap();
                        } else {
                            doing.fail(Vec::new()).await.unwrap();
                        }
                        model = transition.destination(succeed);

                        let done = events.recv().await.unwrap();
                        prop_assert_eq!(done.status(), EventStatus::Done);
                        prop_assert_eq!(done.from(), model);
                    }
                    None => {
                        let err = group.submit(action, Vec::new()).await.unwrap_err();
                        let is_no_transition = matches!(err, GroupError::NoTransition { .. });
                        prop_assert!(is_no_transition);
                    }
                }

                let record = log.checkpoint(group.id()).await.unwrap().unwrap();
                prop_assert_eq!(record.state, model);
                prop_assert_eq!(group.present_state(), model);
                prop_assert!(log.rows_for(group.id()).await.unwrap().is_empty());
                prop_assert!(!group.is_in_flight());
            }
            Ok(())
        })?;
    }

    #[test]
    fn frame_roundtrip_serialization(frame in arbitrary_frame()) {
        let json = serde_json::to_string(&frame).unwrap();
        let deserialized: StateFrame = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(frame, deserialized);
    }
}
