//! Transitions and the lookup table the engine matches them with.

use super::state::{StateFrame, StateId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An edge of the state graph.
///
/// When the instance is in `from` and the host submits `action`, the
/// instance moves to `to` on success or to `fail` on failure.
///
/// # Example
///
/// ```rust
/// use durafsm::core::{StateFrame, Transition};
///
/// let create = Transition::new(
///     "create",
///     StateFrame::new(0),
///     StateFrame::new(1),
///     StateFrame::terminal(2),
/// );
///
/// assert_eq!(create.action, "create");
/// assert!(!create.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: StateFrame,
    pub to: StateFrame,
    pub fail: StateFrame,
    pub action: String,
}

impl Transition {
    pub fn new(
        action: impl Into<String>,
        from: StateFrame,
        to: StateFrame,
        fail: StateFrame,
    ) -> Self {
        Self {
            from,
            to,
            fail,
            action: action.into(),
        }
    }

    /// True when every frame is the zero frame and the action is empty.
    ///
    /// Such a transition carries no information and cannot be registered.
    pub fn is_empty(&self) -> bool {
        self.from.is_zero() && self.to.is_zero() && self.fail.is_zero() && self.action.is_empty()
    }

    /// Destination for the given outcome.
    pub fn destination(&self, succeeded: bool) -> StateFrame {
        if succeeded {
            self.to
        } else {
            self.fail
        }
    }
}

/// Immutable lookup from `(from state, action)` to a transition.
///
/// Built once when a group is constructed. A miss is an explicit `None`
/// rather than a zero-valued sentinel.
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    edges: HashMap<StateId, HashMap<String, Transition>>,
    registered: usize,
}

impl TransitionTable {
    /// Build a table from transitions in registration order.
    ///
    /// When two transitions share `(from.state, action)` the first one wins;
    /// later ones are shadowed.
    pub fn from_transitions<I>(transitions: I) -> Self
    where
        I: IntoIterator<Item = Transition>,
    {
        let mut edges: HashMap<StateId, HashMap<String, Transition>> = HashMap::new();
        let mut registered = 0;
        for transition in transitions {
            registered += 1;
            let by_action = edges.entry(transition.from.state).or_default();
            if by_action.contains_key(&transition.action) {
                tracing::debug!(
                    from = transition.from.state,
                    action = %transition.action,
                    "transition shadowed by an earlier registration"
                );
                continue;
            }
            by_action.insert(transition.action.clone(), transition);
        }
        Self { edges, registered }
    }

    /// Find the transition for `action` out of `state`.
    pub fn lookup(&self, state: StateId, action: &str) -> Option<&Transition> {
        self.edges.get(&state)?.get(action)
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.edges.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of transitions registered, including shadowed ones.
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Actions available out of `state`, sorted.
    pub fn actions_from(&self, state: StateId) -> Vec<&str> {
        let mut actions: Vec<&str> = self
            .edges
            .get(&state)
            .map(|by_action| by_action.keys().map(String::as_str).collect())
            .unwrap_or_default();
        actions.sort_unstable();
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT: StateFrame = StateFrame::new(0);
    const CREATED: StateFrame = StateFrame::new(1);
    const CREATE_FAILED: StateFrame = StateFrame::terminal(2);
    const RUNNING: StateFrame = StateFrame::terminal(4);
    const START_FAILED: StateFrame = StateFrame::terminal(5);

    fn table() -> TransitionTable {
        TransitionTable::from_transitions(vec![
            Transition::new("create", INIT, CREATED, CREATE_FAILED),
            Transition::new("start", CREATED, RUNNING, START_FAILED),
        ])
    }

    #[test]
    fn empty_transition_is_detected() {
        let zero = StateFrame::default();
        assert!(Transition::new("", zero, zero, zero).is_empty());
        assert!(!Transition::new("noop", zero, zero, zero).is_empty());
        assert!(!Transition::new("", zero, CREATED, zero).is_empty());
    }

    #[test]
    fn destination_follows_outcome() {
        let t = Transition::new("create", INIT, CREATED, CREATE_FAILED);
        assert_eq!(t.destination(true), CREATED);
        assert_eq!(t.destination(false), CREATE_FAILED);
    }

    #[test]
    fn lookup_matches_state_and_action() {
        let table = table();

        assert_eq!(table.lookup(0, "create").map(|t| t.to), Some(CREATED));
        assert_eq!(table.lookup(1, "start").map(|t| t.to), Some(RUNNING));
        assert!(table.lookup(0, "start").is_none());
        assert!(table.lookup(2, "create").is_none());
    }

    #[test]
    fn first_registration_wins() {
        let table = TransitionTable::from_transitions(vec![
            Transition::new("create", INIT, CREATED, CREATE_FAILED),
            Transition::new("create", INIT, RUNNING, START_FAILED),
        ]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.registered(), 2);
        assert_eq!(table.lookup(0, "create").map(|t| t.to), Some(CREATED));
    }

    #[test]
    fn lookup_ignores_final_flag_of_from() {
        // Matching is by state id only.
        let table = TransitionTable::from_transitions(vec![Transition::new(
            "retry",
            CREATE_FAILED,
            INIT,
            CREATE_FAILED,
        )]);
        assert!(table.lookup(2, "retry").is_some());
    }

    #[test]
    fn actions_from_lists_outgoing_edges() {
        let table = TransitionTable::from_transitions(vec![
            Transition::new("start", CREATED, RUNNING, START_FAILED),
            Transition::new("delete", CREATED, INIT, CREATED),
        ]);
        assert_eq!(table.actions_from(1), vec!["delete", "start"]);
        assert!(table.actions_from(0).is_empty());
    }
}
