//! Build errors for group and transition builders.

use thiserror::Error;

/// Errors that can occur when building groups and transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(frame) before .persist()")]
    MissingInitialState,

    #[error("No transitions defined. Add at least one transition")]
    NoTransitions,

    #[error("Transition {index} is empty: zero states and no action")]
    EmptyTransition { index: usize },

    #[error("Transition source state not specified. Call .from(frame)")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(frame)")]
    MissingToState,

    #[error("Transition failure state not specified. Call .fail(frame)")]
    MissingFailState,
}
