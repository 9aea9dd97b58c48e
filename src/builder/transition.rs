//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{StateFrame, Transition};

/// Builder for constructing transitions with a fluent API.
///
/// # Example
///
/// ```rust
/// use durafsm::builder::TransitionBuilder;
/// use durafsm::core::StateFrame;
///
/// let start = TransitionBuilder::new("start")
///     .from(StateFrame::new(1))
///     .to(StateFrame::terminal(4))
///     .fail(StateFrame::terminal(5))
///     .build()
///     .unwrap();
///
/// assert_eq!(start.to.state, 4);
/// ```
pub struct TransitionBuilder {
    action: String,
    from: Option<StateFrame>,
    to: Option<StateFrame>,
    fail: Option<StateFrame>,
}

impl TransitionBuilder {
    /// Create a new transition builder for `action`.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            from: None,
            to: None,
            fail: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, frame: StateFrame) -> Self {
        self.from = Some(frame);
        self
    }

    /// Set the success state (required).
    pub fn to(mut self, frame: StateFrame) -> Self {
        self.to = Some(frame);
        self
    }

    /// Set the failure state (required).
    pub fn fail(mut self, frame: StateFrame) -> Self {
        self.fail = Some(frame);
        self
    }

    /// Use the source state as the failure state: a failed attempt leaves
    /// the instance where it was.
    pub fn fail_in_place(mut self) -> Self {
        self.fail = self.from;
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let to = self.to.ok_or(BuildError::MissingToState)?;
        let fail = self.fail.ok_or(BuildError::MissingFailState)?;

        let transition = Transition::new(self.action, from, to, fail);
        if transition.is_empty() {
            return Err(BuildError::EmptyTransition { index: 0 });
        }
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT: StateFrame = StateFrame::new(0);
    const CREATED: StateFrame = StateFrame::new(1);
    const CREATE_FAILED: StateFrame = StateFrame::terminal(2);

    #[test]
    fn builder_validates_required_fields() {
        let result = TransitionBuilder::new("create").from(INIT).build();
        assert_eq!(result, Err(BuildError::MissingToState));

        let result = TransitionBuilder::new("create").from(INIT).to(CREATED).build();
        assert_eq!(result, Err(BuildError::MissingFailState));
    }

    #[test]
    fn fluent_api_builds_transition() {
        let transition = TransitionBuilder::new("create")
            .from(INIT)
            .to(CREATED)
            .fail(CREATE_FAILED)
            .build()
            .unwrap();

        assert_eq!(transition, Transition::new("create", INIT, CREATED, CREATE_FAILED));
    }

    #[test]
    fn fail_in_place_reuses_source() {
        let transition = TransitionBuilder::new("probe")
            .from(CREATED)
            .to(INIT)
            .fail_in_place()
            .build()
            .unwrap();

        assert_eq!(transition.fail, CREATED);
    }

    #[test]
    fn empty_transition_is_rejected() {
        let zero = StateFrame::default();
        let result = TransitionBuilder::new("").from(zero).to(zero).fail(zero).build();
        assert_eq!(result, Err(BuildError::EmptyTransition { index: 0 }));
    }
}
