//! State frames: the vertices of a state graph.
//!
//! States are opaque integers chosen by the host. A frame pairs the integer
//! with a flag marking it as terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer identifier of a state. The engine never interprets it.
pub type StateId = i64;

/// A state together with its terminal flag.
///
/// Frames are plain values: cheap to copy, compare, and persist.
///
/// # Example
///
/// ```rust
/// use durafsm::core::StateFrame;
///
/// const INIT: StateFrame = StateFrame::new(0);
/// const RUNNING: StateFrame = StateFrame::terminal(4);
///
/// assert!(!INIT.is_final());
/// assert!(RUNNING.is_final());
/// assert_eq!(RUNNING.state, 4);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct StateFrame {
    /// The state identifier
    pub state: StateId,
    /// Whether the state is terminal
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl StateFrame {
    /// A non-terminal frame.
    pub const fn new(state: StateId) -> Self {
        Self {
            state,
            is_final: false,
        }
    }

    /// A terminal frame.
    pub const fn terminal(state: StateId) -> Self {
        Self {
            state,
            is_final: true,
        }
    }

    /// Check if this is a final (terminal) state.
    ///
    /// The engine only refuses to leave a final state when the group policy
    /// asks it to; see [`crate::policy::GroupPolicy::reject_from_final`].
    pub const fn is_final(&self) -> bool {
        self.is_final
    }

    /// True for the zero frame (`state == 0`, not final).
    pub const fn is_zero(&self) -> bool {
        self.state == 0 && !self.is_final
    }
}

impl fmt::Display for StateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_final {
            write!(f, "{}(final)", self.state)
        } else {
            write!(f, "{}", self.state)
        }
    }
}
