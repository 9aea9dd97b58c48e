//! Core state graph types.
//!
//! This module holds the plain values that describe a state graph:
//! - State frames (integer state plus terminal flag)
//! - Transitions between frames, keyed by action
//! - The immutable lookup table built from them
//!
//! Nothing in here performs I/O.

mod state;
mod transition;

pub use state::{StateFrame, StateId};
pub use transition::{Transition, TransitionTable};
