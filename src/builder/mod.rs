//! Builder API for ergonomic group construction.
//!
//! This module provides fluent builders for transitions and groups, and the
//! [`frames!`](crate::frames) macro for declaring state frames.

pub mod error;
pub mod group;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use group::GroupBuilder;
pub use transition::TransitionBuilder;
