//! Per-group policy: how long an open transition may stay unresolved and
//! what the group does when it is not.
//!
//! Without a policy a group behaves exactly as the bare protocol does: no
//! deadline, and submits from final states are allowed.
//!
//! # Example
//!
//! ```rust
//! use durafsm::policy::{PolicyBuilder, StallStrategy};
//! use std::time::Duration;
//!
//! let policy = PolicyBuilder::new()
//!     .resolve_timeout(Duration::from_secs(30))
//!     .on_stall(StallStrategy::ForceFail)
//!     .reject_from_final(true)
//!     .build();
//!
//! assert_eq!(policy.resolve_timeout, Some(Duration::from_secs(30)));
//! ```

pub mod builder;
pub mod stall;

pub use builder::PolicyBuilder;
pub use stall::StallStrategy;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default buffer of the alert channel.
pub const DEFAULT_ALERT_CAPACITY: usize = 64;

/// Settings applied to every transition of a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupPolicy {
    /// Deadline for resolving an open transition. `None` waits forever.
    pub resolve_timeout: Option<Duration>,

    /// What to do when the deadline passes
    pub on_stall: StallStrategy,

    /// Refuse submits while the present state is final
    pub reject_from_final: bool,

    /// Buffer of the alert broadcast channel
    pub alert_capacity: usize,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            resolve_timeout: None,
            on_stall: StallStrategy::ForceFail,
            reject_from_final: false,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
        }
    }
}
