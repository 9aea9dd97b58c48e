//! Handling of transitions that outlive their deadline.

use serde::{Deserialize, Serialize};

/// Strategy for an open transition that was not resolved in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallStrategy {
    /// Resolve the transition with its fail destination and free the slot
    ForceFail,

    /// Keep waiting but publish an alert
    AlertOnly,
}
