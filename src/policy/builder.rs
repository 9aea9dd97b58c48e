//! Builder API for creating group policies.

use crate::policy::stall::StallStrategy;
use crate::policy::GroupPolicy;
use std::time::Duration;

/// Builder for creating a [`GroupPolicy`]
pub struct PolicyBuilder {
    policy: GroupPolicy,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self {
            policy: GroupPolicy::default(),
        }
    }

    /// Set the resolution deadline
    pub fn resolve_timeout(mut self, duration: Duration) -> Self {
        self.policy.resolve_timeout = Some(duration);
        self
    }

    /// Set stall handling strategy
    pub fn on_stall(mut self, strategy: StallStrategy) -> Self {
        self.policy.on_stall = strategy;
        self
    }

    /// Refuse submits out of final states
    pub fn reject_from_final(mut self, reject: bool) -> Self {
        self.policy.reject_from_final = reject;
        self
    }

    /// Set the alert channel buffer. Zero is raised to one.
    pub fn alert_capacity(mut self, capacity: usize) -> Self {
        self.policy.alert_capacity = capacity.max(1);
        self
    }

    /// Build the policy
    pub fn build(self) -> GroupPolicy {
        self.policy
    }
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_field() {
        let policy = PolicyBuilder::new()
            .resolve_timeout(Duration::from_millis(250))
            .on_stall(StallStrategy::AlertOnly)
            .reject_from_final(true)
            .alert_capacity(8)
            .build();

        assert_eq!(policy.resolve_timeout, Some(Duration::from_millis(250)));
        assert_eq!(policy.on_stall, StallStrategy::AlertOnly);
        assert!(policy.reject_from_final);
        assert_eq!(policy.alert_capacity, 8);
    }

    #[test]
    fn zero_alert_capacity_is_raised() {
        let policy = PolicyBuilder::new().alert_capacity(0).build();
        assert_eq!(policy.alert_capacity, 1);
    }
}
