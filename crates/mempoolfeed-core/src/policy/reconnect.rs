//! Bounded exponential backoff for reconnect attempts.

use std::time::Duration;

/// Configuration for the reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Consecutive failed attempts after which automatic retries stop.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_attempts: 5,
        }
    }
}

/// Stateless reconnect policy. Computes the delay for a 0-based attempt.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub config: ReconnectConfig,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    /// Returns `base * 2^attempt`, or `None` once `attempt >= max_attempts`
    /// (the policy is exhausted).
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if self.is_exhausted(attempt) {
            return None;
        }
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        Some(self.config.base_delay.saturating_mul(factor))
    }

    /// Returns `true` if no automatic retry remains after `attempt` failures.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.config.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_delays() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(0), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay(1), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay(2), Some(Duration::from_secs(8)));
        assert_eq!(policy.delay(3), Some(Duration::from_secs(16)));
        assert_eq!(policy.delay(4), Some(Duration::from_secs(32)));
        assert!(policy.delay(5).is_none());
    }

    #[test]
    fn exhaustion_boundary() {
        let policy = ReconnectPolicy::new(ReconnectConfig {
            base_delay: Duration::from_millis(100),
            max_attempts: 2,
        });
        assert!(!policy.is_exhausted(0));
        assert!(!policy.is_exhausted(1));
        assert!(policy.is_exhausted(2));
        assert!(policy.delay(2).is_none());
    }

    #[test]
    fn zero_attempts_never_retries() {
        let policy = ReconnectPolicy::new(ReconnectConfig {
            base_delay: Duration::from_secs(1),
            max_attempts: 0,
        });
        assert!(policy.delay(0).is_none());
    }

    #[test]
    fn large_attempt_saturates() {
        let policy = ReconnectPolicy::new(ReconnectConfig {
            base_delay: Duration::from_secs(1),
            max_attempts: u32::MAX,
        });
        assert!(policy.delay(40).is_some());
    }
}
