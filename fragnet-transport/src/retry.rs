//! Retry policy for the blocking receive loop.

use std::time::Duration;

/// Schedule for retrying failed transport reads.
///
/// The default reproduces the layer's historical behavior: retry until
/// shutdown with a flat two-second delay. Bounded attempts and a
/// growing delay are opt-in; tests inject [`RetryPolicy::no_delay`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Give up after this many failed attempts; `None` retries until
    /// shutdown.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling applied to the growing delay.
    pub max_delay: Duration,
    /// Factor applied to the delay per failed attempt. 1.0 keeps it
    /// flat.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(2),
            multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Unbounded zero-delay policy, for tests.
    pub fn no_delay() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Whether another attempt is allowed after `attempts` failures.
    pub fn allows(&self, attempts: u32) -> bool {
        match self.max_attempts {
            None => true,
            Some(max) => attempts < max,
        }
    }

    /// Delay to sleep before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_flat_two_seconds_forever() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(1_000_000));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(50), Duration::from_secs(2));
    }

    #[test]
    fn test_bounded_attempts() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }

    #[test]
    fn test_backoff_growth_is_capped() {
        let policy = RetryPolicy::default()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(400))
            .with_multiplier(2.0);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(10), Duration::from_millis(400));
    }

    #[test]
    fn test_no_delay() {
        let policy = RetryPolicy::no_delay();
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert!(policy.allows(u32::MAX - 1));
    }
}
