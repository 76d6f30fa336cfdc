//! Retry policy for pipeline calls: exponential backoff capped at a maximum,
//! plus up to 25% random jitter, and retry eligibility per failure kind.

use crate::error::{Error, FailureKind, Result};
use rand::Rng;
use std::time::Duration;

/// Upper bound of the jitter added on top of the capped delay, as a fraction of it.
pub const JITTER_FRACTION: f64 = 0.25;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Immutable backoff parameters shared by every request of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Build a policy. Requires `max_delay >= initial_delay` and a multiplier above 1.0.
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self> {
        if max_delay < initial_delay {
            return Err(Error::Configuration(format!(
                "retry max delay ({:?}) is below the initial delay ({:?})",
                max_delay, initial_delay
            )));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier <= 1.0 {
            return Err(Error::Configuration(format!(
                "retry backoff multiplier must be > 1.0, got {}",
                backoff_multiplier
            )));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        })
    }

    /// Policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// `min(initial * multiplier^attempt, max)` without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let initial_ms = self.initial_delay.as_secs_f64() * 1_000.0;
        let max_ms = self.max_delay.as_secs_f64() * 1_000.0;
        let exponential = initial_ms * self.backoff_multiplier.powi(exponent);
        let capped = if exponential.is_finite() {
            exponential.min(max_ms)
        } else {
            max_ms
        };
        Duration::from_millis(capped as u64)
    }

    /// Capped delay plus a uniform jitter in `[0, 25%]` of it.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let fraction = rand::rng().random_range(0.0..=JITTER_FRACTION);
        self.delay_with_jitter(attempt, fraction)
    }

    /// Deterministic form of [`delay_for_attempt`](Self::delay_for_attempt) for a given jitter draw.
    pub fn delay_with_jitter(&self, attempt: u32, fraction: f64) -> Duration {
        let base = self.base_delay(attempt);
        let fraction = fraction.clamp(0.0, JITTER_FRACTION);
        let jitter_ms = (base.as_millis() as f64 * fraction) as u64;
        base + Duration::from_millis(jitter_ms)
    }

    /// Whether the attempt numbered `attempt` (0-indexed) that just failed with
    /// `kind` should be followed by another one. `max_attempts` bounds the
    /// total number of exchanges, so the last allowed attempt is `max_attempts - 1`.
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> bool {
        if attempt.saturating_add(1) >= self.max_attempts {
            tracing::debug!(max_attempts = self.max_attempts, "max retry attempts reached");
            return false;
        }
        kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(1_000),
            Duration::from_millis(10_000),
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn rejects_inverted_delays() {
        let err = RetryPolicy::new(3, Duration::from_secs(5), Duration::from_secs(1), 2.0);
        assert!(matches!(err, Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_non_growing_multiplier() {
        assert!(RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(2), 1.0).is_err());
        assert!(RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(2), f64::NAN).is_err());
    }

    #[test]
    fn base_delay_grows_then_caps() {
        let p = policy();
        assert_eq!(p.base_delay(0), Duration::from_millis(1_000));
        assert_eq!(p.base_delay(1), Duration::from_millis(2_000));
        assert_eq!(p.base_delay(2), Duration::from_millis(4_000));
        assert_eq!(p.base_delay(3), Duration::from_millis(8_000));
        assert_eq!(p.base_delay(4), Duration::from_millis(10_000));
        assert_eq!(p.base_delay(200), Duration::from_millis(10_000));
    }

    #[test]
    fn jitter_bounds_for_first_attempts() {
        let p = policy();
        for _ in 0..200 {
            let d0 = p.delay_for_attempt(0).as_millis();
            let d1 = p.delay_for_attempt(1).as_millis();
            assert!((1_000..=1_250).contains(&d0), "delay(0) = {}", d0);
            assert!((2_000..=2_500).contains(&d1), "delay(1) = {}", d1);
        }
    }

    #[test]
    fn never_retries_past_max_attempts() {
        let p = policy();
        assert!(p.should_retry(FailureKind::Transport, 0));
        assert!(p.should_retry(FailureKind::ServerError(500), 1));
        assert!(!p.should_retry(FailureKind::ServerError(500), 2));
        assert!(!p.should_retry(FailureKind::ServerError(500), 3));
        assert!(!p.should_retry(FailureKind::Unauthorized, 0));
        assert!(!RetryPolicy::disabled().should_retry(FailureKind::Transport, 0));
    }

    fn any_kind() -> impl Strategy<Value = FailureKind> {
        prop_oneof![
            Just(FailureKind::Transport),
            Just(FailureKind::Unauthorized),
            Just(FailureKind::Forbidden),
            Just(FailureKind::NotFound),
            Just(FailureKind::RateLimited),
            (500u16..600).prop_map(FailureKind::ServerError),
            (400u16..500).prop_map(FailureKind::ClientError),
        ]
    }

    proptest! {
        #[test]
        fn base_delay_is_monotonic(
            initial in 1u64..5_000,
            extra in 0u64..60_000,
            multiplier in 1.01f64..4.0,
            attempt in 0u32..64,
        ) {
            let p = RetryPolicy::new(
                3,
                Duration::from_millis(initial),
                Duration::from_millis(initial + extra),
                multiplier,
            ).unwrap();
            prop_assert!(p.base_delay(attempt + 1) >= p.base_delay(attempt));
        }

        #[test]
        fn jittered_delay_never_exceeds_cap(
            initial in 1u64..5_000,
            extra in 0u64..60_000,
            multiplier in 1.01f64..4.0,
            attempt in 0u32..1_000,
        ) {
            let max = Duration::from_millis(initial + extra);
            let p = RetryPolicy::new(3, Duration::from_millis(initial), max, multiplier).unwrap();
            let delay = p.delay_for_attempt(attempt);
            prop_assert!(delay.as_secs_f64() <= max.as_secs_f64() * 1.25 + 0.001);
        }

        #[test]
        fn retry_terminates_for_every_kind(
            kind in any_kind(),
            max_attempts in 0u32..10,
            overshoot in 0u32..100,
        ) {
            let p = RetryPolicy::new(
                max_attempts,
                Duration::from_millis(10),
                Duration::from_millis(100),
                2.0,
            ).unwrap();
            prop_assert!(!p.should_retry(kind, max_attempts + overshoot));
        }
    }
}
