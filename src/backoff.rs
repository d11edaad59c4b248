//! Shared exponential backoff formula used by both the push notification
//! sender and the client's retry middleware, so retry behavior is consistent
//! wherever it happens.
//!
//! `delay(n) = min(max_delay, initial_delay * multiplier^(n-1)) + jitter`
//! where `jitter = delay * jitter_factor * rand()`, `n` is 1-indexed.

use std::time::Duration;

/// Backoff configuration shared by retrying components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
            jitter_factor: 0.1,
        }
    }
}

/// Computes the delay before retry attempt `attempt` (1-indexed: the delay
/// before the *second* try is `next_delay(1, cfg)`).
///
/// `rand_fraction` must be a caller-supplied value in `[0, 1)` — kept as a
/// parameter rather than drawn internally so this function stays pure and
/// testable; callers outside tests should pass `rand::random::<f64>()`.
pub fn next_delay(attempt: u32, cfg: &BackoffConfig, rand_fraction: f64) -> Duration {
    let attempt = attempt.max(1);
    let exp = cfg.multiplier.powi(attempt as i32 - 1);
    let base_secs = cfg.initial_delay.as_secs_f64() * exp;
    let capped_secs = base_secs.min(cfg.max_delay.as_secs_f64());
    let jitter_secs = capped_secs * cfg.jitter_factor * rand_fraction;
    Duration::from_secs_f64(capped_secs + jitter_secs)
}

/// Returns `true` if another attempt should be made after `attempts_made`
/// failed attempts.
pub fn should_retry(attempts_made: u32, cfg: &BackoffConfig) -> bool {
    attempts_made < cfg.max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_retry_uses_initial_delay() {
        let cfg = BackoffConfig::default();
        let delay = next_delay(1, &cfg, 0.0);
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn delay_grows_exponentially() {
        let cfg = BackoffConfig::default();
        assert_eq!(next_delay(1, &cfg, 0.0), Duration::from_secs(1));
        assert_eq!(next_delay(2, &cfg, 0.0), Duration::from_secs(2));
        assert_eq!(next_delay(3, &cfg, 0.0), Duration::from_secs(4));
        assert_eq!(next_delay(4, &cfg, 0.0), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let cfg = BackoffConfig::default();
        let delay = next_delay(20, &cfg, 0.0);
        assert_eq!(delay, cfg.max_delay);
    }

    #[test]
    fn jitter_adds_up_to_jitter_factor_of_delay() {
        let cfg = BackoffConfig::default();
        let no_jitter = next_delay(2, &cfg, 0.0);
        let full_jitter = next_delay(2, &cfg, 1.0);
        assert!(full_jitter > no_jitter);
        let expected_max = Duration::from_secs_f64(2.0 * 1.1);
        assert!(full_jitter <= expected_max);
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let cfg = BackoffConfig::default();
        assert!(should_retry(0, &cfg));
        assert!(should_retry(4, &cfg));
        assert!(!should_retry(5, &cfg));
    }
}
