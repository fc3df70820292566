use std::time::Duration;

use rand::Rng;

use super::config::ReconnectionConfig;

/// Exponential reconnect delay with optional upward jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: bool,
}

impl Backoff {
    #[must_use]
    pub const fn new(base: Duration, max: Duration, jitter: bool) -> Self {
        Self { base, max, jitter }
    }

    #[must_use]
    pub fn from_config(config: &ReconnectionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.jitter,
        )
    }

    /// `min(base × 2^(attempt−1), max)` for a 1-based attempt.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Delay before `attempt`, never shorter than [`base_delay`](Self::base_delay).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter {
            return base;
        }
        let range_ms = u64::try_from(base.as_millis() / 5).unwrap_or(u64::MAX);
        if range_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=range_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt_until_cap() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(1000), false);
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_millis(1000));
        assert_eq!(backoff.delay(40), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_only_adds_delay() {
        let backoff = Backoff::new(Duration::from_millis(1000), Duration::from_secs(60), true);
        for attempt in 1..=6 {
            let base = backoff.base_delay(attempt);
            let delay = backoff.delay(attempt);
            assert!(delay >= base);
            assert!(delay <= base + base / 5);
        }
    }
}
