//! Retry backoff schedule.

use std::time::Duration;

/// Hard cap on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Exponential backoff: `base_delay * 2^(retry_count - 1)`, capped at five
/// minutes. `retry_count` is the attempt number *after* incrementing, so the
/// first retry waits exactly `base_delay`.
pub fn backoff_delay(retry_count: i32, base_delay: Duration) -> Duration {
    let exponent = (retry_count - 1).max(0).min(31) as u32;
    let multiplier = 2u64.saturating_pow(exponent);
    let delay = base_delay.saturating_mul(multiplier as u32);
    delay.min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_retry() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(1, base), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, base), Duration::from_secs(2));
        assert_eq!(backoff_delay(3, base), Duration::from_secs(4));
        assert_eq!(backoff_delay(5, base), Duration::from_secs(16));
    }

    #[test]
    fn caps_at_five_minutes() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(10, base), Duration::from_secs(300));
        assert_eq!(backoff_delay(30, base), Duration::from_secs(300));
    }

    #[test]
    fn zero_retry_count_uses_base() {
        assert_eq!(
            backoff_delay(0, Duration::from_millis(500)),
            Duration::from_millis(500)
        );
    }
}
