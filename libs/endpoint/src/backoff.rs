use std::time::Duration;

use rand::Rng;

const JITTER: f64 = 0.05;

/// Reconnect backoff schedule — spec.md §4.6: `next = min(max, current +
/// current/2 + 1)` starting from `current0 = 0`, each wait jittered
/// uniformly within ±5%. The first wait is always zero; a successful
/// connect calls `reset`.
pub struct Backoff {
    current: f64,
    maximum: f64,
}

impl Backoff {
    pub fn new(maximum: Duration) -> Self {
        Self { current: 0.0, maximum: maximum.as_secs_f64() }
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
    }

    /// Returns the wait for the *next* attempt and advances the schedule.
    pub fn next_wait(&mut self) -> Duration {
        let scheduled = self.current;
        self.current = (self.current + self.current / 2.0 + 1.0).min(self.maximum);
        if scheduled <= 0.0 {
            return Duration::ZERO;
        }
        let lo = scheduled * (1.0 - JITTER);
        let hi = scheduled * (1.0 + JITTER);
        let jittered = rand::thread_rng().gen_range(lo..=hi);
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_spec_sequence_within_max() {
        let mut backoff = Backoff::new(Duration::from_secs(10));
        let expected = [0.0, 1.0, 2.5, 4.75, 8.125, 10.0];
        for want in expected {
            let wait = backoff.next_wait().as_secs_f64();
            if want == 0.0 {
                assert_eq!(wait, 0.0);
            } else {
                assert!((wait - want).abs() <= want * 0.05 + 1e-9, "wait={wait} want={want}");
            }
        }
    }

    #[test]
    fn reset_returns_to_zero_wait() {
        let mut backoff = Backoff::new(Duration::from_secs(10));
        backoff.next_wait();
        backoff.next_wait();
        backoff.reset();
        assert_eq!(backoff.next_wait(), Duration::ZERO);
    }
}
