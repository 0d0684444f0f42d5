use std::time::Duration;

use super::ReconnectPolicy;

/// Delay schedule between reconnect attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let current = policy.initial_backoff();
        Self {
            policy,
            attempt: 0,
            current,
        }
    }

    /// Delay before the next attempt, or `None` once the attempt cap is hit.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        self.attempt += 1;
        let delay = self.current.min(self.policy.max_backoff());
        self.current = Duration::from_millis(
            ((self.current.as_millis() as f64 * self.policy.multiplier)
                .min(self.policy.max_backoff().as_millis() as f64)) as u64,
        );
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current = self.policy.initial_backoff();
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_geometrically_up_to_the_cap() {
        let mut backoff = Backoff::new(ReconnectPolicy {
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            multiplier: 2.0,
            max_attempts: None,
        });
        let delays: Vec<u64> = (0..5)
            .map(|_| backoff.next_delay().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, [100, 200, 400, 500, 500]);
    }

    #[test]
    fn attempt_cap_and_reset() {
        let mut backoff = Backoff::new(ReconnectPolicy {
            max_attempts: Some(2),
            ..ReconnectPolicy::default()
        });
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
    }
}
