//! Automatic reconnect policy.
//!
//! Off unless the builder is given a [`ReconnectBackoff`]. The worker keeps
//! one [`ReconnectAttempts`] per outage and resets it on a successful open.

use std::time::Duration;

/// Jittered exponential back-off between reconnect attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectBackoff {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound on the un-jittered delay.
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the delay added as jitter, in `[0, 1]`.
    pub jitter: f64,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: Some(10),
        }
    }
}

impl ReconnectBackoff {
    /// Delay before attempt `attempt` (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let base = (self.initial_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        let spread = base * self.jitter.clamp(0.0, 1.0) * spread_fraction(attempt);
        Duration::from_secs_f64(base + spread)
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Stable fraction in `[0, 1)` per attempt, so that a fleet of clients
/// restarted together spreads out without a random source.
fn spread_fraction(attempt: u32) -> f64 {
    let mixed = (attempt as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 11;
    mixed as f64 / (1u64 << 53) as f64
}

/// Attempt counter for one outage.
#[derive(Debug, Clone)]
pub struct ReconnectAttempts {
    policy: ReconnectBackoff,
    attempts: u32,
}

impl ReconnectAttempts {
    pub fn new(policy: ReconnectBackoff) -> Self {
        Self { policy, attempts: 0 }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next attempt, or `None` once the policy gives up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.policy.is_exhausted(self.attempts) {
            return None;
        }
        let delay = self.policy.delay(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
