//! Timeout supervisor: a recurring sweep over the request registry.
//!
//! The sweep is armed only while requests are pending: it disarms itself
//! once the registry is empty and is re-armed by the next registration.
//! A request with deadline `T` fails within `[T, T + interval)`.

use std::time::{Duration, Instant};

use crate::registry::{PendingRequest, RequestRegistry};

/// Default sweep period.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug)]
pub struct TimeoutSupervisor {
    interval: Duration,
    next_sweep: Option<Instant>,
}

impl TimeoutSupervisor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_sweep: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedule a sweep unless one is already scheduled.
    pub fn arm(&mut self, now: Instant) {
        if self.next_sweep.is_none() {
            self.next_sweep = Some(now + self.interval);
        }
    }

    pub fn disarm(&mut self) {
        self.next_sweep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_sweep.is_some()
    }

    /// When the next sweep is due, if armed.
    pub fn next_sweep(&self) -> Option<Instant> {
        self.next_sweep
    }

    /// Take expired entries out of `registry` and reschedule (or disarm).
    pub fn sweep(&mut self, registry: &mut RequestRegistry, now: Instant) -> Vec<PendingRequest> {
        let expired = registry.take_expired(now);
        self.next_sweep = if registry.is_empty() {
            None
        } else {
            Some(now + self.interval)
        };
        expired
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RequestOptions;
    use al_protocol::RequestFrame;
    use serde_json::json;

    fn register(reg: &mut RequestRegistry, id: &str, timeout: Duration, now: Instant) {
        reg.register(
            &RequestFrame::new(id, ".GetClock", json!({})),
            RequestOptions::new().on_error(|_, _| {}).timeout(timeout),
            now,
        );
    }

    #[test]
    fn arming_is_lazy_and_not_rescheduled() {
        let mut sup = TimeoutSupervisor::new(Duration::from_secs(1));
        assert!(!sup.is_armed());

        let t0 = Instant::now();
        sup.arm(t0);
        sup.arm(t0 + Duration::from_millis(500));
        assert_eq!(sup.next_sweep(), Some(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn disarms_once_registry_empties() {
        let mut reg = RequestRegistry::default();
        let mut sup = TimeoutSupervisor::new(Duration::from_secs(1));
        let t0 = Instant::now();
        register(&mut reg, "a", Duration::from_secs(2), t0);
        sup.arm(t0);

        assert!(sup.sweep(&mut reg, t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(sup.next_sweep(), Some(t0 + Duration::from_secs(2)));

        let expired = sup.sweep(&mut reg, t0 + Duration::from_secs(2));
        assert_eq!(expired.len(), 1);
        assert!(!sup.is_armed());
    }

    #[test]
    fn timeout_fires_within_one_interval_of_deadline() {
        let interval = Duration::from_secs(1);
        let timeout = Duration::from_secs(10);
        let mut reg = RequestRegistry::default();
        let mut sup = TimeoutSupervisor::new(interval);

        let t0 = Instant::now();
        // The sweep is aligned to the first registration.
        register(&mut reg, "first", Duration::from_secs(60), t0);
        sup.arm(t0);
        let late = t0 + Duration::from_millis(300);
        register(&mut reg, "late", timeout, late);
        sup.arm(late);

        let mut fired_at = None;
        while let Some(at) = sup.next_sweep() {
            let expired = sup.sweep(&mut reg, at);
            if expired.iter().any(|p| p.id == "late") {
                fired_at = Some(at);
                break;
            }
        }

        let fired_at = fired_at.expect("late request must time out");
        let elapsed = fired_at - late;
        assert!(elapsed >= timeout, "fired too early: {elapsed:?}");
        assert!(elapsed < timeout + interval, "fired too late: {elapsed:?}");
    }
}
