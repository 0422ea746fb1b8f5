//! Trailing-window rate rule with cooldown
//!
//! Tracks per-key event timestamps inside a trailing window. A key that
//! reaches the threshold is placed in cooldown; while the cooldown lasts,
//! events are rejected without being recorded. Every method takes an explicit
//! `now` so the behavior is testable with a synthetic clock.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Tuning for one window profile (flood, API abuse, ...).
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    pub window: Duration,
    pub cooldown: Duration,
    pub threshold: u32,
}

/// Outcome of observing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    Allowed {
        count: u32,
        threshold: u32,
    },
    ThresholdExceeded {
        count: u32,
        threshold: u32,
        retry_at: DateTime<Utc>,
    },
    CooldownActive {
        until: DateTime<Utc>,
    },
}

impl WindowDecision {
    pub fn blocked(&self) -> bool {
        !matches!(self, Self::Allowed { .. })
    }
}

pub struct RateWindow {
    config: WindowConfig,
    events: HashMap<String, Vec<DateTime<Utc>>>,
    cooldowns: HashMap<String, DateTime<Utc>>,
}

impl RateWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            events: HashMap::new(),
            cooldowns: HashMap::new(),
        }
    }

    /// Observe one event for `key` using the profile's own threshold.
    pub fn observe(&mut self, key: &str, now: DateTime<Utc>) -> WindowDecision {
        self.observe_with(key, self.config.threshold, now)
    }

    /// Observe one event for `key` with a caller-supplied threshold.
    pub fn observe_with(&mut self, key: &str, threshold: u32, now: DateTime<Utc>) -> WindowDecision {
        if let Some(&until) = self.cooldowns.get(key) {
            if now < until {
                // Rejected events do not enter the window.
                return WindowDecision::CooldownActive { until };
            }
            // Cooldown over: the key starts a fresh window.
            self.cooldowns.remove(key);
            self.events.remove(key);
        }

        let horizon = now - self.config.window;
        let window = self.events.entry(key.to_string()).or_default();
        window.push(now);
        window.retain(|&t| t > horizon);

        let count = window.len() as u32;
        if count >= threshold {
            let retry_at = now + self.config.cooldown;
            self.cooldowns.insert(key.to_string(), retry_at);
            return WindowDecision::ThresholdExceeded {
                count,
                threshold,
                retry_at,
            };
        }

        WindowDecision::Allowed { count, threshold }
    }

    /// Drop all state held for `key`.
    pub fn reset(&mut self, key: &str) {
        self.events.remove(key);
        self.cooldowns.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg(window: i64, cooldown: i64, threshold: u32) -> WindowConfig {
        WindowConfig {
            window: Duration::seconds(window),
            cooldown: Duration::seconds(cooldown),
            threshold,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn counts_up_to_threshold_then_blocks() {
        let mut rw = RateWindow::new(cfg(10, 60, 3));
        let base = t0();

        assert_eq!(
            rw.observe("soil-1000", base),
            WindowDecision::Allowed { count: 1, threshold: 3 }
        );
        assert_eq!(
            rw.observe("soil-1000", base + Duration::seconds(1)),
            WindowDecision::Allowed { count: 2, threshold: 3 }
        );
        let third = rw.observe("soil-1000", base + Duration::seconds(2));
        assert!(matches!(
            third,
            WindowDecision::ThresholdExceeded { count: 3, threshold: 3, .. }
        ));
    }

    #[test]
    fn cooldown_rejects_regardless_of_window_count() {
        let mut rw = RateWindow::new(cfg(10, 60, 2));
        let base = t0();

        rw.observe("k", base);
        assert!(rw.observe("k", base + Duration::seconds(1)).blocked());

        // Far past the window but inside the cooldown: still rejected.
        let decision = rw.observe("k", base + Duration::seconds(45));
        assert!(matches!(decision, WindowDecision::CooldownActive { .. }));
    }

    #[test]
    fn window_restarts_from_zero_after_cooldown() {
        let mut rw = RateWindow::new(cfg(10, 60, 2));
        let base = t0();

        rw.observe("k", base);
        rw.observe("k", base + Duration::seconds(1));

        let after = base + Duration::seconds(62);
        assert_eq!(
            rw.observe("k", after),
            WindowDecision::Allowed { count: 1, threshold: 2 }
        );
    }

    #[test]
    fn expired_events_never_contribute() {
        let mut rw = RateWindow::new(cfg(10, 60, 3));
        let base = t0();

        rw.observe("k", base);
        rw.observe("k", base + Duration::seconds(1));

        // Both earlier events have aged out; this is a count of one again.
        assert_eq!(
            rw.observe("k", base + Duration::seconds(20)),
            WindowDecision::Allowed { count: 1, threshold: 3 }
        );
    }

    #[test]
    fn caller_threshold_overrides_profile() {
        let mut rw = RateWindow::new(cfg(10, 60, 100));
        let base = t0();

        rw.observe_with("k", 2, base);
        assert!(rw.observe_with("k", 2, base + Duration::seconds(1)).blocked());
    }

    #[test]
    fn keys_are_independent() {
        let mut rw = RateWindow::new(cfg(10, 60, 2));
        let base = t0();

        rw.observe("a", base);
        assert!(rw.observe("a", base + Duration::seconds(1)).blocked());
        assert_eq!(
            rw.observe("b", base + Duration::seconds(1)),
            WindowDecision::Allowed { count: 1, threshold: 2 }
        );
    }

    #[test]
    fn reset_clears_cooldown() {
        let mut rw = RateWindow::new(cfg(10, 60, 2));
        let base = t0();

        rw.observe("k", base);
        rw.observe("k", base + Duration::seconds(1));
        rw.reset("k");

        assert_eq!(
            rw.observe("k", base + Duration::seconds(2)),
            WindowDecision::Allowed { count: 1, threshold: 2 }
        );
    }
}
