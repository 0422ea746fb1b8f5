//! Replay protection
//!
//! A nonce is single-use: reuse is rejected no matter how fresh the
//! accompanying timestamp is. Staleness is a separate, non-consuming check;
//! a stale request leaves the nonce unused.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::DetectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceDecision {
    Accepted,
    Replayed,
}

pub struct NonceRegistry {
    used: HashSet<String>,
    freshness: Duration,
}

impl NonceRegistry {
    pub fn new(freshness_secs: i64) -> Self {
        Self {
            used: HashSet::new(),
            freshness: Duration::seconds(freshness_secs),
        }
    }

    /// Validate one message. Replay wins over staleness so a duplicate is
    /// always reported as such.
    pub fn validate(
        &mut self,
        nonce: &str,
        sent_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<NonceDecision, DetectError> {
        if self.used.contains(nonce) {
            return Ok(NonceDecision::Replayed);
        }

        let age = (now - sent_at).num_seconds().abs();
        if age > self.freshness.num_seconds() {
            return Err(DetectError::StaleTimestamp {
                age_secs: age,
                budget_secs: self.freshness.num_seconds(),
            });
        }

        self.used.insert(nonce.to_string());
        Ok(NonceDecision::Accepted)
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_nonce_accepted_exactly_once() {
        let mut reg = NonceRegistry::new(30);
        assert_eq!(reg.validate("n-1", now(), now()), Ok(NonceDecision::Accepted));
        assert_eq!(reg.validate("n-1", now(), now()), Ok(NonceDecision::Replayed));
    }

    #[test]
    fn reuse_rejected_regardless_of_freshness() {
        let mut reg = NonceRegistry::new(30);
        reg.validate("n-1", now(), now()).unwrap();

        // Even with a badly stale timestamp, reuse reports a replay.
        let stale = now() - Duration::seconds(500);
        assert_eq!(reg.validate("n-1", stale, now()), Ok(NonceDecision::Replayed));
    }

    #[test]
    fn stale_timestamp_does_not_consume_the_nonce() {
        let mut reg = NonceRegistry::new(30);

        let stale = now() - Duration::seconds(31);
        assert!(matches!(
            reg.validate("n-2", stale, now()),
            Err(DetectError::StaleTimestamp { age_secs: 31, budget_secs: 30 })
        ));
        assert!(reg.is_empty());

        // Retried with a fresh timestamp, the same nonce is still usable.
        assert_eq!(reg.validate("n-2", now(), now()), Ok(NonceDecision::Accepted));
    }

    #[test]
    fn future_timestamps_count_as_stale_too() {
        let mut reg = NonceRegistry::new(30);
        let future = now() + Duration::seconds(45);
        assert!(reg.validate("n-3", future, now()).is_err());
    }
}
