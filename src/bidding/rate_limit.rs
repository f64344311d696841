/// Per (bidder, listing) bid cooldown. Injected as a capability so a
/// multi-instance deployment can swap the in-process map for shared state.
// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
// endregion: --- Imports

// region:    --- RateLimiter

pub trait RateLimiter: Send + Sync {
    /// Err carries the remaining cooldown in milliseconds (a retry hint,
    /// not a hard failure).
    fn check(&self, bidder_id: i64, listing_id: i64, now: DateTime<Utc>) -> Result<(), i64>;
    /// Called only after a bid is accepted.
    fn record(&self, bidder_id: i64, listing_id: i64, now: DateTime<Utc>);
}

pub struct InProcessRateLimiter {
    cooldown: Duration,
    last_accepted: Mutex<HashMap<(i64, i64), DateTime<Utc>>>,
}

impl InProcessRateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for InProcessRateLimiter {
    fn check(&self, bidder_id: i64, listing_id: i64, now: DateTime<Utc>) -> Result<(), i64> {
        let last = self.last_accepted.lock().unwrap();
        match last.get(&(bidder_id, listing_id)) {
            Some(at) if now - *at < self.cooldown => {
                let remaining = self.cooldown - (now - *at);
                Err(remaining.num_milliseconds().max(1))
            }
            _ => Ok(()),
        }
    }

    fn record(&self, bidder_id: i64, listing_id: i64, now: DateTime<Utc>) {
        let mut last = self.last_accepted.lock().unwrap();
        // Keep the map from growing with dead entries.
        if last.len() >= 10_000 {
            let cooldown = self.cooldown;
            last.retain(|_, at| now - *at < cooldown);
        }
        last.insert((bidder_id, listing_id), now);
    }
}

/// Accepts everything; for tests that are not about rate limiting.
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _bidder_id: i64, _listing_id: i64, _now: DateTime<Utc>) -> Result<(), i64> {
        Ok(())
    }

    fn record(&self, _bidder_id: i64, _listing_id: i64, _now: DateTime<Utc>) {}
}

// endregion: --- RateLimiter

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_applies_per_bidder_and_listing() {
        let limiter = InProcessRateLimiter::new(Duration::seconds(2));
        let t0 = Utc::now();

        assert!(limiter.check(1, 7, t0).is_ok());
        limiter.record(1, 7, t0);

        // Same pair inside the window: rejected with a retry hint.
        let retry = limiter.check(1, 7, t0 + Duration::milliseconds(500)).unwrap_err();
        assert!(retry > 0 && retry <= 2_000);

        // Different bidder or listing: unaffected.
        assert!(limiter.check(2, 7, t0 + Duration::milliseconds(500)).is_ok());
        assert!(limiter.check(1, 8, t0 + Duration::milliseconds(500)).is_ok());

        // Window elapsed: accepted again.
        assert!(limiter.check(1, 7, t0 + Duration::seconds(2)).is_ok());
    }

    #[test]
    fn check_without_record_does_not_consume() {
        let limiter = InProcessRateLimiter::new(Duration::seconds(2));
        let t0 = Utc::now();
        assert!(limiter.check(1, 7, t0).is_ok());
        assert!(limiter.check(1, 7, t0).is_ok());
    }
}
// endregion: --- Tests
