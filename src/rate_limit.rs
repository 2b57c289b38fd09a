use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// Burst submissions from one address against one form within the window.
pub const SUBMISSION_LIMIT: u32 = 30;
pub const SUBMISSION_WINDOW_SECS: u64 = 60;

/// Per-IP-per-form submission rate limiter using a sliding window.
pub struct SubmissionRateLimiter {
    /// (form_id, ip) -> (count, window_start)
    entries: DashMap<(Uuid, IpAddr), (u32, Instant)>,
}

impl SubmissionRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if a submission is allowed. Returns Ok(()) or Err with
    /// retry-after seconds.
    pub fn check(&self, form_id: Uuid, ip: IpAddr) -> Result<(), u64> {
        let key = (form_id, ip);
        let window = Duration::from_secs(SUBMISSION_WINDOW_SECS);
        let now = Instant::now();

        let mut entry = self.entries.entry(key).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= SUBMISSION_LIMIT {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(SUBMISSION_WINDOW_SECS.saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Remove stale entries older than the given duration.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}

impl Default for SubmissionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = SubmissionRateLimiter::new();
        let form = Uuid::new_v4();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        for _ in 0..SUBMISSION_LIMIT {
            assert!(limiter.check(form, ip).is_ok());
        }
        assert!(limiter.check(form, ip).is_err());
    }

    #[test]
    fn forms_and_addresses_are_tracked_independently() {
        let limiter = SubmissionRateLimiter::new();
        let form = Uuid::new_v4();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        for _ in 0..SUBMISSION_LIMIT {
            assert!(limiter.check(form, a).is_ok());
        }
        assert!(limiter.check(form, a).is_err());
        assert!(limiter.check(form, b).is_ok());
        assert!(limiter.check(Uuid::new_v4(), a).is_ok());
    }

    #[test]
    fn cleanup_drops_stale_entries() {
        let limiter = SubmissionRateLimiter::new();
        let form = Uuid::new_v4();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        limiter.check(form, ip).unwrap();

        limiter.cleanup(Duration::from_secs(0));
        assert!(limiter.entries.is_empty());
    }
}
