use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window limiter keyed by client IP
///
/// Guards the ticker search endpoint, which proxies straight to Yahoo
/// Finance and would otherwise let one client burn the shared quota.
pub struct SearchRateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl SearchRateLimiter {
    pub const DEFAULT_MAX_REQUESTS: usize = 30;
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Records a request and returns whether it is allowed. Rejected
    /// requests do not count against the window.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut hits = self.hits.lock();

        // Drop idle clients so the map doesn't grow without bound
        hits.retain(|_, times| {
            times
                .back()
                .map(|last| now.saturating_duration_since(*last) < self.window)
                .unwrap_or(false)
        });

        let times = hits.entry(ip).or_default();
        while let Some(first) = times.front() {
            if now.saturating_duration_since(*first) >= self.window {
                times.pop_front();
            } else {
                break;
            }
        }

        if times.len() >= self.max_requests {
            return false;
        }

        times.push_back(now);
        true
    }
}

impl Default for SearchRateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_REQUESTS, Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const A: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const B: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn test_limit_enforced_within_window() {
        let limiter = SearchRateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at(A, now));
        assert!(limiter.check_at(A, now));
        assert!(limiter.check_at(A, now));
        assert!(!limiter.check_at(A, now + Duration::from_secs(1)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = SearchRateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at(A, now));
        assert!(!limiter.check_at(A, now));
        assert!(limiter.check_at(B, now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = SearchRateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at(A, start));
        assert!(limiter.check_at(A, start + Duration::from_secs(30)));
        assert!(!limiter.check_at(A, start + Duration::from_secs(59)));
        // First hit has aged out, second is still inside the window
        assert!(limiter.check_at(A, start + Duration::from_secs(60)));
        assert!(!limiter.check_at(A, start + Duration::from_secs(61)));
    }

    #[test]
    fn test_default_is_thirty_per_minute() {
        let limiter = SearchRateLimiter::default();
        let now = Instant::now();
        for _ in 0..30 {
            assert!(limiter.check_at(A, now));
        }
        assert!(!limiter.check_at(A, now));
    }
}
