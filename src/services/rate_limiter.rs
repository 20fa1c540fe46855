//! Sliding-window rate limiter keyed by client IP
//!
//! Two instances run in the server:
//! - the API limiter covering every `/api` route (100 requests per 15 minutes)
//! - the form limiter for submissions and login (5 requests per 15 minutes)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Window maximum
    pub limit: usize,
    /// Requests left in the current window
    pub remaining: usize,
    /// Seconds until the oldest counted request leaves the window
    pub reset_secs: i64,
}

/// Per-IP sliding-window rate limiter
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    requests: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window_secs`
    pub fn new(window_secs: i64, max_requests: usize) -> Self {
        Self {
            window: Duration::seconds(window_secs),
            max_requests,
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Count a request from `ip` and decide whether it is allowed.
    ///
    /// Rejected requests are not recorded, so a blocked client regains access
    /// as soon as its oldest counted request expires.
    pub async fn check(&self, ip: IpAddr) -> RateLimitDecision {
        self.check_at(ip, Utc::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: DateTime<Utc>) -> RateLimitDecision {
        let mut requests = self.requests.write().await;
        let cutoff = now - self.window;

        let timestamps = requests.entry(ip).or_default();
        timestamps.retain(|time| *time > cutoff);

        let allowed = timestamps.len() < self.max_requests;
        if allowed {
            timestamps.push(now);
        }

        let reset_secs = timestamps
            .first()
            .map(|oldest| (*oldest + self.window - now).num_seconds().max(0))
            .unwrap_or(0);

        RateLimitDecision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(timestamps.len()),
            reset_secs,
        }
    }

    /// Drop expired timestamps and forget idle clients
    pub async fn cleanup(&self) -> usize {
        let cutoff = Utc::now() - self.window;
        let mut requests = self.requests.write().await;
        let before = requests.len();
        requests.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
        before - requests.len()
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ip(s: &str) -> IpAddr {
        IpAddr::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_blocks_after_max_requests() {
        let limiter = RateLimiter::new(900, 5);
        let client = ip("192.168.1.10");

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check(client).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let blocked = limiter.check(client).await;
        assert!(!blocked.allowed);
        assert_eq!(blocked.limit, 5);
        assert_eq!(blocked.remaining, 0);
        assert!(blocked.reset_secs > 0 && blocked.reset_secs <= 900);

        // Other clients are unaffected
        assert!(limiter.check(ip("192.168.1.11")).await.allowed);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(60, 2);
        let client = ip("10.0.0.1");
        let start = Utc::now();

        assert!(limiter.check_at(client, start).await.allowed);
        assert!(limiter.check_at(client, start + Duration::seconds(30)).await.allowed);
        assert!(!limiter.check_at(client, start + Duration::seconds(45)).await.allowed);

        // First request expired, one slot free again
        let later = limiter.check_at(client, start + Duration::seconds(61)).await;
        assert!(later.allowed);
        assert_eq!(later.remaining, 0);
    }

    #[tokio::test]
    async fn test_cleanup_forgets_idle_clients() {
        let limiter = RateLimiter::new(60, 10);
        let old = Utc::now() - Duration::seconds(120);
        limiter.check_at(ip("::1"), old).await;
        limiter.check(ip("127.0.0.1")).await;

        assert_eq!(limiter.tracked_clients().await, 2);
        assert_eq!(limiter.cleanup().await, 1);
        assert_eq!(limiter.tracked_clients().await, 1);
    }
}
