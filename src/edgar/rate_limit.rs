// src/edgar/rate_limit.rs
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::middleware::NoOpMiddleware;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

pub type EdgarRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Up to `max_requests` at once, then one more every `window / max_requests`.
pub fn quota(max_requests: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(window / burst.get())
        .map(|quota| quota.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_second(burst))
}

pub fn limiter(max_requests: u32, window: Duration) -> EdgarRateLimiter {
    tracing::debug!("Rate limiting EDGAR to {} requests per {:?}", max_requests, window);
    limiter_with_clock(max_requests, window, &DefaultClock::default())
}

/// Same quota on an explicit clock.
pub fn limiter_with_clock<C: Clock>(
    max_requests: u32,
    window: Duration,
    clock: &C,
) -> RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<C::Instant>> {
    RateLimiter::direct_with_clock(quota(max_requests, window), clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    #[test]
    fn test_burst_within_quota() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter_with_clock(3, Duration::from_secs(1), &clock);

        for _ in 0..3 {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_back_to_back_requests_never_exceed_quota() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter_with_clock(2, Duration::from_secs(1), &clock);

        let admitted: Vec<bool> = (0..4).map(|_| limiter.check().is_ok()).collect();
        assert_eq!(admitted, vec![true, true, false, false]);
    }

    #[test]
    fn test_denied_request_reports_bounded_wait() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter_with_clock(2, Duration::from_secs(1), &clock);
        limiter.check().unwrap();
        limiter.check().unwrap();

        let denied = limiter.check().unwrap_err();
        let wait = denied.wait_time_from(clock.now());
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_millis(500));
    }

    #[test]
    fn test_capacity_returns_after_window() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter_with_clock(2, Duration::from_secs(1), &clock);
        limiter.check().unwrap();
        limiter.check().unwrap();
        assert!(limiter.check().is_err());

        clock.advance(Duration::from_millis(500));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());

        clock.advance(Duration::from_secs(1));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_requests_falls_back_to_one() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter_with_clock(0, Duration::from_secs(1), &clock);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
