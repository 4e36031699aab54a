//! Minimum-interval rate limiter for NCBI requests.
//!
//! NCBI asks clients to stay under 3 requests per second, or 10 per second
//! when an API key is supplied.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Requests per second allowed without an API key.
pub const ANONYMOUS_RATE: f64 = 3.0;

/// Requests per second allowed with an API key.
pub const KEYED_RATE: f64 = 10.0;

/// Longest spacing a very small rate is clamped to.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Blocking rate limiter shared by every clone of a client.
///
/// Callers run on blocking worker threads, so waiting is a plain sleep.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

#[derive(Debug)]
struct RateLimiterInner {
    /// Minimum spacing between two requests.
    min_interval: Duration,
    /// Slot reserved by the most recent caller.
    next_slot: Option<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given maximum requests per second.
    pub fn new(max_per_second: f64) -> Self {
        let per_second = if max_per_second > 0.0 { max_per_second } else { ANONYMOUS_RATE };
        let min_interval = Duration::try_from_secs_f64(1.0 / per_second)
            .map_or(MAX_INTERVAL, |interval| interval.min(MAX_INTERVAL));
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                min_interval,
                next_slot: None,
            })),
        }
    }

    /// Block until a request is allowed.
    ///
    /// Each caller reserves the next free slot under the lock and sleeps
    /// outside it, so concurrent callers queue up instead of all waking at
    /// the same instant.
    pub fn acquire(&self) {
        let wait = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            let slot = match inner.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            inner.next_slot = Some(slot + inner.min_interval);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limiter waiting");
            std::thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(100.0); // 10ms interval
        let start = Instant::now();

        limiter.acquire();
        limiter.acquire();
        limiter.acquire();

        // 3 requests at 100/sec should take at least ~20ms
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_rate_limiter_first_request_immediate() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();
        limiter.acquire();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_rate_limiter_shared_between_clones() {
        let limiter = RateLimiter::new(50.0); // 20ms interval
        let other = limiter.clone();
        let start = Instant::now();

        let handle = std::thread::spawn(move || other.acquire());
        limiter.acquire();
        handle.join().unwrap();

        // Two slots were handed out, the second at least one interval later.
        limiter.acquire();
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_non_positive_rate_falls_back() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        limiter.acquire();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_tiny_rate_is_clamped() {
        let limiter = RateLimiter::new(1e-300);
        let inner = limiter.inner.lock().unwrap();
        assert_eq!(inner.min_interval, MAX_INTERVAL);
    }

    #[test]
    fn test_nan_rate_falls_back() {
        let limiter = RateLimiter::new(f64::NAN);
        let inner = limiter.inner.lock().unwrap();
        assert_eq!(inner.min_interval, Duration::from_secs_f64(1.0 / ANONYMOUS_RATE));
    }
}
