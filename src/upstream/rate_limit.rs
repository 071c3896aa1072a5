//! REST request-rate limiting.
//!
//! No rate-limiting crate is attested anywhere in the example pack, so this
//! is a plain hand-rolled sliding-window gate: remember recent request
//! timestamps, wait for the oldest to age out once the window is full.
//! Mirrors the spirit of the upstream API's own documented per-endpoint
//! limits (e.g. "1 req/sec" in `dhan-rs`'s market-quote docs), generalized
//! to a single shared budget per the design.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// A sliding-window rate limiter: at most `max_requests` calls to
/// [`RateLimiter::acquire`] are allowed to return within any `window`.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Block until a request slot is available, then reserve it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().await;
                let now = Instant::now();
                while let Some(&oldest) = timestamps.front() {
                    if now.duration_since(oldest) >= self.window {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }

                if timestamps.len() < self.max_requests {
                    timestamps.push_back(now);
                    None
                } else {
                    let oldest = *timestamps.front().expect("len >= max_requests > 0");
                    Some(self.window - now.duration_since(oldest))
                }
            };

            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_burst_up_to_limit_without_waiting() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn fourth_call_waits_for_window_to_free_a_slot() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        limiter.acquire().await;
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
