//! Token bucket used by the server to gate request admission.
//! Generalizes `limiter.go`'s `rate.NewLimiter(rate.Limit(limit),
//! cap).WaitN(ctx, 1)` into a self-contained `Mutex`-guarded bucket.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

struct State {
    tokens: f64,
    last_refill: Instant,
}

/// A single shared token bucket: `rate` tokens refill per second, up to
/// `capacity` tokens of burst. The server holds exactly one instance and
/// every accepted connection acquires from it.
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(rate: f64, capacity: f64) -> RateLimiter {
        RateLimiter {
            rate,
            capacity,
            state: Mutex::new(State {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Attempts to acquire one token, waiting up to `wait_timeout`. Each
    /// failed attempt sleeps until either the next token would be
    /// available or the deadline, whichever comes first, then retries.
    pub fn acquire(&self, wait_timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + wait_timeout;

        loop {
            let shortfall = {
                let mut state = self.state.lock().unwrap();
                self.refill_locked(&mut state);

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }

                1.0 - state.tokens
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::RateLimited);
            }

            let wait_for = Duration::from_secs_f64(shortfall / self.rate);
            let remaining = deadline - now;
            std::thread::sleep(wait_for.min(remaining));

            if Instant::now() >= deadline {
                // One last chance to claim a token that became available
                // exactly at the deadline before giving up.
                let mut state = self.state.lock().unwrap();
                self.refill_locked(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                return Err(Error::RateLimited);
            }
        }
    }

    fn refill_locked(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_within_capacity_without_waiting() {
        let limiter = RateLimiter::new(1.0, 1.0);
        let start = Instant::now();
        limiter.acquire(Duration::from_millis(500)).unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn second_request_within_the_same_tick_is_rate_limited() {
        let limiter = RateLimiter::new(1.0, 1.0);
        limiter.acquire(Duration::from_millis(1)).unwrap();
        let err = limiter.acquire(Duration::from_millis(100)).unwrap_err();
        assert_eq!(err, Error::RateLimited);
    }

    #[test]
    fn refills_over_time_and_admits_again() {
        let limiter = RateLimiter::new(10.0, 1.0);
        limiter.acquire(Duration::from_millis(1)).unwrap();
        // waiting long enough for a token to regenerate should admit
        // before the (generous) timeout expires.
        limiter.acquire(Duration::from_millis(500)).unwrap();
    }
}
