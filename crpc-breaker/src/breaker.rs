//! Three-state circuit breaker. Generalizes `breaker/breaker.go`'s
//! `CircuitBreaker`/`Execute` onto a `Mutex`-guarded inner state plus
//! `Box<dyn Fn>` callback settings.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::counts::Counts;
use crate::error::Error;
use crate::state::State;

const DEFAULT_MAX_REQUESTS: u64 = 1;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

fn default_ready_to_trip(counts: &Counts) -> bool {
    counts.consecutive_failures > 5
}

struct Inner {
    state: State,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

/// Settings accepted by [`CircuitBreaker::new`]. Every callback field is
/// optional; unset fields fall back to the defaults documented on each
/// builder method.
pub struct Settings<T, E> {
    pub name: String,
    pub max_requests: u64,
    pub interval: Duration,
    pub timeout: Duration,
    pub ready_to_trip: Box<dyn Fn(&Counts) -> bool + Send + Sync>,
    pub is_success: Box<dyn Fn(Option<&E>) -> bool + Send + Sync>,
    pub on_state_change: Option<Box<dyn Fn(&str, State, State) + Send + Sync>>,
    pub fallback: Option<Box<dyn Fn(&E) -> std::result::Result<T, E> + Send + Sync>>,
}

impl<T, E> Default for Settings<T, E> {
    fn default() -> Self {
        Settings {
            name: String::new(),
            max_requests: 0,
            interval: Duration::from_secs(0),
            timeout: Duration::from_secs(0),
            ready_to_trip: Box::new(default_ready_to_trip),
            is_success: Box::new(|err| err.is_none()),
            on_state_change: None,
            fallback: None,
        }
    }
}

pub struct CircuitBreaker<T, E> {
    name: String,
    max_requests: u64,
    interval: Duration,
    timeout: Duration,
    ready_to_trip: Box<dyn Fn(&Counts) -> bool + Send + Sync>,
    is_success: Box<dyn Fn(Option<&E>) -> bool + Send + Sync>,
    on_state_change: Option<Box<dyn Fn(&str, State, State) + Send + Sync>>,
    fallback: Option<Box<dyn Fn(&E) -> std::result::Result<T, E> + Send + Sync>>,
    inner: Mutex<Inner>,
}

impl<T, E> CircuitBreaker<T, E>
where
    E: From<Error>,
{
    pub fn new(settings: Settings<T, E>) -> Self {
        let max_requests = if settings.max_requests == 0 {
            DEFAULT_MAX_REQUESTS
        } else {
            settings.max_requests
        };
        let timeout = if settings.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            settings.timeout
        };

        let breaker = CircuitBreaker {
            name: settings.name,
            max_requests,
            interval: settings.interval,
            timeout,
            ready_to_trip: settings.ready_to_trip,
            is_success: settings.is_success,
            on_state_change: settings.on_state_change,
            fallback: settings.fallback,
            inner: Mutex::new(Inner {
                state: State::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry: None,
            }),
        };
        {
            let mut inner = breaker.inner.lock().unwrap();
            breaker.new_generation_locked(&mut inner);
        }
        breaker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> State {
        let mut inner = self.inner.lock().unwrap();
        self.current_state_locked(&mut inner, Instant::now())
    }

    pub fn counts(&self) -> Counts {
        self.inner.lock().unwrap().counts
    }

    /// Runs `op` through the breaker's admission/update cycle. On refusal,
    /// calls the configured fallback if any, else returns the refusal
    /// error (converted into `E`).
    pub fn execute<F>(&self, op: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let generation = match self.before_request() {
            Ok(generation) => generation,
            Err(refusal) => {
                let err: E = refusal.into();
                return match &self.fallback {
                    Some(fallback) => fallback(&err),
                    None => Err(err),
                };
            }
        };

        let result = op();
        let success = (self.is_success)(result.as_ref().err());
        self.after_request(generation, success);
        result
    }

    fn before_request(&self) -> std::result::Result<u64, Error> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let state = self.current_state_locked(&mut inner, now);

        match state {
            State::Open => Err(Error::BreakerOpen),
            State::HalfOpen if inner.counts.requests >= self.max_requests => {
                Err(Error::TooManyProbes)
            }
            _ => Ok(inner.generation),
        }
    }

    fn after_request(&self, before: u64, success: bool) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let state = self.current_state_locked(&mut inner, now);

        if inner.generation != before {
            return;
        }

        inner.counts.on_request();
        if success {
            self.on_success_locked(&mut inner, state, now);
        } else {
            self.on_failure_locked(&mut inner, state, now);
        }
    }

    /// CLOSED: roll generation once `interval` elapses. OPEN: transition
    /// to HALF_OPEN once `timeout` elapses.
    fn current_state_locked(&self, inner: &mut Inner, now: Instant) -> State {
        match inner.state {
            State::Closed => {
                if let Some(expiry) = inner.expiry {
                    if expiry <= now {
                        self.new_generation_locked(inner);
                    }
                }
            }
            State::Open => {
                if inner.expiry.map_or(false, |expiry| expiry <= now) {
                    self.set_state_locked(inner, State::HalfOpen);
                }
            }
            State::HalfOpen => {}
        }
        inner.state
    }

    fn set_state_locked(&self, inner: &mut Inner, state: State) {
        if inner.state == state {
            return;
        }
        let before = inner.state;
        inner.state = state;
        self.new_generation_locked(inner);
        if let Some(on_state_change) = &self.on_state_change {
            on_state_change(&self.name, before, state);
        }
    }

    fn new_generation_locked(&self, inner: &mut Inner) {
        inner.generation += 1;
        inner.counts.clear();

        let now = Instant::now();
        inner.expiry = match inner.state {
            State::Closed if self.interval.is_zero() => None,
            State::Closed => Some(now + self.interval),
            State::HalfOpen => Some(now),
            State::Open => Some(now + self.timeout),
        };
    }

    fn on_success_locked(&self, inner: &mut Inner, state: State, now: Instant) {
        match state {
            State::Closed | State::HalfOpen => {
                inner.counts.on_success();
                if (self.ready_to_trip)(&inner.counts) {
                    self.set_state_locked(inner, State::Open);
                }
            }
            State::Open => inner.counts.on_success(),
        }
        let _ = now;
    }

    fn on_failure_locked(&self, inner: &mut Inner, state: State, _now: Instant) {
        match state {
            State::Closed => {
                inner.counts.on_failure();
                if (self.ready_to_trip)(&inner.counts) {
                    self.set_state_locked(inner, State::Open);
                }
            }
            State::HalfOpen => {
                inner.counts.on_failure();
                if inner.counts.consecutive_failures >= self.max_requests {
                    self.set_state_locked(inner, State::Open);
                }
            }
            State::Open => {}
        }
    }
}
