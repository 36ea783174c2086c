//! Injectable monotonic time source.
//!
//! The filter loop only ever asks "how long since I last looked", so a clock
//! is just a monotonically increasing `Duration` since an arbitrary origin.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Time since the clock's origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Caller-driven clock for tests and log replay.
///
/// Clones share the same time, so a test can keep a handle while the filter
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `secs`. Negative or non-finite steps are ignored.
    pub fn advance(&self, secs: f64) {
        let step = Duration::try_from_secs_f64(secs).unwrap_or_default();
        self.now.set(self.now.get() + step);
    }

    /// Jump to an absolute time. Invalid values map to zero.
    pub fn set_seconds(&self, secs: f64) {
        self.now.set(Duration::try_from_secs_f64(secs).unwrap_or_default());
    }

    pub fn seconds(&self) -> f64 {
        self.now.get().as_secs_f64()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Stopwatch over a `Clock`
#[derive(Clone, Debug)]
pub struct ElapsedTimer<C: Clock> {
    clock: C,
    started_at: Option<Duration>,
}

impl<C: Clock> ElapsedTimer<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, started_at: None }
    }

    pub fn start(&mut self) {
        self.started_at = Some(self.clock.now());
    }

    /// Back to the not-started state
    pub fn reset(&mut self) {
        self.started_at = None;
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Seconds since `start`. Zero if never started or if the clock went
    /// backwards.
    pub fn elapsed_seconds(&self) -> f64 {
        match self.started_at {
            Some(t0) => self.clock.now().saturating_sub(t0).as_secs_f64(),
            None => 0.0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
