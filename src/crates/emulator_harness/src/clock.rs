//! Time source used by every waiting loop in the harness.
//!
//! Polling loops never call `Instant::now` or `thread::sleep` directly; they go
//! through a [`Clock`] so tests can drive them with [`ManualClock`] and never
//! actually block.

use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source plus the matching way to wait on it.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Virtual clock whose `sleep` advances time without blocking.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Cell<Duration>,
    sleeps: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }

    /// Move virtual time forward without counting it as a sleep.
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    /// Virtual time passed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Number of times `sleep` was called.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}
