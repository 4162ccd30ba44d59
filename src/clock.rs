//! Monotonic millisecond time and the sleep capability used by the agent loop.
//!
//! Time is a fixed-width `u32` counter that wraps after ~49.7 days, so every
//! interval comparison goes through [`MonotonicMillis::elapsed_since`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Largest interval that can be compared safely against a wrapping `u32` counter.
pub const MAX_INTERVAL_MS: u64 = (u32::MAX / 2) as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonotonicMillis(pub u32);

impl MonotonicMillis {
    /// Milliseconds from `earlier` to `self`, correct across a single counter wrap.
    pub fn elapsed_since(self, earlier: MonotonicMillis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Time source plus the only blocking primitive the agent uses.
pub trait Clock {
    fn now(&self) -> MonotonicMillis;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> MonotonicMillis {
        // Truncation is the wrap.
        MonotonicMillis(self.origin.elapsed().as_millis() as u32)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock whose time only moves when slept on or advanced explicitly.
///
/// Clones share the same counter and sleep log, so a test can keep one handle
/// while the agent owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn starting_at(millis: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(millis)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Steps longer than the counter range saturate at `u32::MAX` milliseconds.
    pub fn advance(&self, duration: Duration) {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        self.now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.wrapping_add(millis))
            })
            .ok();
    }

    pub fn set(&self, millis: u32) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|sleeps| sleeps.clone())
            .unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> MonotonicMillis {
        MonotonicMillis(self.now.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}
