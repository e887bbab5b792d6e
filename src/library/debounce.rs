//! Debounced-persistence scheduler.
//!
//! Rapid resume-state updates (page turns, playback ticks) collapse into a
//! single storage write per logical key: each `schedule` call re-arms the
//! key's deadline one window into the future, and the write runs only once
//! the deadline passes with no further calls. Durable state may therefore
//! lag in-memory state by up to the window; that staleness is accepted for
//! non-safety-critical resume positions.
//!
//! The clock is injected so the scheduler can be driven in tests without
//! real timers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One pending-write timer per logical key.
pub struct PersistScheduler {
    window: Duration,
    clock: Arc<dyn Clock>,
    deadlines: HashMap<&'static str, Instant>,
}

impl PersistScheduler {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> PersistScheduler {
        PersistScheduler {
            window,
            clock,
            deadlines: HashMap::new(),
        }
    }

    /// Arm (or re-arm) the pending write for `key`. Calling again within the
    /// window pushes the deadline out, collapsing a burst into one write.
    pub fn schedule(&mut self, key: &'static str) {
        let deadline = self.clock.now() + self.window;
        self.deadlines.insert(key, deadline);
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Remove and return the keys whose deadline has passed.
    pub fn take_due(&mut self) -> Vec<&'static str> {
        let now = self.clock.now();
        let due: Vec<&'static str> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }

    /// Remove and return all pending keys regardless of deadline ("flush now").
    pub fn take_all(&mut self) -> Vec<&'static str> {
        self.deadlines.drain().map(|(key, _)| key).collect()
    }
}

/// Test clock advanced by hand.
#[cfg(test)]
pub struct ManualClock {
    base: Instant,
    offset: std::sync::Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock {
            base: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}
