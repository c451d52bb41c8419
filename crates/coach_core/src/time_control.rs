//! Time limits for engine queries.
//!
//! Every analysis query runs under a [`TimeLimit`]: a wall-clock budget plus a
//! shared stop flag. The flag lets another thread cancel a query that is
//! already waiting on the engine, e.g. when the position it was asked about
//! has changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock budget and cancellation flag for one engine query.
///
/// Cheap to clone; clones share the stop flag, so a clone kept by the caller
/// can cancel the query from another thread.
#[derive(Debug, Clone)]
pub struct TimeLimit {
    /// Time the engine is asked to think for
    budget: Duration,
    /// Shared stop flag
    stopped: Arc<AtomicBool>,
}

impl TimeLimit {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Another budget sharing this limit's stop flag, so one `stop` cancels
    /// both queries.
    pub fn with_budget(&self, budget: Duration) -> Self {
        Self {
            budget,
            stopped: Arc::clone(&self.stopped),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Budget in whole milliseconds, at least 1 so `go movetime` stays valid.
    pub fn budget_ms(&self) -> u64 {
        (self.budget.as_millis() as u64).max(1)
    }

    /// Cancel the query. Safe to call from any thread, any number of times.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Start the clock: the returned deadline is `budget + grace` from now.
    pub fn start(&self, grace: Duration) -> Deadline {
        Deadline::after(self.budget + grace)
    }
}

/// A point in time after which a pending query is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(d: Duration) -> Self {
        Self {
            at: Instant::now() + d,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Remaining time, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// The earlier of this deadline and `slice` from now. Used to wake up
    /// periodically and look at the stop flag while waiting.
    pub fn capped(&self, slice: Duration) -> Instant {
        self.at.min(Instant::now() + slice)
    }
}

#[cfg(test)]
#[path = "time_control_tests.rs"]
mod time_control_tests;
