#![forbid(unsafe_code)]

//! Clocks and the commit debouncer.
//!
//! The debouncer is an explicit deadline rather than a timer callback: the
//! host loop (or a test) asks it whether the deadline has passed. Every
//! [`Debouncer::arm`] inside the quiet period pushes the deadline out, so a
//! burst of registrations produces one commit.
//!
//! # Invariants
//!
//! 1. `fire(now)` returns `Some` at most once per armed burst, and only when
//!    `now >= deadline`.
//! 2. `cancel` and `fire` both leave the debouncer disarmed.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock").finish_non_exhaustive()
    }
}

/// Quiet-period debouncer.
#[derive(Clone, Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
    pending: usize,
}

impl Debouncer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            pending: 0,
        }
    }

    /// Record one more event and push the deadline to `now + quiet`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
        self.pending += 1;
    }

    /// Disarm, returning how many events were coalesced.
    pub fn cancel(&mut self) -> usize {
        self.deadline = None;
        std::mem::take(&mut self.pending)
    }

    /// Disarm and report the coalesced count if the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> Option<usize> {
        match self.deadline {
            Some(deadline) if now >= deadline => Some(self.cancel()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }
}
