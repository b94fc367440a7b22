use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// One-shot flag with a timed wait, used for shutdown requests and exit
/// acknowledgments between a controller and its worker thread.
#[derive(Debug, Default)]
pub struct Signal {
    set: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        self.cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    pub fn reset(&self) {
        *self.set.lock() = false;
    }

    /// Block until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();
        while !*set {
            if self.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }
        *set
    }
}

/// Fixed-cadence deadline accumulator.
///
/// Each call to [`TickClock::delay_until_next`] advances the deadline by exactly
/// one interval, whether or not the previous tick ran late, so occasional
/// jitter never accumulates into drift.
#[derive(Debug, Clone)]
pub struct TickClock {
    next_deadline: Instant,
    interval: Duration,
    ticks: u64,
}

impl TickClock {
    /// A clock whose first deadline is `start`.
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            next_deadline: start,
            interval,
            ticks: 0,
        }
    }

    /// Time left until the current deadline as seen at `now`, or `None` if
    /// the deadline has already passed. Advances to the next deadline.
    pub fn delay_until_next(&mut self, now: Instant) -> Option<Duration> {
        let delta = self.next_deadline.checked_duration_since(now).filter(|d| !d.is_zero());
        self.next_deadline += self.interval;
        self.ticks += 1;
        delta
    }

    /// Deadline the next call will wait for.
    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Deadlines consumed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait on `shutdown` until the current deadline, then advance.
    ///
    /// Returns `false` if shutdown was requested.
    pub fn wait_next(&mut self, shutdown: &Signal) -> bool {
        match self.delay_until_next(Instant::now()) {
            Some(delay) => !shutdown.wait_timeout(delay),
            None => !shutdown.is_set(),
        }
    }
}
