//! Log-line rate limiting for high frequency GNSS fixes
//!
//! Receivers emit several fixes per second. Position log lines are only
//! emitted once per configured interval; there is no queueing and no record
//! of suppressed events.

use embassy_time::{Duration, Instant};

/// Threshold check reapplied on every event.
#[derive(Debug, Clone, Copy)]
pub struct ReportCadence {
    interval: Duration,
    last_report: Option<Instant>,
}

impl ReportCadence {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: None,
        }
    }

    /// Returns `true` and records `now` when at least `interval` has passed
    /// since the last emission. The first event always emits.
    ///
    /// A `now` earlier than the last emission never emits.
    pub fn should_report(&mut self, now: Instant) -> bool {
        let due = match self.last_report {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= self.interval),
        };

        if due {
            self.last_report = Some(now);
        }
        due
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn last_report(&self) -> Option<Instant> {
        self.last_report
    }
}
