//! Device clock seam and GNSS based clock correction

use chrono::NaiveDateTime;
use embassy_time::Instant;
use log::{error, info};
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("RTC rejected the new time")]
    Rejected,
}

/// Wall clock and monotonic time source provided by the platform.
pub trait DeviceClock {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Monotonic time, used for rate limiting.
    fn monotonic(&self) -> Instant;

    /// Set the wall clock.
    fn set_clock(&mut self, utc: NaiveDateTime) -> Result<(), ClockError>;
}

/// Result of checking a fix's timestamp against the device clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutcome {
    /// Dates match, nothing to do
    InSync,
    /// The device clock was set from the fix
    Corrected,
    /// The dates differed but setting the clock failed
    Failed,
}

/// Whether the device date disagrees with the GNSS date.
///
/// Only the calendar date is compared; time-of-day drift is ignored.
pub fn needs_correction(fix_time: NaiveDateTime, local: NaiveDateTime) -> bool {
    fix_time.date() != local.date()
}

/// Set the device clock from a fix timestamp when the dates differ.
///
/// Best effort: one attempt per call, no retry, no validation of fix quality.
pub fn correct_clock<C: DeviceClock>(clock: &mut C, fix_time: NaiveDateTime) -> ClockOutcome {
    let local = clock.now();
    if !needs_correction(fix_time, local) {
        return ClockOutcome::InSync;
    }

    info!(
        "Device date {} differs from GNSS date {}. Updating.",
        local.date(),
        fix_time.date()
    );

    match clock.set_clock(fix_time) {
        Ok(()) => {
            info!("Device time set: {}", clock.now());
            ClockOutcome::Corrected
        }
        Err(e) => {
            error!("Failed to set device clock: {}", e);
            ClockOutcome::Failed
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Settable clock that counts how often it was set.
    pub(crate) struct FakeClock {
        pub(crate) now: NaiveDateTime,
        pub(crate) monotonic: Instant,
        pub(crate) set_calls: usize,
        pub(crate) reject: bool,
    }

    impl FakeClock {
        pub(crate) fn at(now: NaiveDateTime) -> Self {
            Self {
                now,
                monotonic: Instant::from_secs(0),
                set_calls: 0,
                reject: false,
            }
        }
    }

    impl DeviceClock for FakeClock {
        fn now(&self) -> NaiveDateTime {
            self.now
        }

        fn monotonic(&self) -> Instant {
            self.monotonic
        }

        fn set_clock(&mut self, utc: NaiveDateTime) -> Result<(), ClockError> {
            self.set_calls += 1;
            if self.reject {
                return Err(ClockError::Rejected);
            }
            self.now = utc;
            Ok(())
        }
    }

    pub(crate) fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .expect("valid test datetime")
    }

    #[test]
    fn test_same_date_different_time_is_in_sync() {
        let mut clock = FakeClock::at(datetime(2024, 3, 1, 8, 0, 0));
        let outcome = correct_clock(&mut clock, datetime(2024, 3, 1, 23, 59, 59));
        assert_eq!(outcome, ClockOutcome::InSync);
        assert_eq!(clock.set_calls, 0);
    }

    #[test]
    fn test_different_date_sets_clock_once() {
        let mut clock = FakeClock::at(datetime(2000, 1, 1, 0, 0, 5));
        let fix_time = datetime(2024, 3, 1, 12, 30, 0);

        assert_eq!(correct_clock(&mut clock, fix_time), ClockOutcome::Corrected);
        assert_eq!(clock.set_calls, 1);
        assert_eq!(clock.now, fix_time);

        // The same fix again is now in sync.
        assert_eq!(correct_clock(&mut clock, fix_time), ClockOutcome::InSync);
        assert_eq!(clock.set_calls, 1);
    }

    #[test]
    fn test_rejected_set_is_not_retried() {
        let mut clock = FakeClock::at(datetime(2000, 1, 1, 0, 0, 0));
        clock.reject = true;

        let outcome = correct_clock(&mut clock, datetime(2024, 3, 1, 12, 0, 0));
        assert_eq!(outcome, ClockOutcome::Failed);
        assert_eq!(clock.set_calls, 1);
    }
}
