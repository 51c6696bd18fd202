//! Tracker run state, top-level errors and shared access

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::warn;
use thiserror_no_std::Error;

use crate::clock::DeviceClock;
use crate::config::ConfigError;
use crate::display::Panel;
use crate::sensors::SensorError;
use crate::storage::{StorageError, Table};
use crate::tracker::{EventOutcome, TrackerController, TrackerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerRunState {
    Uninitialized,
    Initialized,
    Running,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Tracker has not been initialized")]
    NotInitialized,
    #[error("Tracker is already initialized")]
    AlreadyInitialized,
    #[error("Tracker is already running")]
    AlreadyRunning,
    #[error("Tracker is busy handling another event")]
    Busy,
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Storage error: {0}")]
    Storage(StorageError),
    #[error("Config error: {0}")]
    Config(ConfigError),
}

impl From<SensorError> for AppError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// The controller behind a critical-section lock, so callbacks from several
/// event sources are handled one at a time.
pub type SharedTracker<'a, P, T, C> =
    Mutex<CriticalSectionRawMutex, RefCell<TrackerController<'a, P, T, C>>>;

pub fn share<'a, P, T, C>(tracker: TrackerController<'a, P, T, C>) -> SharedTracker<'a, P, T, C>
where
    P: Panel,
    T: Table,
    C: DeviceClock,
{
    Mutex::new(RefCell::new(tracker))
}

/// Deliver one event to a shared tracker.
///
/// An event raised from inside another event's handling is refused with
/// [`AppError::Busy`] instead of re-entering the controller.
pub fn dispatch<P, T, C>(
    shared: &SharedTracker<'_, P, T, C>,
    event: TrackerEvent,
) -> Result<EventOutcome, AppError>
where
    P: Panel,
    P::Error: core::fmt::Debug,
    T: Table,
    C: DeviceClock,
{
    shared.lock(|cell| match cell.try_borrow_mut() {
        Ok(mut tracker) => Ok(tracker.handle_event(event)),
        Err(_) => {
            warn!("Event arrived during another event, dropping");
            Err(AppError::Busy)
        }
    })
}

/// Run `f` with exclusive access to a shared tracker.
pub fn with_tracker<'a, P, T, C, R>(
    shared: &SharedTracker<'a, P, T, C>,
    f: impl FnOnce(&mut TrackerController<'a, P, T, C>) -> R,
) -> Result<R, AppError>
where
    P: Panel,
    T: Table,
    C: DeviceClock,
{
    shared.lock(|cell| {
        cell.try_borrow_mut()
            .map(|mut tracker| f(&mut tracker))
            .map_err(|_| AppError::Busy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::{FakeClock, datetime};
    use crate::config::TrackerConfig;
    use crate::display::tests::TestPanel;
    use crate::hardware::TrackerHardware;
    use crate::hardware::tests::FakePeripheral;
    use crate::sensors::{Capability, Reading};
    use crate::storage::MemoryTable;
    use crate::tracker::TrackerContext;
    use crate::units::Temperature;

    fn shared_tracker() -> SharedTracker<'static, TestPanel, MemoryTable, FakeClock> {
        let mut hardware = TrackerHardware::new();
        hardware.attach(Ok(FakePeripheral::new("TMP117", &[Capability::Temperature])));

        let mut tracker = TrackerController::new(TrackerContext {
            hardware,
            panel: Some(TestPanel::default()),
            table: Some(MemoryTable::new()),
            clock: FakeClock::at(datetime(2024, 3, 1, 6, 0, 0)),
            config: TrackerConfig::default(),
        });
        tracker.initialize().unwrap();
        tracker.run().unwrap();
        share(tracker)
    }

    fn temperature(celsius: f32) -> TrackerEvent {
        TrackerEvent::Reading(Reading::Temperature(Temperature::from_celsius(celsius)))
    }

    #[test]
    fn test_dispatch_serializes_events() {
        let shared = shared_tracker();

        let first = dispatch(&shared, temperature(10.0)).unwrap();
        let second = dispatch(&shared, temperature(11.0)).unwrap();
        assert_eq!(first.persisted, Some(1));
        assert_eq!(second.persisted, Some(2));

        let latest = with_tracker(&shared, |t| t.conditions().atmospheric.temperature).unwrap();
        assert_eq!(latest, Some(Temperature::from_celsius(11.0)));
    }

    #[test]
    fn test_reentrant_dispatch_is_refused() {
        let shared = shared_tracker();

        let nested = with_tracker(&shared, |_| dispatch(&shared, temperature(12.0))).unwrap();
        assert_eq!(nested, Err(AppError::Busy));

        let state = with_tracker(&shared, |t| t.state()).unwrap();
        assert_eq!(state, TrackerRunState::Running);
    }

    #[test]
    fn test_errors_convert_into_app_error() {
        let e: AppError = StorageError::NotCreated.into();
        assert_eq!(e, AppError::Storage(StorageError::NotCreated));

        let e: AppError = ConfigError::Decode.into();
        assert!(matches!(e, AppError::Config(_)));
    }
}
