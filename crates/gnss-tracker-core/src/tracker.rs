//! Main tracker controller
//!
//! Wires peripheral events to the current conditions aggregate, the display
//! and the readings table. Board code owns the event loop: peripherals push
//! readings and the GNSS receiver pushes parsed sentences, and each one is
//! handed to [`TrackerController::handle_event`], which runs to completion.

use alloc::vec::Vec;
use core::fmt::Debug;

use embassy_time::Duration;
use log::{debug, error, info, warn};

use crate::app_state::{AppError, TrackerRunState};
use crate::cadence::ReportCadence;
use crate::clock::{ClockOutcome, DeviceClock, correct_clock};
use crate::config::TrackerConfig;
use crate::display::{DisplayController, Panel, RenderOutcome};
use crate::gnss::{Angle, GnssSentence};
use crate::hardware::TrackerHardware;
use crate::model::CurrentConditions;
use crate::sensors::{Capability, CapabilitySet, Reading};
use crate::storage::{Database, Table};

/// Everything the controller needs, handed over once at startup.
pub struct TrackerContext<'a, P, T, C> {
    pub hardware: TrackerHardware<'a>,
    /// E-paper panel, if the board has one
    pub panel: Option<P>,
    /// Readings table, if storage is available
    pub table: Option<T>,
    pub clock: C,
    pub config: TrackerConfig,
}

/// One subscribed peripheral and the interval it samples at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub name: &'static str,
    pub capabilities: CapabilitySet,
    /// `None` for the continuously running GNSS receiver
    pub interval: Option<Duration>,
}

/// Subscriptions resolved once during initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionTable {
    peripherals: Vec<Subscription>,
    gnss: Option<Subscription>,
}

impl SubscriptionTable {
    pub fn from_hardware(hardware: &TrackerHardware<'_>, config: &TrackerConfig) -> Self {
        let peripherals = hardware
            .peripherals()
            .map(|p| Subscription {
                name: p.name(),
                capabilities: p.capabilities(),
                interval: config.interval_for_set(p.capabilities()),
            })
            .collect();

        let gnss = hardware.gnss().map(|g| Subscription {
            name: g.name(),
            capabilities: CapabilitySet::empty().with(Capability::Gnss),
            interval: None,
        });

        Self { peripherals, gnss }
    }

    /// Subscriptions in attach order, GNSS receiver last.
    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.peripherals.iter().chain(self.gnss.iter())
    }

    pub fn len(&self) -> usize {
        self.peripherals.len() + usize::from(self.gnss.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, name: &str) -> Option<&Subscription> {
        self.iter().find(|s| s.name == name)
    }

    /// Union of every subscribed capability.
    pub fn capabilities(&self) -> CapabilitySet {
        self.iter().fold(CapabilitySet::empty(), |mut set, s| {
            set.extend(s.capabilities);
            set
        })
    }
}

/// An event pushed by a peripheral or the GNSS receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Reading(Reading),
    Gnss(GnssSentence),
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// `false` when the event was dropped or ignored
    pub accepted: bool,
    /// Id of the stored row
    pub persisted: Option<u32>,
    pub render: Option<RenderOutcome>,
    pub clock: Option<ClockOutcome>,
    /// A position line was logged
    pub reported: bool,
}

struct Coordinate(Option<Angle>);

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(angle) => write!(f, "{}", angle),
            None => f.write_str("--"),
        }
    }
}

pub struct TrackerController<'a, P, T, C>
where
    P: Panel,
    T: Table,
    C: DeviceClock,
{
    hardware: TrackerHardware<'a>,
    display: Option<DisplayController<P>>,
    pending_table: Option<T>,
    database: Option<Database<T>>,
    clock: C,
    config: TrackerConfig,
    subscriptions: SubscriptionTable,
    conditions: CurrentConditions,
    cadence: ReportCadence,
    state: TrackerRunState,
}

impl<'a, P, T, C> TrackerController<'a, P, T, C>
where
    P: Panel,
    P::Error: Debug,
    T: Table,
    C: DeviceClock,
{
    pub fn new(context: TrackerContext<'a, P, T, C>) -> Self {
        let TrackerContext {
            hardware,
            panel,
            table,
            clock,
            config,
        } = context;

        Self {
            hardware,
            display: panel.map(DisplayController::new),
            pending_table: table,
            database: None,
            clock,
            cadence: ReportCadence::new(config.gnss_report_interval()),
            config,
            subscriptions: SubscriptionTable::default(),
            conditions: CurrentConditions::default(),
            state: TrackerRunState::Uninitialized,
        }
    }

    /// Resolve subscriptions, open the readings table and draw the display
    /// background.
    ///
    /// A table that cannot be configured disables persistence; the tracker
    /// keeps running without it.
    pub fn initialize(&mut self) -> Result<(), AppError> {
        if self.state != TrackerRunState::Uninitialized {
            return Err(AppError::AlreadyInitialized);
        }

        self.subscriptions = SubscriptionTable::from_hardware(&self.hardware, &self.config);
        for subscription in self.subscriptions.iter() {
            match subscription.interval {
                Some(interval) => info!(
                    "Subscribed {} ({}) every {}s",
                    subscription.name,
                    subscription.capabilities,
                    interval.as_secs()
                ),
                None => info!(
                    "Subscribed {} ({}) continuously",
                    subscription.name, subscription.capabilities
                ),
            }
        }
        if self.subscriptions.is_empty() {
            warn!("No peripherals attached");
        }

        match self.pending_table.take() {
            Some(table) => {
                let mut database = Database::new(table, self.config.echo_rows);
                match database.configure(self.config.reset_database) {
                    Ok(()) => self.database = Some(database),
                    Err(e) => error!("Readings table unavailable, not storing readings: {}", e),
                }
            }
            None => warn!("No readings table, not storing readings"),
        }

        if let Some(display) = &self.display {
            display.draw_background();
        }

        self.state = TrackerRunState::Initialized;
        info!("Tracker initialized");
        Ok(())
    }

    /// Start sampling on every subscribed peripheral and start the GNSS
    /// receiver. A peripheral that fails to start is logged and skipped.
    pub fn run(&mut self) -> Result<(), AppError> {
        match self.state {
            TrackerRunState::Uninitialized => return Err(AppError::NotInitialized),
            TrackerRunState::Running => return Err(AppError::AlreadyRunning),
            TrackerRunState::Initialized => {}
        }

        let intervals = self.subscriptions.peripherals.iter().map(|s| s.interval);
        for (peripheral, interval) in self.hardware.peripherals_mut().zip(intervals) {
            let Some(interval) = interval else {
                warn!(
                    "{} ({}) has no sampling interval, not started",
                    peripheral.name(),
                    peripheral.capabilities()
                );
                continue;
            };
            match peripheral.start_updating(interval) {
                Ok(()) => debug!("{} sampling started", peripheral.name()),
                Err(e) => error!("{}", e),
            }
        }

        if let Some(gnss) = self.hardware.gnss_mut() {
            match gnss.start_updating() {
                Ok(()) => debug!("{} started", gnss.name()),
                Err(e) => error!("{}", e),
            }
        }

        self.state = TrackerRunState::Running;
        info!("Tracker running");
        Ok(())
    }

    /// Stop every peripheral and the GNSS receiver.
    pub fn stop(&mut self) {
        if self.state != TrackerRunState::Running {
            return;
        }

        for peripheral in self.hardware.peripherals_mut() {
            peripheral.stop_updating();
        }
        if let Some(gnss) = self.hardware.gnss_mut() {
            gnss.stop_updating();
        }

        self.state = TrackerRunState::Initialized;
        info!("Tracker stopped");
    }

    /// Handle one event. Events arriving while the tracker is not running are
    /// dropped.
    pub fn handle_event(&mut self, event: TrackerEvent) -> EventOutcome {
        if self.state != TrackerRunState::Running {
            debug!("Dropping event, tracker is {:?}", self.state);
            return EventOutcome::default();
        }

        match event {
            TrackerEvent::Reading(reading) => self.handle_reading(&reading),
            TrackerEvent::Gnss(sentence) => self.handle_sentence(&sentence),
        }
    }

    fn handle_reading(&mut self, reading: &Reading) -> EventOutcome {
        let carried = reading.capabilities();
        let registered = self.subscriptions.capabilities();
        if carried.is_empty() || !carried.iter().all(|c| registered.contains(c)) {
            warn!("Dropping reading from unsubscribed capability ({})", carried);
            return EventOutcome::default();
        }

        info!("{}", reading);
        let now = self.clock.now();
        self.conditions.apply(reading, now);

        EventOutcome {
            accepted: true,
            persisted: self.persist(),
            render: self.display.as_ref().map(|d| d.update(&self.conditions)),
            ..EventOutcome::default()
        }
    }

    fn handle_sentence(&mut self, sentence: &GnssSentence) -> EventOutcome {
        if !self.subscriptions.capabilities().contains(Capability::Gnss) {
            warn!("Dropping {} sentence, no GNSS receiver subscribed", sentence.mnemonic());
            return EventOutcome::default();
        }

        let fix = match sentence {
            GnssSentence::Rmc(fix) | GnssSentence::Gll(fix) | GnssSentence::Gga(fix) => fix,
            GnssSentence::Gsa(active) => {
                debug!("GSA: {} satellites used for fix", active.used_for_fix.len());
                return EventOutcome::default();
            }
            GnssSentence::Gsv(in_view) => {
                debug!("GSV: {} satellites in view", in_view.count);
                return EventOutcome::default();
            }
            GnssSentence::Vtg(course) => {
                debug!("VTG: {}", course);
                return EventOutcome::default();
            }
        };

        if !fix.valid {
            debug!("{}: no valid fix", sentence.mnemonic());
            return EventOutcome::default();
        }

        let reported = self.cadence.should_report(self.clock.monotonic());
        if reported {
            info!(
                "{}: {} / {}",
                sentence.mnemonic(),
                Coordinate(fix.latitude()),
                Coordinate(fix.longitude())
            );
        }

        self.conditions.set_fix(*fix);
        let clock = fix
            .time_of_reading
            .map(|time| correct_clock(&mut self.clock, time));

        EventOutcome {
            accepted: true,
            persisted: self.persist(),
            render: self
                .display
                .as_ref()
                .map(|d| d.update_position(&self.conditions.location)),
            clock,
            reported,
        }
    }

    fn persist(&mut self) -> Option<u32> {
        let database = self.database.as_mut()?;
        match database.save(&self.conditions, self.clock.now()) {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Failed to store reading: {}", e);
                None
            }
        }
    }

    pub fn state(&self) -> TrackerRunState {
        self.state
    }

    pub fn conditions(&self) -> &CurrentConditions {
        &self.conditions
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    pub fn hardware(&self) -> &TrackerHardware<'a> {
        &self.hardware
    }

    pub fn display(&self) -> Option<&DisplayController<P>> {
        self.display.as_ref()
    }

    /// `None` before initialization or when the table could not be configured.
    pub fn database_mut(&mut self) -> Option<&mut Database<T>> {
        self.database.as_mut()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}
