//! Simulated peripherals, GNSS receiver, device clock and e-paper panel.
//!
//! Peripherals register a sampling job with the shared [`Scheduler`] when the
//! tracker starts them; the main loop polls the scheduler once per simulated
//! second and turns due jobs into readings.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::path::Path;
use std::rc::Rc;

use chrono::{NaiveDateTime, TimeDelta};
use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay};
use log::debug;

use gnss_tracker_core::clock::{ClockError, DeviceClock};
use gnss_tracker_core::display::framebuffer::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use gnss_tracker_core::display::{FrameBuffer, Panel};
use gnss_tracker_core::gnss::{
    ActiveSatellites, Angle, CourseOverGround, Fix, GnssSentence, Position, SatellitesInView,
};
use gnss_tracker_core::sensors::{
    AtmosphericSample, Capability, CapabilitySet, GnssReceiver, Peripheral, Reading, SensorError,
};
use gnss_tracker_core::units::{
    Acceleration3, AngularVelocity3, Concentration, Pressure, RelativeHumidity, Resistance,
    Temperature, Voltage,
};

/// Seconds since the simulation started, shared by every simulated part.
pub type SimTime = Rc<Cell<u64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Atmospheric,
    Co2,
    Motion,
    Voltage,
}

#[derive(Debug)]
struct Job {
    name: &'static str,
    source: Source,
    interval_secs: u64,
    next_due: u64,
}

/// Sampling jobs registered by started peripherals.
#[derive(Clone, Default)]
pub struct Scheduler {
    jobs: Rc<RefCell<Vec<Job>>>,
}

impl Scheduler {
    fn start(&self, name: &'static str, source: Source, interval: Duration, now: u64) {
        let mut jobs = self.jobs.borrow_mut();
        jobs.retain(|job| job.name != name);
        jobs.push(Job {
            name,
            source,
            interval_secs: interval.as_secs().max(1),
            next_due: now,
        });
    }

    fn stop(&self, name: &'static str) {
        self.jobs.borrow_mut().retain(|job| job.name != name);
    }

    /// Sources due at `now`; each due job is rescheduled one interval later.
    pub fn due(&self, now: u64) -> Vec<Source> {
        let mut due = Vec::new();
        for job in self.jobs.borrow_mut().iter_mut() {
            if job.next_due <= now {
                due.push(job.source);
                job.next_due = now + job.interval_secs;
            }
        }
        due
    }
}

pub struct SimulatedPeripheral {
    name: &'static str,
    source: Source,
    capabilities: CapabilitySet,
    scheduler: Scheduler,
    time: SimTime,
}

impl SimulatedPeripheral {
    /// Bring up a simulated part. `present = false` behaves like a part that
    /// does not answer on the bus.
    pub fn init(
        name: &'static str,
        source: Source,
        present: bool,
        scheduler: &Scheduler,
        time: &SimTime,
    ) -> Result<Self, SensorError> {
        if !present {
            return Err(SensorError::InitializationFailed {
                sensor: name,
                details: "no ACK at address",
            });
        }

        let capabilities = match source {
            Source::Atmospheric => [
                Capability::Temperature,
                Capability::Humidity,
                Capability::Pressure,
                Capability::GasResistance,
            ]
            .into_iter()
            .collect(),
            Source::Co2 => CapabilitySet::empty().with(Capability::Co2),
            Source::Motion => CapabilitySet::empty()
                .with(Capability::Accelerometer)
                .with(Capability::Gyroscope),
            Source::Voltage => CapabilitySet::empty()
                .with(Capability::BatteryVoltage)
                .with(Capability::SolarVoltage),
        };

        Ok(Self {
            name,
            source,
            capabilities,
            scheduler: scheduler.clone(),
            time: time.clone(),
        })
    }
}

impl Peripheral for SimulatedPeripheral {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn start_updating(&mut self, interval: Duration) -> Result<(), SensorError> {
        self.scheduler
            .start(self.name, self.source, interval, self.time.get());
        Ok(())
    }

    fn stop_updating(&mut self) {
        self.scheduler.stop(self.name);
    }
}

/// Readings a source produces at simulated second `t`.
pub fn sample(source: Source, t: u64) -> Vec<Reading> {
    let t = t as f64;
    match source {
        Source::Atmospheric => vec![Reading::Atmospheric(AtmosphericSample {
            temperature: Some(Temperature::from_celsius(
                (23.0 + 3.0 * (t / 600.0).sin() + 0.5 * (t / 97.0).cos()) as f32,
            )),
            humidity: Some(RelativeHumidity::from_percent(
                (50.0 + 10.0 * (t / 900.0).sin()) as f32,
            )),
            pressure: Some(Pressure::from_millibar(
                (1013.25 + 4.0 * (t / 1800.0).sin()) as f32,
            )),
            gas_resistance: Some(Resistance::from_ohms(
                (45_000.0 + 5_000.0 * (t / 300.0).cos()) as f32,
            )),
        })],
        Source::Co2 => vec![Reading::Co2(Concentration::from_ppm(
            (600.0 + 200.0 * (t / 1200.0).sin() + 30.0 * (t / 41.0).cos()) as f32,
        ))],
        Source::Motion => vec![
            Reading::Acceleration(Acceleration3::new(
                (0.2 * (t / 7.0).sin()) as f32,
                (0.1 * (t / 11.0).cos()) as f32,
                9.81,
            )),
            Reading::AngularVelocity(AngularVelocity3::new(
                (1.5 * (t / 13.0).sin()) as f32,
                0.0,
                (0.5 * (t / 5.0).cos()) as f32,
            )),
        ],
        Source::Voltage => vec![
            Reading::BatteryVoltage(Voltage::from_volts((3.9 - t / 36_000.0) as f32)),
            Reading::SolarVoltage(Voltage::from_volts(
                (5.0 * (t / 3600.0).sin().max(0.0)) as f32,
            )),
        ],
    }
}

/// NEO-M8 style receiver walking a slow track.
pub struct SimulatedReceiver {
    running: Rc<Cell<bool>>,
}

impl SimulatedReceiver {
    pub fn new() -> (Self, Rc<Cell<bool>>) {
        let running = Rc::new(Cell::new(false));
        (
            Self {
                running: running.clone(),
            },
            running,
        )
    }
}

impl GnssReceiver for SimulatedReceiver {
    fn name(&self) -> &'static str {
        "NEO-M8"
    }

    fn start_updating(&mut self) -> Result<(), SensorError> {
        self.running.set(true);
        Ok(())
    }

    fn stop_updating(&mut self) {
        self.running.set(false);
    }
}

/// Seconds after power-up before the receiver reports a valid fix.
const ACQUISITION_SECS: u64 = 8;

/// One second's worth of sentences from the receiver.
pub fn gnss_burst(t: u64, satellite_utc: NaiveDateTime) -> Vec<GnssSentence> {
    let acquired = t >= ACQUISITION_SECS;
    let tf = t as f64;
    let position = Position {
        latitude: Some(Angle::from_degrees(19.710_833 + tf * 0.000_01)),
        longitude: Some(Angle::from_degrees(-155.084_027 + tf * 0.000_02)),
        altitude: Some(12.0),
    };
    let fix = Fix {
        valid: acquired,
        position: acquired.then_some(position),
        time_of_reading: acquired.then_some(satellite_utc),
    };
    let without_date = Fix {
        time_of_reading: None,
        ..fix
    };

    let used = if acquired { 7 } else { 0 };
    vec![
        GnssSentence::Rmc(fix),
        GnssSentence::Gga(without_date),
        GnssSentence::Gsa(ActiveSatellites {
            used_for_fix: (1..=used).collect(),
        }),
        GnssSentence::Gsv(SatellitesInView { count: 11 }),
        GnssSentence::Vtg(CourseOverGround {
            true_heading: acquired.then_some(63.4),
            speed_knots: acquired.then_some(0.04),
        }),
    ]
}

/// RTC that powers up at 2000-01-01 until the tracker sets it.
pub struct SimulatedClock {
    time: SimTime,
    boot_wall_time: NaiveDateTime,
}

impl SimulatedClock {
    pub fn new(time: &SimTime, boot_wall_time: NaiveDateTime) -> Self {
        Self {
            time: time.clone(),
            boot_wall_time,
        }
    }

    fn elapsed(&self) -> TimeDelta {
        TimeDelta::seconds(self.time.get() as i64)
    }
}

impl DeviceClock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        self.boot_wall_time + self.elapsed()
    }

    fn monotonic(&self) -> Instant {
        Instant::from_secs(self.time.get())
    }

    fn set_clock(&mut self, utc: NaiveDateTime) -> Result<(), ClockError> {
        self.boot_wall_time = utc - self.elapsed();
        Ok(())
    }
}

#[derive(Debug)]
pub struct EpaperError(pub String);

/// 2.13" e-paper rendered off-screen.
pub struct SimulatedEpaper {
    buffer: FrameBuffer,
    display: SimulatorDisplay<BinaryColor>,
    refreshes: u32,
}

impl Default for SimulatedEpaper {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEpaper {
    pub fn new() -> Self {
        Self {
            buffer: FrameBuffer::new(),
            display: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)),
            refreshes: 0,
        }
    }

    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// Write what the glass currently shows, ink in black on white.
    pub fn save_png(&self, path: &Path) -> Result<(), EpaperError> {
        let settings = OutputSettingsBuilder::new()
            .theme(BinaryColorTheme::Inverted)
            .scale(2)
            .build();
        self.display
            .to_rgb_output_image(&settings)
            .save_png(path)
            .map_err(|e| EpaperError(e.to_string()))
    }
}

impl OriginDimensions for SimulatedEpaper {
    fn size(&self) -> Size {
        self.buffer.size()
    }
}

impl DrawTarget for SimulatedEpaper {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.buffer.draw_iter(pixels)
    }
}

impl Panel for SimulatedEpaper {
    fn show(&mut self) -> Result<(), Self::Error> {
        self.buffer.flush(&mut self.display)?;
        self.refreshes += 1;
        debug!("E-paper refresh {}", self.refreshes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn boot() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_scheduler_reschedules_due_jobs() {
        let scheduler = Scheduler::default();
        scheduler.start("BME688", Source::Atmospheric, Duration::from_secs(60), 0);
        scheduler.start("BMI270", Source::Motion, Duration::from_secs(5), 0);

        assert_eq!(scheduler.due(0), [Source::Atmospheric, Source::Motion]);
        assert!(scheduler.due(4).is_empty());
        assert_eq!(scheduler.due(5), [Source::Motion]);

        scheduler.stop("BMI270");
        assert!(scheduler.due(10).is_empty());
        assert_eq!(scheduler.due(60), [Source::Atmospheric]);
    }

    #[test]
    fn test_clock_keeps_running_after_being_set() {
        let time = SimTime::default();
        let mut clock = SimulatedClock::new(&time, boot());
        time.set(30);

        let utc = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        clock.set_clock(utc).unwrap();
        assert_eq!(clock.now(), utc);

        time.set(90);
        assert_eq!(clock.now(), utc + TimeDelta::seconds(60));
        assert_eq!(clock.monotonic(), Instant::from_secs(90));
    }

    #[test]
    fn test_receiver_reports_invalid_fix_while_acquiring() {
        let utc = boot();
        let early = gnss_burst(0, utc);
        assert!(early[0].fix().is_some_and(|f| !f.valid));

        let late = gnss_burst(ACQUISITION_SECS, utc);
        let fix = late[0].fix().unwrap();
        assert!(fix.valid);
        assert_eq!(fix.time_of_reading, Some(utc));
        assert!(late[1].fix().unwrap().time_of_reading.is_none());
    }
}
