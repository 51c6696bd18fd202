//! Desktop simulator for the GNSS tracker.
//!
//! Runs the tracker core against simulated peripherals, an in-memory readings
//! table and an off-screen e-paper panel. Simulated time advances one second
//! per loop iteration with no sleeping, so ten simulated minutes finish
//! instantly.
//!
//! # Environment
//!
//! | Variable      | Meaning                                               |
//! |---------------|-------------------------------------------------------|
//! | `RUST_LOG`    | Log filter, e.g. `debug`                              |
//! | `SIM_MINUTES` | Simulated run time in minutes (default 10)            |
//! | `SIM_MISSING` | Comma separated parts that fail to initialize         |
//! | `SIM_OUTPUT`  | PNG of the final display (default `epaper.png`, `none` disables) |
//! | `SIM_CONFIG`  | Path to a postcard encoded tracker config             |

mod peripherals;

use std::env;
use std::path::PathBuf;

use chrono::{NaiveDate, TimeDelta, Utc};
use log::{error, info, warn};

use gnss_tracker_core::app_state::{dispatch, share, with_tracker};
use gnss_tracker_core::config::TrackerConfig;
use gnss_tracker_core::hardware::TrackerHardware;
use gnss_tracker_core::storage::MemoryTable;
use gnss_tracker_core::tracker::{TrackerContext, TrackerController, TrackerEvent};

use peripherals::{
    Scheduler, SimTime, SimulatedClock, SimulatedEpaper, SimulatedPeripheral, SimulatedReceiver,
    Source, gnss_burst, sample,
};

const DEFAULT_MINUTES: u64 = 10;

fn load_config() -> TrackerConfig {
    let Ok(path) = env::var("SIM_CONFIG") else {
        return TrackerConfig::default();
    };

    match std::fs::read(&path) {
        Ok(bytes) => match TrackerConfig::from_bytes(&bytes) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}: {}, using defaults", path, e);
                TrackerConfig::default()
            }
        },
        Err(e) => {
            warn!("Cannot read {}: {}, using defaults", path, e);
            TrackerConfig::default()
        }
    }
}

fn main() {
    env_logger::init();
    info!("Starting GNSS tracker simulator");

    let minutes = env::var("SIM_MINUTES")
        .ok()
        .and_then(|m| m.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MINUTES);
    let missing = env::var("SIM_MISSING").unwrap_or_default();
    let is_present = |name: &str| !missing.split(',').any(|m| m.trim().eq_ignore_ascii_case(name));
    let output = match env::var("SIM_OUTPUT") {
        Ok(path) if path == "none" => None,
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => Some(PathBuf::from("epaper.png")),
    };

    let time = SimTime::default();
    let scheduler = Scheduler::default();

    // Bring up every part the board could carry; absent ones are skipped.
    let mut hardware = TrackerHardware::new();
    for (name, source) in [
        ("BME688", Source::Atmospheric),
        ("SCD40", Source::Co2),
        ("BMI270", Source::Motion),
        ("ADC", Source::Voltage),
    ] {
        hardware.attach(SimulatedPeripheral::init(
            name,
            source,
            is_present(name),
            &scheduler,
            &time,
        ));
    }
    let (receiver, gnss_running) = SimulatedReceiver::new();
    hardware.attach_gnss(Ok(receiver));

    // The RTC has lost power and boots at the epoch of its calendar.
    let rtc_boot = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let satellite_start = Utc::now().naive_utc();

    let mut tracker = TrackerController::new(TrackerContext {
        hardware,
        panel: Some(SimulatedEpaper::new()),
        table: Some(MemoryTable::new()),
        clock: SimulatedClock::new(&time, rtc_boot),
        config: load_config(),
    });

    if let Err(e) = tracker.initialize().and_then(|()| tracker.run()) {
        error!("Tracker failed to start: {}", e);
        return;
    }
    let shared = share(tracker);

    let total_secs = minutes * 60;
    info!("Simulating {} minutes", minutes);
    for t in 0..=total_secs {
        time.set(t);

        for source in scheduler.due(t) {
            for reading in sample(source, t) {
                if let Err(e) = dispatch(&shared, TrackerEvent::Reading(reading)) {
                    error!("{}", e);
                }
            }
        }

        if gnss_running.get() {
            let satellite_utc = satellite_start + TimeDelta::seconds(t as i64);
            for sentence in gnss_burst(t, satellite_utc) {
                if let Err(e) = dispatch(&shared, TrackerEvent::Gnss(sentence)) {
                    error!("{}", e);
                }
            }
        }
    }

    let summary = with_tracker(&shared, |tracker| {
        tracker.stop();
        let rows = tracker.database_mut().map(|db| db.retrieve());

        if let Some(display) = tracker.display() {
            let panel = display.panel();
            info!("{} display refreshes", panel.refreshes());
            if let Some(path) = &output {
                match panel.save_png(path) {
                    Ok(()) => info!("Final display written to {}", path.display()),
                    Err(e) => error!("Cannot write {}: {:?}", path.display(), e),
                }
            }
        }
        rows
    });

    match summary {
        Ok(Some(Ok(rows))) => info!("{} readings stored", rows),
        Ok(Some(Err(e))) => error!("Reading back the table failed: {}", e),
        Ok(None) => warn!("Readings were not stored"),
        Err(e) => error!("{}", e),
    }

    info!("Simulator exiting");
}
