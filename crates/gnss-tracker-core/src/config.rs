//! Tracker configuration
//!
//! Stored on the device as a postcard blob; every field has a default so a
//! missing or unreadable blob falls back to [`TrackerConfig::default`].

use alloc::vec::Vec;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::sensors::{Capability, CapabilitySet};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config blob could not be decoded")]
    Decode,
    #[error("Config could not be encoded")]
    Encode,
    #[error("Interval for {0} must be non-zero")]
    ZeroInterval(&'static str),
}

/// Sampling interval per peripheral group, in seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingIntervals {
    /// Temperature, humidity, pressure and gas resistance
    pub atmospheric_secs: u32,
    pub co2_secs: u32,
    /// Accelerometer and gyroscope
    pub motion_secs: u32,
    /// Battery and solar inputs
    pub voltage_secs: u32,
}

impl Default for SamplingIntervals {
    fn default() -> Self {
        Self {
            atmospheric_secs: 60,
            co2_secs: 90,
            motion_secs: 5,
            voltage_secs: 300,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub intervals: SamplingIntervals,
    /// Minimum time between GNSS position log lines, in seconds
    pub gnss_report_secs: u32,
    /// Truncate the readings table at startup
    pub reset_database: bool,
    /// Log every stored row after each insert
    pub echo_rows: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            intervals: SamplingIntervals::default(),
            gnss_report_secs: 15,
            reset_database: true,
            echo_rows: false,
        }
    }
}

impl TrackerConfig {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("atmospheric", self.intervals.atmospheric_secs),
            ("co2", self.intervals.co2_secs),
            ("motion", self.intervals.motion_secs),
            ("voltage", self.intervals.voltage_secs),
            ("gnss report", self.gnss_report_secs),
        ];
        match checks.iter().find(|(_, secs)| *secs == 0) {
            Some((name, _)) => Err(ConfigError::ZeroInterval(*name)),
            None => Ok(()),
        }
    }

    /// Sampling interval for a single capability. GNSS runs continuously.
    pub fn interval_for(&self, capability: Capability) -> Option<Duration> {
        let secs = match capability {
            Capability::Temperature
            | Capability::Humidity
            | Capability::Pressure
            | Capability::GasResistance => self.intervals.atmospheric_secs,
            Capability::Co2 => self.intervals.co2_secs,
            Capability::Accelerometer | Capability::Gyroscope => self.intervals.motion_secs,
            Capability::BatteryVoltage | Capability::SolarVoltage => self.intervals.voltage_secs,
            Capability::Gnss => return None,
        };
        Some(Duration::from_secs(secs as u64))
    }

    /// Interval for a peripheral providing several capabilities: the
    /// shortest one, so no capability is sampled slower than configured.
    pub fn interval_for_set(&self, capabilities: CapabilitySet) -> Option<Duration> {
        capabilities.iter().filter_map(|c| self.interval_for(c)).min()
    }

    pub fn gnss_report_interval(&self) -> Duration {
        Duration::from_secs(self.gnss_report_secs as u64)
    }
}
