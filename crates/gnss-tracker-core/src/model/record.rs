use alloc::string::{String, ToString};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::CurrentConditions;

/// One row of the readings table.
///
/// Appended once per sensor or GNSS event and never updated in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SensorRecord {
    /// Assigned by the table on insert
    pub id: u32,
    /// Seconds since the Unix epoch, UTC
    pub timestamp_utc: i64,
    pub temperature_c: Option<f64>,
    pub relative_humidity_percent: Option<f64>,
    pub pressure_atmos: Option<f64>,
    /// Degrees/minutes/seconds text, e.g. `19°42'39.0"`
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl SensorRecord {
    /// Snapshot the aggregate into a row stamped with `timestamp`.
    pub fn from_conditions(conditions: &CurrentConditions, timestamp: NaiveDateTime) -> Self {
        let atmospheric = &conditions.atmospheric;
        Self {
            id: 0,
            timestamp_utc: timestamp.and_utc().timestamp(),
            temperature_c: atmospheric.temperature.map(|t| t.celsius() as f64),
            relative_humidity_percent: atmospheric.humidity.map(|h| h.percent() as f64),
            pressure_atmos: atmospheric.pressure.map(|p| p.standard_atmosphere() as f64),
            latitude: conditions.location.latitude().map(|a| a.to_string()),
            longitude: conditions.location.longitude().map(|a| a.to_string()),
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(self.timestamp_utc, 0).map(|dt| dt.naive_utc())
    }
}
