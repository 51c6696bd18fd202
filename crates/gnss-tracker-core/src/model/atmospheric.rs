use chrono::NaiveDateTime;

use crate::sensors::AtmosphericSample;
use crate::units::{Pressure, RelativeHumidity, Resistance, Temperature};

/// Last known atmospheric conditions.
///
/// Each field keeps its last value until a reading carrying that field arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AtmosphericModel {
    pub timestamp: Option<NaiveDateTime>,
    pub temperature: Option<Temperature>,
    pub humidity: Option<RelativeHumidity>,
    pub pressure: Option<Pressure>,
    pub gas_resistance: Option<Resistance>,
}

impl AtmosphericModel {
    pub fn from_sample(sample: &AtmosphericSample, at: NaiveDateTime) -> Self {
        Self {
            timestamp: Some(at),
            temperature: sample.temperature,
            humidity: sample.humidity,
            pressure: sample.pressure,
            gas_resistance: sample.gas_resistance,
        }
    }

    /// Overwrite only the fields present in `newer`.
    pub fn update(&mut self, newer: &AtmosphericModel) {
        if let Some(time) = newer.timestamp {
            self.timestamp = Some(time);
        }
        if let Some(temperature) = newer.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(humidity) = newer.humidity {
            self.humidity = Some(humidity);
        }
        if let Some(pressure) = newer.pressure {
            self.pressure = Some(pressure);
        }
        if let Some(resistance) = newer.gas_resistance {
            self.gas_resistance = Some(resistance);
        }
    }
}
