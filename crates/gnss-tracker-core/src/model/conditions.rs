use chrono::NaiveDateTime;

use super::{AtmosphericModel, LocationModel};
use crate::gnss::Fix;
use crate::sensors::Reading;
use crate::units::{Acceleration3, AngularVelocity3, Concentration, Voltage};

/// Merged view of the most recent reading from every peripheral.
///
/// Readings are merged field by field: a reading only touches the fields it
/// carries and everything else keeps its last known value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CurrentConditions {
    pub atmospheric: AtmosphericModel,
    pub location: LocationModel,
    pub co2: Option<Concentration>,
    pub acceleration: Option<Acceleration3>,
    pub angular_velocity: Option<AngularVelocity3>,
    pub battery_voltage: Option<Voltage>,
    pub solar_voltage: Option<Voltage>,
}

impl CurrentConditions {
    pub fn apply(&mut self, reading: &Reading, at: NaiveDateTime) {
        let mut atmospheric = AtmosphericModel {
            timestamp: Some(at),
            ..AtmosphericModel::default()
        };

        match *reading {
            Reading::Temperature(t) => atmospheric.temperature = Some(t),
            Reading::Humidity(h) => atmospheric.humidity = Some(h),
            Reading::Pressure(p) => atmospheric.pressure = Some(p),
            Reading::GasResistance(r) => atmospheric.gas_resistance = Some(r),
            Reading::Atmospheric(ref sample) => {
                atmospheric = AtmosphericModel::from_sample(sample, at);
            }
            Reading::Co2(c) => {
                self.co2 = Some(c);
                return;
            }
            Reading::Acceleration(a) => {
                self.acceleration = Some(a);
                return;
            }
            Reading::AngularVelocity(w) => {
                self.angular_velocity = Some(w);
                return;
            }
            Reading::BatteryVoltage(v) => {
                self.battery_voltage = Some(v);
                return;
            }
            Reading::SolarVoltage(v) => {
                self.solar_voltage = Some(v);
                return;
            }
        }

        self.atmospheric.update(&atmospheric);
    }

    pub fn set_fix(&mut self, fix: Fix) {
        self.location.fix = Some(fix);
    }
}
