//! Peripheral seams, capability tags and typed readings
//!
//! Vendor drivers live outside this crate. Board firmware wraps each one in a
//! [`Peripheral`] (or [`GnssReceiver`]) and feeds the readings it produces into
//! the tracker as [`Reading`] values.

use core::fmt;

use embassy_time::Duration;
use thiserror_no_std::Error;

use crate::units::{
    Acceleration3, AngularVelocity3, Concentration, Pressure, RelativeHumidity, Resistance,
    Temperature, Voltage,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} failed to start sampling: {details}")]
    StartFailed {
        sensor: &'static str,
        details: &'static str,
    },
}

/// A kind of measurement a peripheral can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    Temperature,
    Humidity,
    Pressure,
    GasResistance,
    Co2,
    Accelerometer,
    Gyroscope,
    BatteryVoltage,
    SolarVoltage,
    Gnss,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Self::Temperature,
        Self::Humidity,
        Self::Pressure,
        Self::GasResistance,
        Self::Co2,
        Self::Accelerometer,
        Self::Gyroscope,
        Self::BatteryVoltage,
        Self::SolarVoltage,
        Self::Gnss,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::GasResistance => "gas-resistance",
            Self::Co2 => "co2",
            Self::Accelerometer => "accelerometer",
            Self::Gyroscope => "gyroscope",
            Self::BatteryVoltage => "battery-voltage",
            Self::SolarVoltage => "solar-voltage",
            Self::Gnss => "gnss",
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of capabilities, discovered once at startup.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn extend(&mut self, other: CapabilitySet) {
        self.0 |= other.0;
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub const fn intersects(self, other: CapabilitySet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for CapabilitySet {
    /// Comma separated labels, e.g. `temperature, humidity`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, capability) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(capability.label())?;
        }
        Ok(())
    }
}

/// Combined output of an atmospheric sensor (BME68x style).
///
/// Any field may be absent when the driver skipped that channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AtmosphericSample {
    pub temperature: Option<Temperature>,
    pub humidity: Option<RelativeHumidity>,
    pub pressure: Option<Pressure>,
    pub gas_resistance: Option<Resistance>,
}

/// A typed reading delivered by a peripheral's update event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Temperature(Temperature),
    Humidity(RelativeHumidity),
    Pressure(Pressure),
    GasResistance(Resistance),
    Atmospheric(AtmosphericSample),
    Co2(Concentration),
    Acceleration(Acceleration3),
    AngularVelocity(AngularVelocity3),
    BatteryVoltage(Voltage),
    SolarVoltage(Voltage),
}

impl Reading {
    /// Capabilities this reading carries values for.
    pub fn capabilities(&self) -> CapabilitySet {
        let set = CapabilitySet::empty();
        match self {
            Self::Temperature(_) => set.with(Capability::Temperature),
            Self::Humidity(_) => set.with(Capability::Humidity),
            Self::Pressure(_) => set.with(Capability::Pressure),
            Self::GasResistance(_) => set.with(Capability::GasResistance),
            Self::Atmospheric(sample) => {
                let mut set = set;
                if sample.temperature.is_some() {
                    set.insert(Capability::Temperature);
                }
                if sample.humidity.is_some() {
                    set.insert(Capability::Humidity);
                }
                if sample.pressure.is_some() {
                    set.insert(Capability::Pressure);
                }
                if sample.gas_resistance.is_some() {
                    set.insert(Capability::GasResistance);
                }
                set
            }
            Self::Co2(_) => set.with(Capability::Co2),
            Self::Acceleration(_) => set.with(Capability::Accelerometer),
            Self::AngularVelocity(_) => set.with(Capability::Gyroscope),
            Self::BatteryVoltage(_) => set.with(Capability::BatteryVoltage),
            Self::SolarVoltage(_) => set.with(Capability::SolarVoltage),
        }
    }
}

impl fmt::Display for Reading {
    /// Log line for one reading, e.g. `Temperature: 21.50°C`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature(t) => write!(f, "Temperature: {:.2}°C", t.celsius()),
            Self::Humidity(h) => write!(f, "Humidity: {:.2}%", h.percent()),
            Self::Pressure(p) => write!(f, "Pressure: {:.2}hPa", p.millibar()),
            Self::GasResistance(r) => write!(f, "Resistance: {:.2}kΩ", r.kiloohms()),
            Self::Atmospheric(sample) => {
                f.write_str("Atmospheric:")?;
                if let Some(t) = sample.temperature {
                    write!(f, " {:.2}°C", t.celsius())?;
                }
                if let Some(h) = sample.humidity {
                    write!(f, " {:.2}%", h.percent())?;
                }
                if let Some(p) = sample.pressure {
                    write!(f, " {:.2}hPa", p.millibar())?;
                }
                if let Some(r) = sample.gas_resistance {
                    write!(f, " {:.2}kΩ", r.kiloohms())?;
                }
                Ok(())
            }
            Self::Co2(c) => write!(f, "CO2: {:.0}ppm", c.ppm()),
            Self::Acceleration(a) => {
                let (x, y, z) = a.in_gravity();
                write!(f, "Accel: [X:{:.2}g Y:{:.2}g Z:{:.2}g]", x, y, z)
            }
            Self::AngularVelocity(w) => write!(
                f,
                "Gyro: [X:{:.2}°/s Y:{:.2}°/s Z:{:.2}°/s]",
                w.x, w.y, w.z
            ),
            Self::BatteryVoltage(v) => write!(f, "Battery: {:.2}V", v.volts()),
            Self::SolarVoltage(v) => write!(f, "Solar: {:.2}V", v.volts()),
        }
    }
}

/// A sampled peripheral that pushes readings at its own interval.
pub trait Peripheral {
    /// Part name used in log lines (e.g. "BME688").
    fn name(&self) -> &'static str;

    /// Capabilities this peripheral provides.
    fn capabilities(&self) -> CapabilitySet;

    /// Start periodic sampling. Readings arrive through the tracker's event entry point.
    fn start_updating(&mut self, interval: Duration) -> Result<(), SensorError>;

    fn stop_updating(&mut self);
}

/// A GNSS receiver running its own continuous parse loop.
pub trait GnssReceiver {
    fn name(&self) -> &'static str;

    fn start_updating(&mut self) -> Result<(), SensorError>;

    fn stop_updating(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_capability_set_membership() {
        let mut set = CapabilitySet::empty();
        assert!(set.is_empty());

        set.insert(Capability::Temperature);
        set.insert(Capability::Gnss);
        set.insert(Capability::Temperature);

        assert_eq!(set.len(), 2);
        assert!(set.contains(Capability::Gnss));
        assert!(!set.contains(Capability::Co2));
        assert_eq!(set.to_string(), "temperature, gnss");
    }

    #[test]
    fn test_partial_atmospheric_reading_capabilities() {
        let reading = Reading::Atmospheric(AtmosphericSample {
            temperature: Some(Temperature::from_celsius(21.5)),
            pressure: Some(Pressure::from_millibar(1000.0)),
            ..AtmosphericSample::default()
        });

        let caps = reading.capabilities();
        assert!(caps.contains(Capability::Temperature));
        assert!(caps.contains(Capability::Pressure));
        assert!(!caps.contains(Capability::Humidity));
    }

    #[test]
    fn test_capability_set_from_iter() {
        let set: CapabilitySet = [Capability::Accelerometer, Capability::Gyroscope]
            .into_iter()
            .collect();
        let other = CapabilitySet::empty().with(Capability::Gyroscope);
        assert!(set.intersects(other));
        assert!(!set.intersects(CapabilitySet::empty().with(Capability::Co2)));
    }

    #[test]
    fn test_reading_log_lines() {
        assert_eq!(
            Reading::Temperature(Temperature::from_celsius(21.5)).to_string(),
            "Temperature: 21.50°C"
        );
        assert_eq!(
            Reading::Co2(Concentration::from_ppm(612.4)).to_string(),
            "CO2: 612ppm"
        );

        let partial = Reading::Atmospheric(AtmosphericSample {
            temperature: Some(Temperature::from_celsius(18.0)),
            humidity: Some(RelativeHumidity::from_percent(55.5)),
            ..AtmosphericSample::default()
        });
        assert_eq!(partial.to_string(), "Atmospheric: 18.00°C 55.50%");
    }
}
