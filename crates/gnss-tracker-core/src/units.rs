//! Physical units carried by peripheral readings
//!
//! Each reading type is a thin newtype over `f32` in a fixed base unit, with
//! conversions for the units the display and logs need.

/// Standard atmosphere in millibar.
pub const MILLIBAR_PER_ATMOSPHERE: f32 = 1013.25;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Temperature in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f32);

impl Temperature {
    pub const fn from_celsius(celsius: f32) -> Self {
        Self(celsius)
    }

    pub const fn celsius(self) -> f32 {
        self.0
    }

    pub fn fahrenheit(self) -> f32 {
        self.0 * 9.0 / 5.0 + 32.0
    }
}

/// Relative humidity in percent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RelativeHumidity(f32);

impl RelativeHumidity {
    pub const fn from_percent(percent: f32) -> Self {
        Self(percent)
    }

    pub const fn percent(self) -> f32 {
        self.0
    }
}

/// Barometric pressure, stored in millibar.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pressure(f32);

impl Pressure {
    pub const fn from_millibar(millibar: f32) -> Self {
        Self(millibar)
    }

    pub fn from_standard_atmosphere(atm: f32) -> Self {
        Self(atm * MILLIBAR_PER_ATMOSPHERE)
    }

    pub const fn millibar(self) -> f32 {
        self.0
    }

    pub fn standard_atmosphere(self) -> f32 {
        self.0 / MILLIBAR_PER_ATMOSPHERE
    }
}

/// Electrical resistance in ohms (gas sensor heater plate).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Resistance(f32);

impl Resistance {
    pub const fn from_ohms(ohms: f32) -> Self {
        Self(ohms)
    }

    pub const fn ohms(self) -> f32 {
        self.0
    }

    pub fn kiloohms(self) -> f32 {
        self.0 / 1000.0
    }
}

/// Gas concentration in parts per million.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Concentration(f32);

impl Concentration {
    pub const fn from_ppm(ppm: f32) -> Self {
        Self(ppm)
    }

    pub const fn ppm(self) -> f32 {
        self.0
    }
}

/// Voltage in volts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Voltage(f32);

impl Voltage {
    pub const fn from_volts(volts: f32) -> Self {
        Self(volts)
    }

    pub const fn volts(self) -> f32 {
        self.0
    }
}

/// Three-axis linear acceleration in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Acceleration3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same vector expressed in multiples of standard gravity.
    pub fn in_gravity(self) -> (f32, f32, f32) {
        (
            self.x / STANDARD_GRAVITY,
            self.y / STANDARD_GRAVITY,
            self.z / STANDARD_GRAVITY,
        )
    }
}

/// Three-axis angular velocity in degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngularVelocity3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AngularVelocity3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_temperature_fahrenheit() {
        assert!(close(Temperature::from_celsius(21.5).fahrenheit(), 70.7));
        assert!(close(Temperature::from_celsius(-40.0).fahrenheit(), -40.0));
    }

    #[test]
    fn test_pressure_standard_atmosphere() {
        let p = Pressure::from_millibar(1013.25);
        assert!(close(p.standard_atmosphere(), 1.0));

        let p = Pressure::from_standard_atmosphere(0.5);
        assert!(close(p.millibar(), 506.625));
    }

    #[test]
    fn test_acceleration_in_gravity() {
        let (_, _, z) = Acceleration3::new(0.0, 0.0, STANDARD_GRAVITY).in_gravity();
        assert!(close(z, 1.0));
    }
}
