//! GNSS payload types
//!
//! The receiver driver parses NMEA sentences; this module only models the
//! already-parsed payloads it hands to the application, one variant per
//! sentence type.

use alloc::vec::Vec;
use chrono::NaiveDateTime;
use core::fmt;

/// Tenths of an arc-second in one degree.
const TENTHS_PER_DEGREE: f64 = 36_000.0;

/// A latitude or longitude in signed decimal degrees.
///
/// Negative values are south / west.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const fn from_degrees(degrees: f64) -> Self {
        Self(degrees)
    }

    /// Build an angle from degrees, minutes and seconds.
    pub fn from_dms(degrees: u16, minutes: u8, seconds: f32, negative: bool) -> Self {
        let value = degrees as f64 + minutes as f64 / 60.0 + seconds as f64 / 3600.0;
        Self(if negative { -value } else { value })
    }

    pub const fn degrees(self) -> f64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    /// Split into whole degrees, whole minutes and tenths of a second.
    ///
    /// Rounding happens once on the total so `59.96"` carries into the
    /// minutes instead of printing as `60.0"`.
    pub fn dms(self) -> (u32, u32, u32) {
        let magnitude = if self.0 < 0.0 { -self.0 } else { self.0 };
        let total_tenths = (magnitude * TENTHS_PER_DEGREE + 0.5) as u64;
        let degrees = total_tenths / 36_000;
        let minutes = (total_tenths % 36_000) / 600;
        let tenths = total_tenths % 600;
        (degrees as u32, minutes as u32, tenths as u32)
    }
}

impl fmt::Display for Angle {
    /// Formats as `19°42'39.0"`, with a leading `-` for south / west.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (degrees, minutes, tenths) = self.dms();
        let sign = if self.is_negative() && (degrees | minutes | tenths) != 0 {
            "-"
        } else {
            ""
        };
        write!(
            f,
            "{}{}°{}'{}.{}\"",
            sign,
            degrees,
            minutes,
            tenths / 10,
            tenths % 10
        )
    }
}

/// Position portion of a fix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub latitude: Option<Angle>,
    pub longitude: Option<Angle>,
    /// Altitude above mean sea level in meters
    pub altitude: Option<f32>,
}

/// A GNSS-derived position/time reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fix {
    /// Receiver status flag (`A` in RMC/GLL, quality > 0 in GGA)
    pub valid: bool,
    pub position: Option<Position>,
    /// UTC date and time of the reading, when the sentence carries a date
    pub time_of_reading: Option<NaiveDateTime>,
}

impl Fix {
    pub fn latitude(&self) -> Option<Angle> {
        self.position.and_then(|p| p.latitude)
    }

    pub fn longitude(&self) -> Option<Angle> {
        self.position.and_then(|p| p.longitude)
    }
}

/// Satellites used for the current fix (GSA).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActiveSatellites {
    pub used_for_fix: Vec<u8>,
}

/// Satellites visible to the receiver (GSV).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SatellitesInView {
    pub count: usize,
}

/// Course and speed over ground (VTG).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CourseOverGround {
    pub true_heading: Option<f32>,
    pub speed_knots: Option<f32>,
}

impl fmt::Display for CourseOverGround {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.true_heading {
            Some(h) => write!(f, "course {:.1}°", h)?,
            None => f.write_str("course --")?,
        }
        match self.speed_knots {
            Some(s) => write!(f, ", speed {:.1} kn", s),
            None => f.write_str(", speed --"),
        }
    }
}

/// One parsed sentence delivered by the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum GnssSentence {
    /// Recommended minimum: position, time and date
    Rmc(Fix),
    /// Geographic position
    Gll(Fix),
    /// Fix data
    Gga(Fix),
    /// Active satellites
    Gsa(ActiveSatellites),
    /// Satellites in view
    Gsv(SatellitesInView),
    /// Track made good and ground speed
    Vtg(CourseOverGround),
}

impl GnssSentence {
    /// Short NMEA mnemonic for log lines.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::Rmc(_) => "RMC",
            Self::Gll(_) => "GLL",
            Self::Gga(_) => "GGA",
            Self::Gsa(_) => "GSA",
            Self::Gsv(_) => "GSV",
            Self::Vtg(_) => "VTG",
        }
    }

    /// The position fix carried by this sentence, if it carries one.
    pub fn fix(&self) -> Option<&Fix> {
        match self {
            Self::Rmc(fix) | Self::Gll(fix) | Self::Gga(fix) => Some(fix),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_angle_formats_as_dms() {
        let lat = Angle::from_dms(19, 42, 39.0, false);
        assert_eq!(lat.to_string(), "19°42'39.0\"");

        let lon = Angle::from_dms(173, 45, 47.9, true);
        assert_eq!(lon.to_string(), "-173°45'47.9\"");
    }

    #[test]
    fn test_angle_rounding_carries_into_minutes() {
        // 10° 0' 59.96" rounds to 10° 1' 0.0"
        let angle = Angle::from_degrees(10.0 + 59.96 / 3600.0);
        assert_eq!(angle.dms(), (10, 1, 0));
    }

    #[test]
    fn test_sentence_fix_access() {
        let fix = Fix {
            valid: true,
            ..Fix::default()
        };
        assert!(GnssSentence::Gll(fix).fix().is_some());
        assert!(GnssSentence::Gsv(SatellitesInView { count: 7 }).fix().is_none());
        assert_eq!(GnssSentence::Rmc(fix).mnemonic(), "RMC");
    }
}
