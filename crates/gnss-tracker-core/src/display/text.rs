//! Display line formatting
//!
//! Labels are padded so the values of the atmospheric rows line up in the
//! monospace font. Missing values render as `--`.

use core::fmt::Write;

use heapless::String;

use crate::gnss::Angle;
use crate::units::{Pressure, RelativeHumidity, Temperature};

/// Longest line: `Lon: -173°45'47.9"` plus headroom.
pub const MAX_LINE_LENGTH: usize = 32;

pub type Line = String<MAX_LINE_LENGTH>;

const MISSING: &str = "--";

fn line(label: &str) -> Line {
    let mut line = Line::new();
    line.push_str(label).ok();
    line
}

pub fn temperature_line(temperature: Option<Temperature>) -> Line {
    let mut line = line("Temp:     ");
    match temperature {
        Some(t) => write!(line, "{:.2}°C", t.celsius()).ok(),
        None => line.push_str(MISSING).ok(),
    };
    line
}

pub fn humidity_line(humidity: Option<RelativeHumidity>) -> Line {
    let mut line = line("Humidity: ");
    match humidity {
        Some(h) => write!(line, "{:.2}%", h.percent()).ok(),
        None => line.push_str(MISSING).ok(),
    };
    line
}

pub fn pressure_line(pressure: Option<Pressure>) -> Line {
    let mut line = line("Pressure: ");
    match pressure {
        Some(p) => write!(line, "{:.2}atm", p.standard_atmosphere()).ok(),
        None => line.push_str(MISSING).ok(),
    };
    line
}

fn angle_line(label: &str, angle: Option<Angle>) -> Line {
    let mut line = line(label);
    match angle {
        Some(a) => write!(line, "{}", a).ok(),
        None => line.push_str(MISSING).ok(),
    };
    line
}

pub fn latitude_line(latitude: Option<Angle>) -> Line {
    angle_line("Lat: ", latitude)
}

pub fn longitude_line(longitude: Option<Angle>) -> Line {
    angle_line("Lon: ", longitude)
}

/// Refresh counter, zero padded to four digits.
pub fn counter_text(count: u32) -> String<10> {
    let mut text = String::new();
    write!(text, "{:04}", count).ok();
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atmospheric_lines() {
        assert_eq!(
            temperature_line(Some(Temperature::from_celsius(21.5))).as_str(),
            "Temp:     21.50°C"
        );
        assert_eq!(
            humidity_line(Some(RelativeHumidity::from_percent(40.0))).as_str(),
            "Humidity: 40.00%"
        );
        assert_eq!(
            pressure_line(Some(Pressure::from_millibar(1013.25))).as_str(),
            "Pressure: 1.00atm"
        );
    }

    #[test]
    fn test_missing_values_render_as_dashes() {
        assert_eq!(temperature_line(None).as_str(), "Temp:     --");
        assert_eq!(latitude_line(None).as_str(), "Lat: --");
    }

    #[test]
    fn test_position_lines() {
        let lon = Angle::from_dms(173, 45, 47.9, true);
        assert_eq!(longitude_line(Some(lon)).as_str(), "Lon: -173°45'47.9\"");
    }

    #[test]
    fn test_counter_is_zero_padded() {
        assert_eq!(counter_text(7).as_str(), "0007");
        assert_eq!(counter_text(12345).as_str(), "12345");
    }
}
