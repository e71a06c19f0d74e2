//! Time units for motion-capture timestamps and durations.
//!
//! Recordings arrive with timestamps in whatever unit the capture system
//! used (Kinect exports milliseconds, Qualisys seconds, some tools
//! nanoseconds). Everything inside Kinetrace is expressed in seconds; this
//! module converts at the edges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KinetraceError;

/// A unit of time that can be converted to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Number of seconds in one unit.
    pub fn seconds_per_unit(self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1e-9,
            TimeUnit::Microseconds => 1e-6,
            TimeUnit::Milliseconds => 1e-3,
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
        }
    }

    /// Convert a value expressed in this unit to seconds.
    pub fn to_seconds(self, value: f64) -> f64 {
        value * self.seconds_per_unit()
    }

    /// Convert a value in seconds to this unit.
    pub fn from_seconds(self, seconds: f64) -> f64 {
        seconds / self.seconds_per_unit()
    }

    /// Short suffix used when printing and parsing durations.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Hours => "h",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = KinetraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanosecond" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "us" | "µs" | "microsecond" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "millisecond" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "second" | "seconds" => Ok(TimeUnit::Seconds),
            "min" | "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hours),
            other => Err(KinetraceError::time_unit(other)),
        }
    }
}

/// Parse a duration such as `"150ms"`, `"0.2 s"` or `"2"` into seconds.
///
/// A bare number is interpreted in `default_unit`.
pub fn parse_duration_secs(input: &str, default_unit: TimeUnit) -> Result<f64, KinetraceError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| KinetraceError::config(format!("invalid duration: {input:?}")))?;

    let unit = if unit.trim().is_empty() {
        default_unit
    } else {
        unit.parse()?
    };

    Ok(unit.to_seconds(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert!((TimeUnit::Milliseconds.to_seconds(1500.0) - 1.5).abs() < 1e-12);
        assert!((TimeUnit::Minutes.to_seconds(2.0) - 120.0).abs() < 1e-12);
        assert!((TimeUnit::Microseconds.from_seconds(0.5) - 500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_unit_aliases() {
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert_eq!("Seconds".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_parse_duration_with_suffix() {
        let secs = parse_duration_secs("150ms", TimeUnit::Seconds).unwrap();
        assert!((secs - 0.15).abs() < 1e-12);

        let secs = parse_duration_secs("0.2 s", TimeUnit::Milliseconds).unwrap();
        assert!((secs - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_parse_bare_duration_uses_default_unit() {
        let secs = parse_duration_secs("250", TimeUnit::Milliseconds).unwrap();
        assert!((secs - 0.25).abs() < 1e-12);
        assert!(parse_duration_secs("abc", TimeUnit::Seconds).is_err());
    }
}
