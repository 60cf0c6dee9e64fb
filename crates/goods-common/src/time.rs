//! Time handling for CF-style model time coordinates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Parse an ISO 8601 timestamp, assuming UTC when no offset is given.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default()));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// A closed time range for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in milliseconds.
    pub fn millis(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Days => 86_400_000.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(TimeUnit::Hours),
            "d" | "day" | "days" => Ok(TimeUnit::Days),
            other => Err(TimeParseError::UnsupportedUnit(other.to_string())),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        write!(f, "{}", s)
    }
}

/// CF calendars with proleptic Gregorian arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    #[default]
    Standard,
    ProlepticGregorian,
}

impl FromStr for Calendar {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            other => Err(TimeParseError::UnsupportedCalendar(other.to_string())),
        }
    }
}

/// Parsed `"<unit> since <reference timestamp>"` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
    pub calendar: Calendar,
}

impl CfTimeUnits {
    /// Parse a units string with the default calendar.
    pub fn parse(units: &str) -> Result<Self, TimeParseError> {
        Self::parse_with_calendar(units, None)
    }

    /// Parse a units string together with an optional `calendar` attribute.
    pub fn parse_with_calendar(units: &str, calendar: Option<&str>) -> Result<Self, TimeParseError> {
        let calendar = calendar.map(Calendar::from_str).transpose()?.unwrap_or_default();

        let lower = units.to_ascii_lowercase();
        let idx = lower
            .find(" since ")
            .ok_or_else(|| TimeParseError::InvalidUnits(units.to_string()))?;
        let unit: TimeUnit = units[..idx].parse()?;
        let epoch = parse_reference_time(&units[idx + " since ".len()..])
            .ok_or_else(|| TimeParseError::InvalidUnits(units.to_string()))?;

        Ok(Self {
            unit,
            epoch,
            calendar,
        })
    }

    /// Decode a numeric offset into a timestamp (millisecond resolution).
    ///
    /// Fill values and other offsets outside chrono's range are errors.
    pub fn decode(&self, value: f64) -> Result<DateTime<Utc>, TimeParseError> {
        let out_of_range = || TimeParseError::OutOfRange(format!("{} {}", value, self));
        let millis = (value * self.unit.millis()).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| self.epoch.checked_add_signed(offset))
            .ok_or_else(out_of_range)
    }

    /// Encode a timestamp back into a numeric offset.
    pub fn encode(&self, dt: &DateTime<Utc>) -> f64 {
        (*dt - self.epoch).num_milliseconds() as f64 / self.unit.millis()
    }
}

impl fmt::Display for CfTimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} since {}",
            self.unit,
            self.epoch.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn parse_reference_time(s: &str) -> Option<DateTime<Utc>> {
    let mut s = s.trim();
    for suffix in [" UTC", " utc", " GMT", "Z"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.trim_end();
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid CF time units: '{0}'. Expected '<unit> since <timestamp>'")]
    InvalidUnits(String),

    #[error("Unsupported time unit: {0}")]
    UnsupportedUnit(String),

    #[error("Unsupported calendar: {0}")]
    UnsupportedCalendar(String),

    #[error("Time offset out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso8601_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(parse_iso8601("2024-01-15T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_iso8601("2024-01-15T12:00:00").unwrap(), expected);
        assert_eq!(parse_iso8601("2024-01-15 12:00:00").unwrap(), expected);
        assert_eq!(
            parse_iso8601("2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert!(parse_iso8601("yesterday").is_err());
    }

    #[test]
    fn test_cf_units_hours() {
        let units = CfTimeUnits::parse("hours since 2000-01-01 00:00:00").unwrap();
        assert_eq!(units.unit, TimeUnit::Hours);
        assert_eq!(
            units.decode(36.0).unwrap(),
            Utc.with_ymd_and_hms(2000, 1, 2, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cf_units_roms_style() {
        let units = CfTimeUnits::parse("seconds since 2016-01-01 00:00:00 UTC").unwrap();
        assert_eq!(units.unit, TimeUnit::Seconds);
        let dt = Utc.with_ymd_and_hms(2016, 1, 1, 6, 0, 0).unwrap();
        assert_eq!(units.encode(&dt), 21_600.0);
        assert_eq!(units.decode(21_600.0).unwrap(), dt);
    }

    #[test]
    fn test_cf_units_date_only_epoch() {
        let units = CfTimeUnits::parse("days since 1970-01-01").unwrap();
        assert_eq!(
            units.decode(1.5).unwrap(),
            Utc.with_ymd_and_hms(1970, 1, 2, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cf_units_rejects_garbage() {
        assert!(matches!(
            CfTimeUnits::parse("meters"),
            Err(TimeParseError::InvalidUnits(_))
        ));
        assert!(matches!(
            CfTimeUnits::parse("fortnights since 2000-01-01"),
            Err(TimeParseError::UnsupportedUnit(_))
        ));
        assert!(matches!(
            CfTimeUnits::parse_with_calendar("hours since 2000-01-01", Some("noleap")),
            Err(TimeParseError::UnsupportedCalendar(_))
        ));
    }

    #[test]
    fn test_decode_fill_value_is_error() {
        let units = CfTimeUnits::parse("seconds since 2016-01-01 00:00:00").unwrap();
        // NetCDF default double fill value
        assert!(matches!(
            units.decode(9.969209968386869e36),
            Err(TimeParseError::OutOfRange(_))
        ));
        assert!(units.decode(f64::NAN).is_err());
        assert!(units.decode(f64::NEG_INFINITY).is_err());

        // Representable as i64 milliseconds but past chrono's maximum date
        let days = CfTimeUnits::parse("days since 2000-01-01").unwrap();
        assert!(days.decode(1.0e11).is_err());
    }
}
