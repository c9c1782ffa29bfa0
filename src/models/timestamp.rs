//! Fixed-format timestamps shared by every record.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, Result};

/// Canonical on-disk format for every timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A second-precision, zone-less timestamp.
///
/// Serialized as `YYYY-MM-DDTHH:MM:SS`. Parsing also accepts a fractional
/// part and a trailing `Z`; both are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Current local time, truncated to seconds.
    pub fn now() -> Self {
        Self::from(Local::now().naive_local())
    }

    /// Parse a timestamp string.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .map(Self::from)
            .map_err(|e| AppError::timestamp(value, e))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        // with_nanosecond(0) is always in range
        Self(value.with_nanosecond(0).unwrap_or(value))
    }
}

impl FromStr for Timestamp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_canonical_format() {
        let ts = Timestamp::parse("2024-03-01T12:30:05").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01T12:30:05");
    }

    #[test]
    fn test_normalizes_fraction_and_zulu() {
        let ts = Timestamp::parse("2024-03-01T12:30:05.250Z").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01T12:30:05");
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::parse("2024-03-01T12:30:05").unwrap();
        let b = Timestamp::parse("2024-03-02T00:00:00").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(AppError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_json_string_form() {
        let ts = Timestamp::parse("2024-03-01T12:30:05").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-03-01T12:30:05\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
