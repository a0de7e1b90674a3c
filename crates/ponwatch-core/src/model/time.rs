// ── Device clock values ──

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A wall-clock instant as reported by the OLT (device local time, no zone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceTimestamp(pub NaiveDateTime);

impl DeviceTimestamp {
    /// Seconds since the Unix epoch, reading the device clock as UTC.
    pub fn epoch_seconds(self) -> i64 {
        self.0.and_utc().timestamp()
    }
}

impl fmt::Display for DeviceTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for DeviceTimestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map(Self)
    }
}

impl Serialize for DeviceTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A span between two device instants, rendered as
/// `"D days H hours M minutes S seconds"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpan(pub TimeDelta);

impl TimeSpan {
    pub fn as_secs(self) -> i64 {
        self.0.num_seconds()
    }

    pub fn is_negative(self) -> bool {
        self.0 < TimeDelta::zero()
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::decode::format_duration(self.0))
    }
}

impl Serialize for TimeSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
