//! Time scalars: microsecond-precision timestamps, calendar dates and
//! durations. Textual forms go through `chrono`; arithmetic stays on the
//! raw microsecond counts.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::errors::{TemporalError, TemporalResult};

pub const USECS_PER_SEC: i64 = 1_000_000;
pub const USECS_PER_DAY: i64 = 86_400 * USECS_PER_SEC;

/// A timestamp with time zone, stored as microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimestampTz(pub i64);

impl TimestampTz {
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_micros())
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_micros(self.0).unwrap()
    }

    /// Seconds between two timestamps, as used by span distance.
    pub fn seconds_between(self, other: Self) -> f64 {
        (other.0 - self.0).abs() as f64 / USECS_PER_SEC as f64
    }

    pub fn checked_add(self, delta: TsDuration) -> TemporalResult<Self> {
        self.0
            .checked_add(delta.0)
            .map(Self)
            .ok_or(TemporalError::Arithmetic("timestamp overflow"))
    }

    /// Start of the bucket of width `duration` containing `self`, anchored
    /// at `origin`.
    pub fn bucket(self, duration: TsDuration, origin: Self) -> TemporalResult<Self> {
        if duration.0 <= 0 {
            return Err(TemporalError::invariant("bucket width must be positive"));
        }
        let offset = self
            .0
            .checked_sub(origin.0)
            .ok_or(TemporalError::Arithmetic("bucket offset overflow"))?;
        Ok(Self(origin.0 + offset.div_euclid(duration.0) * duration.0))
    }

    pub fn parse(text: &str) -> TemporalResult<Self> {
        let trimmed = text.trim();
        // Full timestamp first, then the date-only shorthand.
        for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f %#z"] {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
            }
        }
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Self::from_datetime(naive.and_utc()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self::from_datetime(
                date.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            ));
        }
        Err(TemporalError::parse(
            format!("invalid timestamp {trimmed:?}"),
            0,
        ))
    }
}

impl fmt::Display for TimestampTz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt = self.to_datetime();
        if self.0 % USECS_PER_SEC == 0 {
            write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S+00"))
        } else {
            write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.6f+00"))
        }
    }
}

/// A calendar date, stored as days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date(pub i32);

impl Date {
    pub fn from_days(days: i32) -> Self {
        Self(days)
    }

    pub fn days(self) -> i32 {
        self.0
    }

    pub fn to_timestamp(self) -> TimestampTz {
        TimestampTz(self.0 as i64 * USECS_PER_DAY)
    }

    pub fn parse(text: &str) -> TemporalResult<Self> {
        let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|_| TemporalError::parse(format!("invalid date {text:?}"), 0))?;
        Ok(Self(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
    }
}

const EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = NaiveDate::from_num_days_from_ce_opt(self.0 + EPOCH_DAYS_FROM_CE).unwrap();
        write!(f, "{}", date.format("%Y-%m-%d"))
    }
}

/// A duration between timestamps, in microseconds. Always finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TsDuration(pub i64);

impl TsDuration {
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds * USECS_PER_SEC)
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes * 60)
    }

    pub fn from_hours(hours: i64) -> Self {
        Self::from_seconds(hours * 3600)
    }

    pub fn from_days(days: i64) -> Self {
        Self(days * USECS_PER_DAY)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl std::ops::Add for TsDuration {
    type Output = TsDuration;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub<TimestampTz> for TimestampTz {
    type Output = TsDuration;

    fn sub(self, rhs: TimestampTz) -> TsDuration {
        TsDuration(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(text: &str) -> TimestampTz {
        TimestampTz::parse(text).unwrap()
    }

    #[test]
    fn parse_and_print_round_trip() {
        let t = ts("2000-01-01 08:30:00+00");
        assert_eq!(t.to_string(), "2000-01-01 08:30:00+00");
        assert_eq!(ts("2000-01-01"), ts("2000-01-01 00:00:00+00"));
        TimestampTz::parse("not a time").unwrap_err();
    }

    #[test]
    fn bucket_floors_toward_origin() {
        let origin = ts("2000-01-01");
        let hour = TsDuration::from_hours(1);

        let in_bucket = ts("2000-01-01 08:37:12+00");
        assert_eq!(
            in_bucket.bucket(hour, origin).unwrap(),
            ts("2000-01-01 08:00:00+00")
        );

        // Timestamps before the origin land in the bucket below, not at it.
        let before = ts("1999-12-31 23:59:00+00");
        assert_eq!(
            before.bucket(hour, origin).unwrap(),
            ts("1999-12-31 23:00:00+00")
        );
    }

    #[test]
    fn date_epoch_alignment() {
        let date = Date::parse("1970-01-01").unwrap();
        assert_eq!(date.days(), 0);
        assert_eq!(date.to_string(), "1970-01-01");
        assert_eq!(Date::parse("2000-01-01").unwrap().to_timestamp(), ts("2000-01-01"));
    }
}
