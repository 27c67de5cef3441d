//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp `secs` seconds earlier.
    pub fn minus_secs(&self, secs: u64) -> Self {
        Self(self.0 - Duration::seconds(secs as i64))
    }

    /// Creates a new timestamp `secs` seconds later.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0 + Duration::seconds(secs as i64))
    }

    /// Daraja-style compact timestamp, `YYYYMMDDHHMMSS`.
    pub fn to_compact(&self) -> String {
        self.0.format("%Y%m%d%H%M%S").to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn minus_and_plus_secs_are_inverse() {
        let ts = Timestamp::now();
        assert_eq!(ts.minus_secs(90).plus_secs(90), ts);
        assert!(ts.minus_secs(1).is_before(&ts));
    }

    #[test]
    fn duration_since_is_signed() {
        let earlier = Timestamp::now();
        let later = earlier.plus_secs(60);
        assert_eq!(later.duration_since(&earlier).num_seconds(), 60);
        assert_eq!(earlier.duration_since(&later).num_seconds(), -60);
    }

    #[test]
    fn compact_format_matches_daraja_layout() {
        let ts = Timestamp::from_datetime(Utc.with_ymd_and_hms(2019, 12, 19, 10, 20, 36).unwrap());
        assert_eq!(ts.to_compact(), "20191219102036");
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-01-02T03:04:05Z\"");
    }
}
