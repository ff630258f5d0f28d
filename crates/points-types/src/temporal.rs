use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock timestamp in milliseconds since the UNIX epoch.
///
/// Timestamps attached to a single user's mutations are non-decreasing: the
/// ledger stamps each mutation with [`Timestamp::not_before`] the previous
/// one, so a clock stepping backwards never reorders a user's history.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// The zero timestamp, used for users that were never written.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns `self`, raised to `floor` if it would otherwise go backwards.
    pub fn not_before(self, floor: Timestamp) -> Self {
        self.max(floor)
    }

    /// UTC calendar time, or `None` if the value is out of chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::try_from(self.0).ok()?)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_produces_reasonable_timestamp() {
        // Should be after 2020-01-01 (1577836800000 ms)
        assert!(Timestamp::now().as_millis() > 1_577_836_800_000);
    }

    #[test]
    fn not_before_clamps_backwards_clock() {
        let prev = Timestamp::from_millis(2_000);
        assert_eq!(Timestamp::from_millis(1_000).not_before(prev), prev);
        assert_eq!(
            Timestamp::from_millis(3_000).not_before(prev),
            Timestamp::from_millis(3_000)
        );
    }

    #[test]
    fn zero_is_smallest() {
        assert!(Timestamp::zero() < Timestamp::from_millis(1));
        assert_eq!(Timestamp::default(), Timestamp::zero());
    }

    #[test]
    fn display_format() {
        let ts = Timestamp::from_millis(1_000);
        assert_eq!(ts.to_string(), "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn out_of_range_display_falls_back_to_millis() {
        let ts = Timestamp::from_millis(u64::MAX);
        assert_eq!(ts.to_string(), format!("{}ms", u64::MAX));
    }
}
