//! Timestamp precision handling for the write path.
//!
//! `Precision` governs how an integer timestamp on a batch or point is
//! interpreted; everything downstream of normalization is nanoseconds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl Precision {
    /// Nanoseconds per unit of this precision.
    pub fn factor(self) -> i64 {
        match self {
            Precision::Nanoseconds => 1,
            Precision::Microseconds => 1_000,
            Precision::Milliseconds => 1_000_000,
            Precision::Seconds => 1_000_000_000,
            Precision::Minutes => 60 * 1_000_000_000,
            Precision::Hours => 3600 * 1_000_000_000,
        }
    }

    /// Convert a raw integer timestamp in this precision to nanoseconds.
    pub fn to_nanos(self, value: i64) -> i64 {
        value.saturating_mul(self.factor())
    }

    /// Truncate a nanosecond timestamp down to this precision, then express
    /// the result back in nanoseconds (used by the round-trip invariant:
    /// encode at precision P, decode, compare against T truncated to P).
    pub fn truncate_nanos(self, nanos: i64) -> i64 {
        let f = self.factor();
        (nanos / f) * f
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Nanoseconds
    }
}

impl FromStr for Precision {
    type Err = UnknownPrecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" => Ok(Precision::Nanoseconds),
            "u" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            other => Err(UnknownPrecision(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown timestamp precision {0:?}, expected one of n|u|ms|s|m|h")]
pub struct UnknownPrecision(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_to_nanos() {
        assert_eq!(Precision::Seconds.to_nanos(1_700_000_000), 1_700_000_000_000_000_000);
    }

    #[test]
    fn round_trip_truncation() {
        let nanos = 1_700_000_000_123_456_789;
        let truncated = Precision::Milliseconds.truncate_nanos(nanos);
        assert_eq!(truncated, 1_700_000_000_123_000_000);
    }

    #[test]
    fn rejects_unknown_precision() {
        assert!("fortnights".parse::<Precision>().is_err());
    }
}
