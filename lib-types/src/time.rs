//! Consensus time.
//!
//! All protocol timestamps are whole seconds since the Unix epoch. Wall-clock
//! time never enters consensus logic; every `TimePoint` in state derives from
//! a block header.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point in consensus time, in seconds since the Unix epoch.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TimePoint(pub u64);

impl TimePoint {
    /// The epoch itself; used as "never happened".
    pub const ZERO: TimePoint = TimePoint(0);

    /// Sentinel for "never" / "already paid"; compares greater than any
    /// reachable block timestamp.
    pub const MAX: TimePoint = TimePoint(u64::MAX);

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn secs(&self) -> u64 {
        self.0
    }

    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn saturating_sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn elapsed_since(&self, earlier: TimePoint) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for TimePoint {
    type Output = TimePoint;

    fn add(self, secs: u64) -> TimePoint {
        TimePoint(self.0.saturating_add(secs))
    }
}

impl Sub<u64> for TimePoint {
    type Output = TimePoint;

    fn sub(self, secs: u64) -> TimePoint {
        TimePoint(self.0.saturating_sub(secs))
    }
}

impl fmt::Debug for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TimePoint::MAX {
            write!(f, "TimePoint(never)")
        } else {
            write!(f, "TimePoint({}s)", self.0)
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TimePoint::MAX {
            f.write_str("never")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_is_a_sentinel() {
        assert!(TimePoint::MAX > TimePoint::from_secs(u64::MAX - 1));
        assert_eq!(TimePoint::MAX.saturating_add_secs(10), TimePoint::MAX);
    }

    #[test]
    fn elapsed_saturates() {
        let early = TimePoint::from_secs(100);
        let late = TimePoint::from_secs(160);
        assert_eq!(late.elapsed_since(early), 60);
        assert_eq!(early.elapsed_since(late), 0);
    }
}
