//! Time-unit arithmetic for expression time windows (§6).
//!
//! [`TimeUnit`] names the units a [`crate::expr::condition::Condition`]
//! time window may be expressed in. `unit.duration(within)` turns `(within,
//! unit)` into a [`chrono::Duration`] the evaluator can add/subtract from an
//! anchor's timestamp. Unknown units (there are none representable in this
//! enum, by construction) yield a zero duration per spec.

use chrono::Duration;

/// A unit of time a time-window quantity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TimeUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
}

impl TimeUnit {
    /// Convert `within` units of `self` into a [`chrono::Duration`].
    ///
    /// Years are approximated as 365 days and months as 30 days, per §6 —
    /// this is a deliberately coarse calendar model; callers needing
    /// calendar-accurate month/year arithmetic should pre-convert to days.
    #[must_use]
    pub fn duration(self, within: i64) -> Duration {
        match self {
            Self::Year => Duration::days(within.saturating_mul(365)),
            Self::Month => Duration::days(within.saturating_mul(30)),
            Self::Day => Duration::days(within),
            Self::Hour => Duration::hours(within),
            Self::Minute => Duration::minutes(within),
            Self::Second => Duration::seconds(within),
            Self::Millisecond => Duration::milliseconds(within),
            Self::Microsecond => Duration::microseconds(within),
        }
    }
}

/// A concrete time window: `within` units of `unit`, resolved to a
/// [`chrono::Duration`] via [`TimeUnit::duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeWindow {
    pub within: i64,
    pub unit: TimeUnit,
}

impl TimeWindow {
    #[must_use]
    pub fn new(within: i64, unit: TimeUnit) -> Self {
        Self { within, unit }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.unit.duration(self.within)
    }
}
