//! Calendar window granularities.
//!
//! A window contributes two things to a [`TimeWindow`](crate::TimeWindow) counter: the
//! quota used when none is configured, and a label appended to the counting key. The
//! label changes when the calendar window changes, so a new window addresses a fresh
//! counter without any reset or expiry logic.
//!
//! Labels are formatted from wall-clock time in a [`WindowZone`]: the process's local
//! zone by default, or UTC / a fixed offset when every node must agree on boundaries.
//!
//! | Window | Default quota | Label |
//! |---|---|---|
//! | [`Unwindowed`] | 0 | none |
//! | [`Minute`] | 60 | `2024-05-01T13:07` |
//! | [`Hourly`] | 3600 | `2024-05-01T13` |
//! | [`Daily`] | 86400 | `2024-05-01` |
//! | [`Monthly`] | 100000 | `2024-05` |

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// A fixed counting window.
pub trait Window: Send + Sync + fmt::Debug {
    /// Quota applied when the options configure no `max`.
    fn default_quota(&self) -> u64;

    /// Label of the window containing the wall-clock time `now`, or `None` if the window
    /// never rolls over.
    fn label(&self, now: NaiveDateTime) -> Option<String>;
}

/// Time zone whose calendar decides where windows start and end.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WindowZone {
    /// The process's local zone, so a monthly window rolls over at local midnight on the 1st.
    #[default]
    Local,
    /// Coordinated Universal Time.
    Utc,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl WindowZone {
    /// Wall-clock time of `instant` in this zone.
    pub fn wall_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            WindowZone::Local => instant.with_timezone(&Local).naive_local(),
            WindowZone::Utc => instant.naive_utc(),
            WindowZone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }
}

/// Bare counter with no calendar window and a zero default quota.
///
/// Only useful with an explicit `max`; without one every counted request is denied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Unwindowed;

impl Window for Unwindowed {
    fn default_quota(&self) -> u64 {
        0
    }

    fn label(&self, _now: NaiveDateTime) -> Option<String> {
        None
    }
}

macro_rules! calendar_window {
    ($(#[$doc:meta])* $name:ident, $quota:expr, $format:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Window for $name {
            fn default_quota(&self) -> u64 {
                $quota
            }

            fn label(&self, now: NaiveDateTime) -> Option<String> {
                Some(now.format($format).to_string())
            }
        }
    };
}

calendar_window!(
    /// Counts per calendar minute; 60 requests by default.
    Minute,
    60,
    "%Y-%m-%dT%H:%M"
);
calendar_window!(
    /// Counts per calendar hour; 3600 requests by default.
    Hourly,
    3600,
    "%Y-%m-%dT%H"
);
calendar_window!(
    /// Counts per calendar day; 86400 requests by default.
    Daily,
    86_400,
    "%Y-%m-%d"
);
calendar_window!(
    /// Counts per calendar month; 100000 requests by default.
    Monthly,
    100_000,
    "%Y-%m"
);

/// Window granularity chosen at runtime, e.g. from configuration text.
///
/// Parses from `minute`, `hourly`/`hour`, `daily`/`day` and `monthly`/`month`
/// (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WindowKind {
    Minute,
    Hourly,
    Daily,
    Monthly,
}

impl WindowKind {
    /// Lowercase name, as accepted by `FromStr`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Minute => "minute",
            WindowKind::Hourly => "hourly",
            WindowKind::Daily => "daily",
            WindowKind::Monthly => "monthly",
        }
    }
}

impl Window for WindowKind {
    fn default_quota(&self) -> u64 {
        match self {
            WindowKind::Minute => Minute.default_quota(),
            WindowKind::Hourly => Hourly.default_quota(),
            WindowKind::Daily => Daily.default_quota(),
            WindowKind::Monthly => Monthly.default_quota(),
        }
    }

    fn label(&self, now: NaiveDateTime) -> Option<String> {
        match self {
            WindowKind::Minute => Minute.label(now),
            WindowKind::Hourly => Hourly.label(now),
            WindowKind::Daily => Daily.label(now),
            WindowKind::Monthly => Monthly.label(now),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised window name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown window {0:?} (expected minute, hourly, daily or monthly)")]
pub struct ParseWindowError(String);

impl FromStr for WindowKind {
    type Err = ParseWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(WindowKind::Minute),
            "hourly" | "hour" => Ok(WindowKind::Hourly),
            "daily" | "day" => Ok(WindowKind::Daily),
            "monthly" | "month" => Ok(WindowKind::Monthly),
            _ => Err(ParseWindowError(s.to_string())),
        }
    }
}
