//! World Time
//!
//! Tick/date conversion for the simulated calendar. One tick is one day;
//! months are 30 days and years are 12 months (360 days). Dates are
//! 1-based: tick 0 is year 1, month 1, day 1.
//!
//! # Example
//!
//! ```
//! use world_events::{ticks_to_world_time, world_time_to_ticks, Season, WorldTime};
//!
//! let time = ticks_to_world_time(365);
//! assert_eq!(time, WorldTime::new(2, 1, 6));
//! assert_eq!(world_time_to_ticks(time), 365);
//! assert_eq!(time.season(), Season::Spring);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Number of days in each month.
pub const DAYS_PER_MONTH: u64 = 30;

/// Number of months in each year.
pub const MONTHS_PER_YEAR: u64 = 12;

/// Number of days in each year.
pub const DAYS_PER_YEAR: u64 = DAYS_PER_MONTH * MONTHS_PER_YEAR;

/// Season of the year, derived from the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Returns the season a given month (1-12) falls in.
    pub fn of_month(month: u8) -> Season {
        match month {
            1..=3 => Season::Spring,
            4..=6 => Season::Summer,
            7..=9 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Returns the next season in order.
    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Spring => write!(f, "spring"),
            Season::Summer => write!(f, "summer"),
            Season::Autumn => write!(f, "autumn"),
            Season::Winter => write!(f, "winter"),
        }
    }
}

/// A calendar date in the simulated world.
///
/// Ordering is chronological (year, then month, then day).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorldTime {
    /// Year, starting at 1.
    pub year: u32,
    /// Month within the year, 1-12.
    pub month: u8,
    /// Day within the month, 1-30.
    pub day: u8,
}

impl WorldTime {
    /// Creates a new date. Month and day are clamped into calendar range.
    pub fn new(year: u32, month: u8, day: u8) -> Self {
        Self {
            year: year.max(1),
            month: month.clamp(1, MONTHS_PER_YEAR as u8),
            day: day.clamp(1, DAYS_PER_MONTH as u8),
        }
    }

    /// The date at tick 0.
    pub fn start() -> Self {
        Self { year: 1, month: 1, day: 1 }
    }

    /// Season this date falls in.
    pub fn season(&self) -> Season {
        Season::of_month(self.month)
    }
}

impl fmt::Display for WorldTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year_{}.month_{:02}.day_{:02}", self.year, self.month, self.day)
    }
}

/// Converts a date to its tick (day) number.
pub fn world_time_to_ticks(time: WorldTime) -> u64 {
    let years = (time.year.max(1) - 1) as u64;
    let months = (time.month.max(1) - 1) as u64;
    let days = (time.day.max(1) - 1) as u64;
    years * DAYS_PER_YEAR + months * DAYS_PER_MONTH + days
}

/// Converts a tick (day) number to its calendar date.
pub fn ticks_to_world_time(tick: u64) -> WorldTime {
    let year = tick / DAYS_PER_YEAR;
    let rem = tick % DAYS_PER_YEAR;
    let month = rem / DAYS_PER_MONTH;
    let day = rem % DAYS_PER_MONTH;
    WorldTime {
        year: year as u32 + 1,
        month: month as u8 + 1,
        day: day as u8 + 1,
    }
}

/// Adds (or, when negative, subtracts) a number of days to a date.
///
/// Saturates at tick 0.
pub fn add_days(time: WorldTime, days: i64) -> WorldTime {
    let tick = world_time_to_ticks(time) as i64;
    ticks_to_world_time(tick.saturating_add(days).max(0) as u64)
}

/// Chronological comparison of two dates.
pub fn compare_times(a: WorldTime, b: WorldTime) -> Ordering {
    a.cmp(&b)
}

/// Signed number of days from `b` to `a`.
pub fn time_difference_in_days(a: WorldTime, b: WorldTime) -> i64 {
    world_time_to_ticks(a) as i64 - world_time_to_ticks(b) as i64
}

/// Season a date falls in.
pub fn get_season(time: WorldTime) -> Season {
    time.season()
}

/// Renders a date as a display string.
pub fn format_time(time: WorldTime) -> String {
    time.to_string()
}

/// The first day of a date's year.
pub fn start_of_year(time: WorldTime) -> WorldTime {
    WorldTime { year: time.year, month: 1, day: 1 }
}

/// True when both dates name the same day. Ticks are day-granular, so this
/// is plain equality.
pub fn is_same_day(a: WorldTime, b: WorldTime) -> bool {
    a == b
}
