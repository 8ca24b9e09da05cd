//! Date and time ranges for extracted events.
//!
//! This module provides [`DateRange`] for the day (or span of days) an event
//! belongs to, and [`TimeRange`] for the clock-time interval of a single-day
//! event.

use chrono::{Days, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// The calendar day or inclusive span of days an event takes place on.
///
/// `end` is `None` for a single-day event. Once finalized, a multi-day
/// range has its `end` moved one day past the last day so it can be used as
/// an exclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the event.
    pub start: NaiveDate,
    /// Last day of the event, if it spans more than one.
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a range, swapping the bounds if `end` comes before `start`.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        match end {
            Some(end) if end < start => Self {
                start: end,
                end: Some(start),
            },
            _ => Self { start, end },
        }
    }

    /// Creates a single-day range.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: None,
        }
    }

    /// Returns true if the range covers a single day.
    pub fn is_single_day(&self) -> bool {
        self.end.is_none()
    }

    /// Number of days between `start` and `end`, counting both ends.
    pub fn days(&self) -> u64 {
        match self.end {
            None => 1,
            Some(end) => (end - self.start).num_days().unsigned_abs() + 1,
        }
    }

    /// Returns a copy with `end` moved one day later.
    ///
    /// Single-day ranges are returned unchanged.
    pub fn with_exclusive_end(&self) -> Self {
        Self {
            start: self.start,
            end: self.end.and_then(|end| end.checked_add_days(Days::new(1))),
        }
    }
}

/// A clock-time interval on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Creates a range of the given length starting at `start`.
    pub fn from_duration(start: NaiveDateTime, duration: TimeDelta) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    /// Returns the length of this range.
    ///
    /// Negative when the end clock time is earlier than the start, which
    /// happens for ranges that run past midnight.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_swaps_reversed_bounds() {
        let range = DateRange::new(date(2024, 5, 12), Some(date(2024, 5, 10)));
        assert_eq!(range.start, date(2024, 5, 10));
        assert_eq!(range.end, Some(date(2024, 5, 12)));
    }

    #[test]
    fn new_keeps_ordered_bounds() {
        let range = DateRange::new(date(2024, 5, 10), Some(date(2024, 5, 12)));
        assert_eq!(range.start, date(2024, 5, 10));
        assert_eq!(range.days(), 3);
    }

    #[test]
    fn single_day() {
        let range = DateRange::single(date(2024, 5, 9));
        assert!(range.is_single_day());
        assert_eq!(range.days(), 1);
        assert_eq!(range.with_exclusive_end(), range);
    }

    #[test]
    fn exclusive_end_crosses_month() {
        let range = DateRange::new(date(2024, 5, 30), Some(date(2024, 5, 31)));
        assert_eq!(range.with_exclusive_end().end, Some(date(2024, 6, 1)));
    }

    #[test]
    fn time_range_from_duration() {
        let start = date(2024, 5, 9).and_hms_opt(18, 0, 0).unwrap();
        let range = TimeRange::from_duration(start, TimeDelta::hours(1));
        assert_eq!(range.end, date(2024, 5, 9).and_hms_opt(19, 0, 0).unwrap());
        assert_eq!(range.duration(), TimeDelta::hours(1));
    }
}
