//! Text patterns used to recognize dates, times, venues and boilerplate.
//!
//! All patterns live in a [`PatternTable`] that is compiled once and shared
//! read-only between the parser and the finalizer.
//!
//! # Example
//!
//! ```
//! use calbot_core::patterns::PatternTable;
//!
//! let patterns = PatternTable::shared();
//! let header = patterns.match_date_header("Friday – Sunday, May 10-12").unwrap();
//! assert_eq!(header.start_weekday, "Friday");
//! assert_eq!(header.end_weekday.as_deref(), Some("Sunday"));
//! ```

use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Section headings such as `Friday, May 10` or `Saturday & Sunday, May 11 & 12`.
const DATE_HEADER_PATTERN: &str = r"(?x)
    ^(?P<start>Thursday|Friday|Saturday|Sunday)
    (?:\s*(?:-|–|&)\s*(?P<end>Thursday|Friday|Saturday|Sunday))?
    ,\s*
    (?P<month>January|February|March|April|May|June|July|August|September|October|November|December)
    \s*(?P<first_day>[1-9][0-9]*)
    (?:\s*(?:-|–|&)\s*(?P<last_day>[1-9][0-9]*))?$
";

/// Clock times such as `6 p.m.`, `11 a.m. - 6 p.m.`, `7-9 p.m. Friday`.
const TIME_PATTERN: &str = r"(?x)
    \b(?P<start_hour>1[0-2]|[1-9])(?::(?P<start_minute>[0-5][0-9]))?
    (?:\s*(?P<start_meridiem>[aApP])\.?[mM](?:\.|\b))?
    (?:\s*(?:-|–|—|to)\s*(?P<end_hour>1[0-2]|[1-9])(?::(?P<end_minute>[0-5][0-9]))?)?
    \s+(?P<meridiem>[aApP])\.?[mM](?:\.|\b)
    (?:(?:\s+on)?\s+(?:Thursday|Friday|Saturday|Sunday))?
";

/// `<title> at|in [the] <venue>`; the greedy prefix picks the rightmost venue marker.
const LOCATION_PATTERN: &str = r"(?s)^(?P<title>.*) (?:at|in) (?:the )?(?P<location>.*)$";

/// Generic anchor text that carries no description of its own.
const CALL_TO_ACTION_PATTERN: &str = r"(?i)\blearn more here\b";

static SHARED: LazyLock<Arc<PatternTable>> = LazyLock::new(|| Arc::new(PatternTable::new()));

/// Morning or afternoon half of a 12-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    fn from_letter(letter: &str) -> Self {
        if letter.eq_ignore_ascii_case("p") {
            Self::Pm
        } else {
            Self::Am
        }
    }

    /// Converts a 12-hour clock hour (1 to 12) to a 24-hour one.
    pub fn to_24h(self, hour: u32) -> u32 {
        match (self, hour) {
            (Self::Am, 12) => 0,
            (Self::Am, h) => h,
            (Self::Pm, 12) => 12,
            (Self::Pm, h) => h + 12,
        }
    }
}

/// A recognized section heading.
///
/// Only the weekday names are used to place the section in time; the month
/// and day numbers are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateHeader {
    pub start_weekday: String,
    pub end_weekday: Option<String>,
    pub month: String,
    pub first_day: u32,
    pub last_day: Option<u32>,
}

/// A 12-hour clock reading as written in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub hour: u32,
    /// `None` when written without minutes, as in `7 p.m.`.
    pub minute: Option<u32>,
}

/// A time or time range found in a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeMatch {
    pub start: ClockReading,
    /// Explicit meridiem on the start time, as in `11 a.m. - 6 p.m.`.
    pub start_meridiem: Option<Meridiem>,
    pub end: Option<ClockReading>,
    /// The trailing meridiem; applies to the end time, or to the start time
    /// when there is no range.
    pub meridiem: Meridiem,
}

/// The compiled pattern set.
#[derive(Debug, Clone)]
pub struct PatternTable {
    date_header: Regex,
    time: Regex,
    location: Regex,
    call_to_action: Regex,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternTable {
    /// Compiles the pattern set.
    pub fn new() -> Self {
        Self {
            date_header: Regex::new(DATE_HEADER_PATTERN).expect("Invalid date header regex"),
            time: Regex::new(TIME_PATTERN).expect("Invalid time regex"),
            location: Regex::new(LOCATION_PATTERN).expect("Invalid location regex"),
            call_to_action: Regex::new(CALL_TO_ACTION_PATTERN)
                .expect("Invalid call-to-action regex"),
        }
    }

    /// Returns the process-wide table, compiled on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Matches a whole heading text against the date-header pattern.
    pub fn match_date_header(&self, text: &str) -> Option<DateHeader> {
        let caps = self.date_header.captures(text.trim())?;
        Some(DateHeader {
            start_weekday: caps["start"].to_string(),
            end_weekday: caps.name("end").map(|m| m.as_str().to_string()),
            month: caps["month"].to_string(),
            first_day: caps["first_day"].parse().ok()?,
            last_day: caps.name("last_day").and_then(|m| m.as_str().parse().ok()),
        })
    }

    /// Finds the first time or time range in `text`.
    pub fn match_time(&self, text: &str) -> Option<TimeMatch> {
        let caps = self.time.captures(text)?;
        let reading = |hour: &str, minute: &str| -> Option<ClockReading> {
            let hour = caps.name(hour)?.as_str().parse().ok()?;
            let minute = match caps.name(minute) {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            };
            Some(ClockReading { hour, minute })
        };

        Some(TimeMatch {
            start: reading("start_hour", "start_minute")?,
            start_meridiem: caps
                .name("start_meridiem")
                .map(|m| Meridiem::from_letter(m.as_str())),
            end: reading("end_hour", "end_minute"),
            meridiem: Meridiem::from_letter(&caps["meridiem"]),
        })
    }

    /// Splits `Title at the Venue` into `("Title", "Venue")`.
    pub fn split_location(&self, title: &str) -> Option<(String, String)> {
        let caps = self.location.captures(title)?;
        Some((
            caps["title"].trim().to_string(),
            caps["location"].trim().to_string(),
        ))
    }

    /// Returns true if anchor text is generic call-to-action boilerplate.
    pub fn is_call_to_action(&self, text: &str) -> bool {
        self.call_to_action.is_match(text)
    }
}

/// Days from the publication Thursday to a heading weekday.
///
/// Returns `None` for any weekday outside Thursday to Sunday.
pub fn weekday_offset(weekday: &str) -> Option<u64> {
    match weekday.to_ascii_lowercase().as_str() {
        "thursday" => Some(0),
        "friday" => Some(1),
        "saturday" => Some(2),
        "sunday" => Some(3),
        _ => None,
    }
}
