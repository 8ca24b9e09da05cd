//! Derivation of structured fields from a draft's free text.
//!
//! A [`Finalizer`] turns each [`DraftEvent`] into an [`Event`]:
//! 1. The title is trimmed; drafts with an empty title are dropped.
//! 2. `Title at the Venue` is split into title and location.
//! 3. The trimmed body becomes the description.
//! 4. Single-day events get a clock time from the first time expression in
//!    the description (one hour long when no end is given).
//! 5. Multi-day events get an exclusive end date instead.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use tracing::{debug, trace};

use crate::event::{DraftEvent, Event};
use crate::patterns::{ClockReading, Meridiem, PatternTable, TimeMatch};
use crate::time::TimeRange;

/// Length in hours given to events that only state a start time.
pub const DEFAULT_DURATION_HOURS: i64 = 1;

#[derive(Debug, Clone)]
pub struct Finalizer {
    patterns: Arc<PatternTable>,
}

impl Default for Finalizer {
    fn default() -> Self {
        Self::new(PatternTable::shared())
    }
}

impl Finalizer {
    pub fn new(patterns: Arc<PatternTable>) -> Self {
        Self { patterns }
    }

    /// Finalizes one draft. Returns `None` if the draft has no title.
    pub fn finalize(&self, draft: DraftEvent) -> Option<Event> {
        let title = draft.title.trim_matches(|c: char| c.is_whitespace() || c == '/');
        if title.is_empty() {
            debug!(dates = ?draft.dates, "Dropping draft without a title");
            return None;
        }

        let (title, location) = match self.patterns.split_location(title) {
            Some((title, location)) => (title, Some(location)),
            None => (title.to_string(), None),
        };

        let description = draft.body().trim().to_string();

        let (dates, times) = if draft.dates.is_single_day() {
            let times = self
                .infer_time(draft.dates.start, &description)
                .into_iter()
                .collect();
            (draft.dates, times)
        } else {
            (draft.dates.with_exclusive_end(), Vec::new())
        };

        Some(Event {
            dates,
            times,
            title,
            description,
            link: draft.link,
            location,
        })
    }

    /// Finds the event's clock time on `day` from its description.
    fn infer_time(&self, day: NaiveDate, description: &str) -> Option<TimeRange> {
        let Some(found) = self.patterns.match_time(description) else {
            trace!(%day, "No time found in description");
            return None;
        };
        let range = time_range_on(day, &found)?;
        trace!(
            start = %range.start,
            minutes = range.duration().num_minutes(),
            "Inferred event time"
        );
        Some(range)
    }
}

/// Builds the time range for a match. The start inherits the trailing
/// meridiem when it has none of its own.
fn time_range_on(day: NaiveDate, found: &TimeMatch) -> Option<TimeRange> {
    let start_meridiem = found.start_meridiem.unwrap_or(found.meridiem);
    let start = day.and_time(clock_time(found.start, start_meridiem)?);

    let range = match found.end {
        None => TimeRange::from_duration(start, TimeDelta::hours(DEFAULT_DURATION_HOURS)),
        Some(end) => TimeRange::new(start, day.and_time(clock_time(end, found.meridiem)?)),
    };
    Some(range)
}

fn clock_time(reading: ClockReading, meridiem: Meridiem) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(meridiem.to_24h(reading.hour), reading.minute.unwrap_or(0), 0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::time::DateRange;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn single(title: &str, body: &str) -> DraftEvent {
        DraftEvent::new(DateRange::single(day(9)))
            .with_title(title)
            .with_body(body)
    }

    fn finalize(draft: DraftEvent) -> Option<Event> {
        Finalizer::default().finalize(draft)
    }

    #[test]
    fn empty_title_is_dropped() {
        assert!(finalize(single("", "Some text at 7 p.m.")).is_none());
        assert!(finalize(single(" / \n", "Some text")).is_none());
    }

    #[test]
    fn title_is_trimmed_of_slashes() {
        let event = finalize(single(" / Farmers Market / ", "")).unwrap();
        assert_eq!(event.title, "Farmers Market");
        assert_eq!(event.location, None);
    }

    #[test]
    fn title_and_location_split() {
        let event = finalize(single("Trivia Night at The Pub", "")).unwrap();
        assert_eq!(event.title, "Trivia Night");
        assert_eq!(event.location.as_deref(), Some("The Pub"));
    }

    #[test]
    fn description_is_trimmed_body() {
        let event = finalize(single("Show", "\n  Doors open at 6 p.m.  \n")).unwrap();
        assert_eq!(event.description, "Doors open at 6 p.m.");
    }

    #[test]
    fn time_range_from_description() {
        let event = finalize(single("Trivia", "Join us from 7 p.m. to 9 p.m. for trivia")).unwrap();
        assert_eq!(event.times, vec![TimeRange::new(at(9, 19, 0), at(9, 21, 0))]);
    }

    #[test]
    fn start_time_defaults_to_one_hour() {
        let event = finalize(single("Show", "Doors open at 6 p.m.")).unwrap();
        assert_eq!(event.times, vec![TimeRange::new(at(9, 18, 0), at(9, 19, 0))]);
    }

    #[test]
    fn start_meridiem_defaults_to_end_meridiem() {
        let event = finalize(single("Concert", "Music 7:30-10 p.m. on the lawn")).unwrap();
        assert_eq!(event.times, vec![TimeRange::new(at(9, 19, 30), at(9, 22, 0))]);
    }

    #[test]
    fn explicit_start_meridiem_is_kept() {
        let event = finalize(single("Market", "Open 11 a.m. - 6 p.m.")).unwrap();
        assert_eq!(event.times, vec![TimeRange::new(at(9, 11, 0), at(9, 18, 0))]);
    }

    #[test]
    fn noon_and_midnight() {
        let event = finalize(single("Brunch", "Starts at 12 p.m.")).unwrap();
        assert_eq!(event.times[0].start, at(9, 12, 0));
        let event = finalize(single("Party", "Until 12 a.m.")).unwrap();
        assert_eq!(event.times[0].start, at(9, 0, 0));
    }

    #[test]
    fn no_time_keeps_event_untimed() {
        let event = finalize(single("Exhibit", "All day, free admission.")).unwrap();
        assert!(event.times.is_empty());
        assert_eq!(event.dates, DateRange::single(day(9)));
    }

    #[test]
    fn multi_day_gets_exclusive_end_and_no_times() {
        let draft = DraftEvent::new(DateRange::new(day(10), Some(day(12))))
            .with_title("Festival")
            .with_body("Gates open at 10 a.m. each day");
        let event = finalize(draft).unwrap();
        assert_eq!(event.dates.start, day(10));
        assert_eq!(event.dates.end, Some(day(13)));
        assert!(event.times.is_empty());
    }

    #[test]
    fn link_is_carried_over() {
        let mut draft = single("Show", "");
        draft.link = Some("https://example.com/show".into());
        let event = finalize(draft).unwrap();
        assert_eq!(event.link.as_deref(), Some("https://example.com/show"));
    }

    #[test]
    fn finalization_is_deterministic() {
        let draft = single("Trivia Night at The Pub", " Join us at 7 p.m. ");
        let first = finalize(draft.clone()).unwrap();
        let second = finalize(draft).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn derived_fields_are_stable_on_finalized_values() {
        let event = finalize(single("Trivia Night at The Pub", "Doors open at 6 p.m.")).unwrap();
        let again = finalize(single(&event.title, &event.description)).unwrap();
        assert_eq!(again.title, event.title);
        assert_eq!(again.description, event.description);
        assert_eq!(again.times, event.times);
    }
}
