//! iCalendar rendering of finalized events.

use chrono::Days;
use icalendar::{Calendar, CalendarDateTime, Component, DatePerhapsTime, EventLike};
use uuid::Uuid;

use crate::event::Event;

/// Name given to the calendar served for the weekend guide.
pub const DEFAULT_CALENDAR_NAME: &str = "Little Rock Soirée Weekend Guide";

/// Renders `events` as a `VCALENDAR` document.
pub fn render_calendar(events: &[Event], name: &str) -> String {
    let mut calendar = Calendar::new();
    calendar.name(name);
    for event in events {
        calendar.push(to_component(event));
    }
    calendar.to_string()
}

/// Stable identifier derived from the event's dates and title, so that
/// re-fetching a guide does not duplicate entries in subscribed calendars.
pub fn event_uid(event: &Event) -> Uuid {
    let end = event
        .dates
        .end
        .map(|end| end.to_string())
        .unwrap_or_default();
    let key = format!("{}/{}/{}", event.dates.start, end, event.title);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
}

fn to_component(event: &Event) -> icalendar::Event {
    let mut component = icalendar::Event::new();
    component
        .uid(&event_uid(event).to_string())
        .summary(&event.title);

    if !event.description.is_empty() {
        component.description(&event.description);
    }
    if let Some(location) = &event.location {
        component.location(location);
    }
    if let Some(link) = &event.link {
        component.add_property("URL", link);
    }

    match event.times.first() {
        Some(range) => {
            component
                .starts(floating(range.start))
                .ends(floating(range.end));
        }
        None => {
            component.starts(DatePerhapsTime::Date(event.dates.start));
            // Multi-day ends are already exclusive.
            let end = if event.is_multi_day() {
                event.dates.end
            } else {
                event.dates.start.checked_add_days(Days::new(1))
            };
            if let Some(end) = end {
                component.ends(DatePerhapsTime::Date(end));
            }
        }
    }

    component.done()
}

fn floating(at: chrono::NaiveDateTime) -> DatePerhapsTime {
    DatePerhapsTime::DateTime(CalendarDateTime::Floating(at))
}
