//! Event records produced by the extraction pipeline.
//!
//! - [`DraftEvent`]: what the parser builds from one paragraph of markup
//! - [`Event`]: a draft after finalization, ready for rendering
//!
//! Only [`crate::finalize::Finalizer`] turns a draft into an [`Event`], and it
//! takes the draft by value, so a draft is finalized at most once.

use serde::{Deserialize, Serialize};

use crate::time::{DateRange, TimeRange};

/// An event as emitted by the parser, before any field is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEvent {
    /// Dates of the section the paragraph appeared in.
    pub dates: DateRange,
    /// Raw title text from the first bold run.
    pub title: String,
    /// Append-only accumulator for the paragraph's visible text.
    body: String,
    /// Target of a call-to-action anchor.
    pub link: Option<String>,
}

impl DraftEvent {
    /// Creates an empty draft seeded with its section's dates.
    pub fn new(dates: DateRange) -> Self {
        Self {
            dates,
            title: String::new(),
            body: String::new(),
            link: None,
        }
    }

    /// Builder: set the raw title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder: append to the body.
    pub fn with_body(mut self, text: &str) -> Self {
        self.push_body(text);
        self
    }

    /// Appends text to the body.
    pub fn push_body(&mut self, text: &str) {
        self.body.push_str(text);
    }

    /// Returns the accumulated body text.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// A finalized event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The day or days the event runs. Multi-day ranges have an exclusive end.
    pub dates: DateRange,
    /// Clock times inferred from the description; empty or a single entry.
    pub times: Vec<TimeRange>,
    /// Non-empty event title.
    pub title: String,
    /// Trimmed paragraph text.
    pub description: String,
    /// Target of the paragraph's call-to-action link, if any.
    pub link: Option<String>,
    /// Venue split off the title, if any.
    pub location: Option<String>,
}

impl Event {
    /// Returns true if the event has a known clock time.
    pub fn is_timed(&self) -> bool {
        !self.times.is_empty()
    }

    /// Returns true if the event spans more than one day.
    pub fn is_multi_day(&self) -> bool {
        !self.dates.is_single_day()
    }
}
