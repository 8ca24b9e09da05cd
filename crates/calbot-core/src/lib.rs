//! Event extraction from weekend-guide articles.
//!
//! A guide is an HTML page where date headings (`Friday, May 10`) are followed
//! by one paragraph per event. [`Pipeline`] streams such a page through a
//! tokenizer, a state-machine [`parser`] and a [`finalize`] stage, producing
//! [`Event`]s that [`ics`] renders as an iCalendar feed.

pub mod error;
pub mod event;
pub mod finalize;
pub mod ics;
pub mod parser;
pub mod patterns;
pub mod pipeline;
pub mod time;
pub mod tokenizer;
pub mod tracing;

pub use error::{ExtractError, ExtractResult};
pub use event::{DraftEvent, Event};
pub use finalize::Finalizer;
pub use ics::{DEFAULT_CALENDAR_NAME, render_calendar};
pub use patterns::PatternTable;
pub use pipeline::{EventStream, Extraction, Pipeline, PipelineStats};
pub use time::{DateRange, TimeRange};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
