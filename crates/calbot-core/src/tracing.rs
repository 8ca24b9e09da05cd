//! Log output for the `calbot` binary.
//!
//! Everything is written to stderr; stdout is reserved for extracted
//! calendars. Unless `RUST_LOG` is set, only `calbot*` targets are shown, at
//! the configured level.

use std::io;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Line format. Compact lines carry no timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level for `calbot*` targets; `None` means INFO.
    pub level: Option<Level>,
    pub format: TracingOutputFormat,
    /// Source file and line on every event.
    pub locations: bool,
    /// Span open/close events, one pair per HTTP request.
    pub spans: bool,
}

impl TracingConfig {
    /// `calbot --debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Some(Level::DEBUG),
            locations: true,
            ..Self::default()
        }
    }

    /// `calbot serve`.
    #[must_use]
    pub fn daemon() -> Self {
        Self {
            format: TracingOutputFormat::Json,
            spans: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn directive(&self) -> String {
        format!("calbot={}", self.level.unwrap_or(Level::INFO))
    }
}

/// Installs the global subscriber. Call once, early in `main`.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directive())?,
    };

    let span_events = if config.spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_file(config.locations)
        .with_line_number(config.locations)
        .with_span_events(span_events);
    let layer = match config.format {
        TracingOutputFormat::Pretty => layer.pretty().boxed(),
        TracingOutputFormat::Compact => layer.compact().without_time().boxed(),
        TracingOutputFormat::Json => layer.json().boxed(),
    };

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))?;
    Ok(())
}
