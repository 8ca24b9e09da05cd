//! Server error types.

use std::io;

use calbot_core::ExtractError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, signals).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The guide request could not be sent or its body not read.
    #[error("failed to fetch guide: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The guide site answered with a non-success status.
    #[error("guide request to {url} returned HTTP {status}")]
    UpstreamStatus { url: String, status: u16 },

    /// Extraction failed before producing any event.
    #[error("failed to extract events: {0}")]
    Extract(#[from] ExtractError),

    #[error("invalid guide URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn upstream_status(url: impl Into<String>, status: u16) -> Self {
        Self::UpstreamStatus {
            url: url.into(),
            status,
        }
    }

    /// Returns true if the guide site, not this server, is at fault.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::UpstreamStatus { .. })
    }
}
