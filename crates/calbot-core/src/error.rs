//! Error types for the extraction pipeline.

use thiserror::Error;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors that abort an extraction run.
///
/// Headings that fail to parse, descriptions without a time and similar
/// authoring quirks are recovered where they occur and never show up here.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document stream could not be read or tokenized.
    #[error("malformed input at byte {position}: {source}")]
    MalformedInput {
        /// Byte offset into the document where reading stopped.
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// A downstream stage stopped accepting events.
    #[error("pipeline closed before extraction finished")]
    PipelineClosed,

    /// A stage task panicked or was cancelled.
    #[error("pipeline stage failed: {0}")]
    StageFailed(String),
}

impl ExtractError {
    /// Creates a malformed input error at the given position.
    pub fn malformed(position: u64, source: impl Into<quick_xml::Error>) -> Self {
        Self::MalformedInput {
            position,
            source: source.into(),
        }
    }

    /// Returns true if the error came from the document itself rather than
    /// from the pipeline plumbing.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MalformedInput { .. })
    }
}

impl From<tokio::task::JoinError> for ExtractError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::StageFailed(err.to_string())
    }
}
