//! Concurrent extraction pipeline.
//!
//! ```text
//! reader ──> [parser, blocking pool] ──drafts──> [finalizer task] ──events──> caller
//! ```
//!
//! Both handoffs are capacity-one channels, so a stage runs at most one item
//! ahead of the next. Ownership of each draft moves through the channel; no
//! stage shares mutable state with another.

use std::io::BufRead;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::event::{DraftEvent, Event};
use crate::finalize::Finalizer;
use crate::parser::Parser;
use crate::patterns::PatternTable;

/// Capacity of both stage handoffs.
const HANDOFF_CAPACITY: usize = 1;

/// Builds extraction runs for guides published on one anchor Thursday.
#[derive(Debug, Clone)]
pub struct Pipeline {
    anchor: NaiveDate,
    patterns: Arc<PatternTable>,
}

impl Pipeline {
    pub fn new(anchor: NaiveDate) -> Self {
        Self::with_patterns(anchor, PatternTable::shared())
    }

    pub fn with_patterns(anchor: NaiveDate, patterns: Arc<PatternTable>) -> Self {
        Self { anchor, patterns }
    }

    /// Starts both stages on `reader` and returns the output end.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(&self, reader: R) -> EventStream
    where
        R: BufRead + Send + 'static,
    {
        let (mut draft_tx, mut draft_rx) = mpsc::channel::<DraftEvent>(HANDOFF_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<Event>(HANDOFF_CAPACITY);

        let parser = Parser::new(reader, self.anchor, Arc::clone(&self.patterns));
        let parser = tokio::task::spawn_blocking(move || parser.run(&mut draft_tx));

        let finalizer = Finalizer::new(Arc::clone(&self.patterns));
        let finalizer = tokio::spawn(async move {
            let mut counts = FinalizeCounts::default();
            while let Some(draft) = draft_rx.recv().await {
                let Some(event) = finalizer.finalize(draft) else {
                    counts.dropped += 1;
                    continue;
                };
                event_tx
                    .send(event)
                    .await
                    .map_err(|_| ExtractError::PipelineClosed)?;
                counts.forwarded += 1;
            }
            Ok(counts)
        });

        debug!(anchor = %self.anchor, "Extraction pipeline started");
        EventStream {
            events: event_rx,
            parser,
            finalizer,
        }
    }

    /// Runs the pipeline to completion and collects its output.
    pub async fn extract<R>(&self, reader: R) -> Extraction
    where
        R: BufRead + Send + 'static,
    {
        self.spawn(reader).collect().await
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FinalizeCounts {
    forwarded: usize,
    dropped: usize,
}

/// Counters reported by a finished pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Drafts emitted by the parser.
    pub drafts: usize,
    /// Events delivered to the caller.
    pub events: usize,
    /// Drafts dropped for lacking a title.
    pub dropped: usize,
}

/// Output end of a running pipeline.
///
/// Dropping it closes the output channel; the stages then stop with
/// [`ExtractError::PipelineClosed`].
pub struct EventStream {
    events: mpsc::Receiver<Event>,
    parser: JoinHandle<ExtractResult<usize>>,
    finalizer: JoinHandle<ExtractResult<FinalizeCounts>>,
}

impl EventStream {
    /// Next finalized event, in document order. `None` once both stages are
    /// done, whether they succeeded or not.
    pub async fn next(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Waits for both stages and reports how the run ended.
    ///
    /// Events not yet taken with [`next`](Self::next) are discarded. A parser
    /// failure takes precedence over a finalizer failure since the latter is
    /// usually a consequence of the former.
    pub async fn finish(self) -> ExtractResult<PipelineStats> {
        let Self {
            events,
            parser,
            finalizer,
        } = self;
        drop(events);

        let parsed = parser.await;
        let finalized = finalizer.await;
        let drafts = parsed??;
        let counts = finalized??;

        let stats = PipelineStats {
            drafts,
            events: counts.forwarded,
            dropped: counts.dropped,
        };
        debug!(?stats, "Extraction pipeline finished");
        Ok(stats)
    }

    /// Drains every event, then joins the stages.
    pub async fn collect(mut self) -> Extraction {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        let error = self.finish().await.err();
        if let Some(err) = &error {
            warn!(
                error = %err,
                input_error = err.is_input_error(),
                kept = events.len(),
                "Extraction ended early"
            );
        }
        Extraction { events, error }
    }
}

/// Outcome of a full extraction run.
///
/// A fatal error does not discard what was extracted before it happened.
#[derive(Debug)]
pub struct Extraction {
    pub events: Vec<Event>,
    pub error: Option<ExtractError>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// All-or-nothing view: the events, or the error if there was one.
    pub fn into_result(self) -> ExtractResult<Vec<Event>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.events),
        }
    }
}
