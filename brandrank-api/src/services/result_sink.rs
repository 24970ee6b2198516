//! Result delivery policies
//!
//! The pipeline pushes [`RankEvent`]s into a [`ResultSink`]. Whether they are
//! streamed to the client one by one or buffered into a single
//! [`FinalReport`] is decided by the sink, not by the orchestrator.

use crate::models::{Dimension, FinalReport, MatrixResults};
use brandrank_common::events::CellUpdate;
use brandrank_common::{RankEvent, RankResult};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;

/// Sink errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The consumer went away (e.g. SSE client disconnected)
    #[error("Result sink closed")]
    Closed,
}

/// Destination for pipeline events
pub trait ResultSink: Send + Sync {
    fn deliver(&self, event: RankEvent) -> Result<(), SinkError>;

    /// True once further deliveries can no longer reach anyone
    fn is_closed(&self) -> bool {
        false
    }
}

/// Streaming policy: forwards every event into an mpsc channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RankEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<RankEvent>) -> Self {
        Self { tx }
    }
}

impl ResultSink for ChannelSink {
    fn deliver(&self, event: RankEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug, Default)]
struct BatchState {
    dimensions: Vec<Dimension>,
    matrix: MatrixResults,
    summary: Option<String>,
    error: Option<String>,
}

/// Batch policy: buffers events into one [`FinalReport`]
#[derive(Debug, Default)]
pub struct BatchSink {
    state: Mutex<BatchState>,
}

impl BatchSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fatal error delivered by the pipeline, if any
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Number of matrix cells received so far
    pub fn cell_count(&self) -> usize {
        self.state().matrix.values().map(|row| row.len()).sum()
    }

    pub fn into_report(self, calls_issued: usize) -> FinalReport {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        FinalReport {
            dimensions: state.dimensions,
            model_results: state.matrix,
            summary: state.summary.unwrap_or_default(),
            generated_at: Utc::now(),
            calls_issued,
        }
    }
}

impl ResultSink for BatchSink {
    fn deliver(&self, event: RankEvent) -> Result<(), SinkError> {
        let mut state = self.state();
        match event {
            RankEvent::Dimensions { dimensions } => state.dimensions = dimensions,
            RankEvent::Result(CellUpdate {
                model,
                dimension,
                rank,
                raw,
            }) => {
                state
                    .matrix
                    .entry(model)
                    .or_default()
                    .insert(dimension, RankResult::new(rank, raw));
            }
            RankEvent::Summary { summary } => state.summary = Some(summary),
            RankEvent::Error { message } => state.error = Some(message),
        }
        Ok(())
    }
}
