//! Event types for the ranking pipeline
//!
//! A pipeline run produces, in order: one `dimensions` event, one `result`
//! event per matrix cell (completion order), then exactly one terminal event
//! (`summary`, or `error` when Phase 1 fails).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the target company landed in one model's candidate list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankOutcome {
    /// 1-based position in the candidate list
    Found { position: usize },
    /// The list does not contain the target
    NotFound,
    /// The model call (or its reply) failed
    Error { message: String },
}

impl RankOutcome {
    pub fn found(position: usize) -> Self {
        Self::Found { position }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Found { position } => Some(*position),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short human-readable form, used in transcripts and logs
    pub fn label(&self) -> String {
        match self {
            Self::Found { position } => format!("#{}", position),
            Self::NotFound => "not in top list".to_string(),
            Self::Error { message } => format!("error ({})", message),
        }
    }
}

/// Outcome plus the candidate text it was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankResult {
    pub rank: RankOutcome,
    /// Comma-joined candidate list as returned by the model (empty on transport errors)
    pub raw: String,
}

impl RankResult {
    pub fn new(rank: RankOutcome, raw: impl Into<String>) -> Self {
        Self {
            rank,
            raw: raw.into(),
        }
    }
}

/// One settled matrix cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub model: String,
    pub dimension: String,
    pub rank: RankOutcome,
    pub raw: String,
}

/// Pipeline event delivered to a result sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RankEvent {
    /// Phase 1 output, always first
    Dimensions { dimensions: Vec<String> },
    /// One completed (model, dimension) cell
    Result(CellUpdate),
    /// Phase 3 narrative, terminal
    Summary { summary: String },
    /// Fatal pipeline failure, terminal
    Error { message: String },
}

impl RankEvent {
    /// Get event type as string (SSE event name)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Dimensions { .. } => "dimensions",
            Self::Result(_) => "result",
            Self::Summary { .. } => "summary",
            Self::Error { .. } => "error",
        }
    }

    /// No event follows a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Summary { .. } | Self::Error { .. })
    }

    /// Wire payload (the SSE `data` field) without the type tag
    pub fn payload(&self) -> Value {
        match self {
            Self::Dimensions { dimensions } => Value::from(dimensions.clone()),
            Self::Result(cell) => serde_json::to_value(cell).unwrap_or(Value::Null),
            Self::Summary { summary } => Value::from(summary.clone()),
            Self::Error { message } => Value::from(message.clone()),
        }
    }
}
