//! Matrix, transcript and final report types

use brandrank_common::RankResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Opaque model identifier (e.g. `openai/gpt-4o`)
pub type ModelId = String;

/// Short phrase naming an evaluation axis (e.g. `price`)
pub type Dimension = String;

/// Phase 2 grid: model → dimension → result
pub type MatrixResults = BTreeMap<ModelId, BTreeMap<Dimension, RankResult>>;

/// Single-phase results: model → result
pub type QuickResults = BTreeMap<ModelId, RankResult>;

/// Append-only log of settled matrix cells, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-joined text handed to the summary model
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Batch-mode terminal artifact
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub dimensions: Vec<Dimension>,
    pub model_results: MatrixResults,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    pub calls_issued: usize,
}
