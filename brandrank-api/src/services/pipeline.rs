//! Ranking pipeline
//!
//! # Phase Progression
//! DISCOVERY → MATRIX → SUMMARY
//!
//! - **DISCOVERY**: one call, fatal on failure (delivers an `error` event)
//! - **MATRIX**: models × dimensions, per-cell failures only
//! - **SUMMARY**: one call, degrades to a placeholder
//!
//! Phases run strictly in sequence. Each run owns a fresh [`CallBudget`];
//! nothing is shared between requests.

use super::{
    CallBudget, ChatBackend, DimensionDiscovery, DiscoveryError, LlmClient, MatrixOrchestrator,
    MatrixStats, ResultSink, SummaryComposer,
};
use crate::models::{ModelId, QuickResults, RankQuery};
use brandrank_common::config::TomlConfig;
use brandrank_common::RankEvent;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Model roles and budget for pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub models: Vec<ModelId>,
    pub discovery_model: String,
    pub judge_model: String,
    pub summary_model: String,
    pub call_limit: usize,
}

impl PipelineSettings {
    /// Build settings from bootstrap config (matrix models trimmed and de-duplicated)
    pub fn from_config(config: &TomlConfig) -> Self {
        let mut seen = HashSet::new();
        let models = config
            .models
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && seen.insert(m.clone()))
            .collect();

        Self {
            models,
            discovery_model: config.discovery_model.clone(),
            judge_model: config.judge_model.clone(),
            summary_model: config.summary_model.clone(),
            call_limit: config.call_budget,
        }
    }
}

/// Pipeline errors (only Phase 1 can fail a run)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub request_id: Uuid,
    pub calls_issued: usize,
    pub dimensions: usize,
    pub matrix: MatrixStats,
    pub summarized: bool,
}

#[derive(Clone)]
pub struct RankPipeline {
    backend: Arc<dyn ChatBackend>,
    settings: Arc<PipelineSettings>,
}

impl RankPipeline {
    pub fn new(backend: Arc<dyn ChatBackend>, settings: PipelineSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn has_credentials(&self) -> bool {
        self.backend.has_credentials()
    }

    /// Run all three phases, delivering events to `sink`
    pub async fn run(
        &self,
        query: &RankQuery,
        sink: &dyn ResultSink,
    ) -> Result<RunStats, PipelineError> {
        let request_id = Uuid::new_v4();
        let budget = Arc::new(CallBudget::new(self.settings.call_limit));
        let client = LlmClient::new(Arc::clone(&self.backend), Arc::clone(&budget));

        tracing::info!(
            request_id = %request_id,
            company = %query.company(),
            industry = %query.industry(),
            "Ranking pipeline started"
        );

        // Phase 1: DISCOVERY
        let discovery = DimensionDiscovery::new(client.clone(), self.settings.discovery_model.as_str());
        let dimensions = match discovery.discover(query.industry()).await {
            Ok(dimensions) => dimensions,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Phase 1 failed, aborting run");
                if sink
                    .deliver(RankEvent::Error {
                        message: e.to_string(),
                    })
                    .is_err()
                {
                    tracing::debug!(request_id = %request_id, "Sink closed before error event");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = sink.deliver(RankEvent::Dimensions {
            dimensions: dimensions.clone(),
        }) {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to deliver dimensions");
        }

        // Phase 2: MATRIX
        let orchestrator = MatrixOrchestrator::new(client.clone(), self.settings.judge_model.as_str());
        let matrix = orchestrator
            .run(query, &dimensions, &self.settings.models, sink)
            .await;

        // Phase 3: SUMMARY
        let summarized = if sink.is_closed() {
            tracing::warn!(request_id = %request_id, "Result sink closed, skipping summary");
            false
        } else {
            let composer = SummaryComposer::new(client.clone(), self.settings.summary_model.as_str());
            let summary = composer.summarize(query, &matrix.transcript).await;
            if let Err(e) = sink.deliver(RankEvent::Summary { summary }) {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to deliver summary");
            }
            true
        };

        let stats = RunStats {
            request_id,
            calls_issued: budget.count(),
            dimensions: dimensions.len(),
            matrix: matrix.stats,
            summarized,
        };

        tracing::info!(
            request_id = %request_id,
            calls_issued = stats.calls_issued,
            call_limit = budget.limit(),
            cells = stats.matrix.cells,
            "Ranking pipeline complete"
        );

        Ok(stats)
    }

    /// Single-phase ranking; returns results and the number of calls issued
    pub async fn run_quick(&self, query: &RankQuery) -> (QuickResults, usize) {
        let budget = Arc::new(CallBudget::new(self.settings.call_limit));
        let client = LlmClient::new(Arc::clone(&self.backend), Arc::clone(&budget));
        let orchestrator = MatrixOrchestrator::new(client, self.settings.judge_model.as_str());

        tracing::info!(
            company = %query.company(),
            industry = %query.industry(),
            models = self.settings.models.len(),
            "Quick ranking started"
        );

        let results = orchestrator.run_quick(query, &self.settings.models).await;
        (results, budget.count())
    }
}
