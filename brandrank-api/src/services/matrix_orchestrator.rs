//! Phase 2: model × dimension ranking matrix
//!
//! Every (model, dimension) pair is queried concurrently. Each settled cell
//! goes through the fuzzy matcher, then (budget permitting) the entity
//! resolution judge, and is delivered to the sink the moment it settles.
//!
//! # Failure isolation
//! A cell never fails the phase: transport, status and reply problems become a
//! `RankOutcome::Error` for that cell only. The phase completes when every
//! pair has an outcome.
//!
//! # Budget
//! Escalation checks `CallBudget::has_headroom` right before calling the judge.
//! Nothing is reserved, so concurrent cells passing the check together may
//! overshoot the limit.

use super::string_matcher::{find_rank, parse_candidate_list};
use super::{EntityResolver, LlmClient, ResultSink};
use crate::models::{Dimension, ModelId, QuickResults, RankQuery, Transcript};
use brandrank_common::events::CellUpdate;
use brandrank_common::{RankEvent, RankOutcome, RankResult};
use futures::stream::{FuturesUnordered, StreamExt};

const RANKING_SYSTEM_PROMPT: &str = "You are an industry analyst. \
Answer with brand names only, separated by commas, with no numbering or commentary.";

/// Candidate list length requested from each model
pub const TOP_N: usize = 5;

/// Settled cell plus whether the judge was consulted
#[derive(Debug, Clone, PartialEq, Eq)]
struct CellOutcome {
    result: RankResult,
    escalated: bool,
}

/// Outcome counts for one matrix run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixStats {
    pub cells: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
    pub escalations: usize,
}

impl MatrixStats {
    fn record(&mut self, outcome: &CellOutcome) {
        self.cells += 1;
        match outcome.result.rank {
            RankOutcome::Found { .. } => self.found += 1,
            RankOutcome::NotFound => self.not_found += 1,
            RankOutcome::Error { .. } => self.errors += 1,
        }
        if outcome.escalated {
            self.escalations += 1;
        }
    }
}

/// Transcript and counts produced by a completed matrix
#[derive(Debug, Clone, Default)]
pub struct MatrixRun {
    pub transcript: Transcript,
    pub stats: MatrixStats,
}

pub struct MatrixOrchestrator {
    client: LlmClient,
    resolver: EntityResolver,
}

impl MatrixOrchestrator {
    /// Create an orchestrator; the judge shares `client` (and so its budget)
    pub fn new(client: LlmClient, judge_model: impl Into<String>) -> Self {
        let resolver = EntityResolver::new(client.clone(), judge_model);
        Self { client, resolver }
    }

    /// Run the full cross product and deliver every cell to `sink`
    ///
    /// Sink failures are logged once; remaining cells still settle so the
    /// transcript is complete.
    pub async fn run(
        &self,
        query: &RankQuery,
        dimensions: &[Dimension],
        models: &[ModelId],
        sink: &dyn ResultSink,
    ) -> MatrixRun {
        tracing::info!(
            company = %query.company(),
            models = models.len(),
            dimensions = dimensions.len(),
            cells = models.len() * dimensions.len(),
            "Phase 2: ranking matrix started"
        );

        let mut pending = models
            .iter()
            .flat_map(|model| {
                dimensions.iter().map(move |dimension| async move {
                    let outcome = self.rank_cell(query, model, Some(dimension.as_str())).await;
                    (model, dimension, outcome)
                })
            })
            .collect::<FuturesUnordered<_>>();

        let mut run = MatrixRun::default();
        let mut sink_open = true;

        while let Some((model, dimension, outcome)) = pending.next().await {
            run.transcript.push(transcript_line(model, dimension, &outcome.result));
            run.stats.record(&outcome);

            tracing::debug!(
                model = %model,
                dimension = %dimension,
                rank = %outcome.result.rank.label(),
                escalated = outcome.escalated,
                "Matrix cell settled"
            );

            if sink_open {
                let event = RankEvent::Result(CellUpdate {
                    model: model.clone(),
                    dimension: dimension.clone(),
                    rank: outcome.result.rank,
                    raw: outcome.result.raw,
                });
                if let Err(e) = sink.deliver(event) {
                    tracing::warn!(error = %e, "Result sink rejected cell; remaining cells settle without delivery");
                    sink_open = false;
                }
            }
        }

        tracing::info!(
            cells = run.stats.cells,
            found = run.stats.found,
            not_found = run.stats.not_found,
            errors = run.stats.errors,
            escalations = run.stats.escalations,
            calls_issued = self.client.budget().count(),
            "Phase 2: ranking matrix complete"
        );

        run
    }

    /// Single-phase ranking: one generic "most popular companies" query per model
    pub async fn run_quick(&self, query: &RankQuery, models: &[ModelId]) -> QuickResults {
        let mut pending = models
            .iter()
            .map(|model| async move { (model, self.rank_cell(query, model, None).await) })
            .collect::<FuturesUnordered<_>>();

        let mut results = QuickResults::new();
        while let Some((model, outcome)) = pending.next().await {
            results.insert(model.clone(), outcome.result);
        }
        results
    }

    async fn rank_cell(
        &self,
        query: &RankQuery,
        model: &str,
        dimension: Option<&str>,
    ) -> CellOutcome {
        let prompt = ranking_prompt(query.industry(), dimension);

        let reply = match self
            .client
            .complete(model, RANKING_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                return CellOutcome {
                    result: RankResult::new(RankOutcome::error(e.to_string()), ""),
                    escalated: false,
                };
            }
        };

        let candidates = parse_candidate_list(&reply);
        if candidates.iter().all(|c| c.is_empty()) {
            return CellOutcome {
                result: RankResult::new(RankOutcome::error("reply contained no brand names"), reply),
                escalated: false,
            };
        }

        if let Some(position) = find_rank(&candidates, query.company()) {
            return CellOutcome {
                result: RankResult::new(RankOutcome::found(position), reply),
                escalated: false,
            };
        }

        if !self.client.budget().has_headroom() {
            tracing::debug!(
                model = %model,
                calls_issued = self.client.budget().count(),
                "Call budget exhausted, skipping entity resolution"
            );
            return CellOutcome {
                result: RankResult::new(RankOutcome::NotFound, reply),
                escalated: false,
            };
        }

        let rank = match self.resolver.resolve(&candidates, query.company()).await {
            Some(position) => RankOutcome::found(position),
            None => RankOutcome::NotFound,
        };

        CellOutcome {
            result: RankResult::new(rank, reply),
            escalated: true,
        }
    }
}

fn ranking_prompt(industry: &str, dimension: Option<&str>) -> String {
    match dimension {
        Some(dimension) => format!(
            "List the top {TOP_N} brands in the {industry} industry when judged on {dimension}. \
             Return ONLY a comma-separated list of brand names, strongest first."
        ),
        None => format!(
            "List the top {TOP_N} most popular companies in the {industry} industry. \
             Return ONLY a comma-separated list of names."
        ),
    }
}

fn transcript_line(model: &str, dimension: &str, result: &RankResult) -> String {
    let list = if result.raw.is_empty() { "-" } else { result.raw.as_str() };
    format!("{model} | {dimension}: {} | top list: {list}", result.rank.label())
}
