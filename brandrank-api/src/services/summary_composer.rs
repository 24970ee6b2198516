//! Phase 3: narrative summary over the matrix transcript
//!
//! Best effort. The matrix has already been delivered, so any failure here
//! degrades to a placeholder instead of failing the request.

use super::LlmClient;
use crate::models::{RankQuery, Transcript};

/// Returned whenever the summary call fails
pub const SUMMARY_UNAVAILABLE: &str = "summary unavailable";

const ANALYST_SYSTEM_PROMPT: &str = "You are a senior brand strategy analyst. \
You read raw ranking data gathered from several AI models and write a short, \
plain-language verdict for an executive audience. Be concise: at most 120 words.";

pub struct SummaryComposer {
    client: LlmClient,
    model: String,
}

impl SummaryComposer {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Summarize the transcript, or return [`SUMMARY_UNAVAILABLE`]
    pub async fn summarize(&self, query: &RankQuery, transcript: &Transcript) -> String {
        let prompt = format!(
            "Company: {company}\nIndustry: {industry}\n\n\
             Ranking results (model | dimension: rank | top list):\n{lines}\n\n\
             Write a short analysis covering: the company's strongest and weakest dimension, \
             the competitors that recur most often, and a one-sentence strategic verdict.",
            company = query.company(),
            industry = query.industry(),
            lines = transcript.render(),
        );

        match self
            .client
            .complete(&self.model, ANALYST_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "Summary generation failed, using placeholder");
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }
}
