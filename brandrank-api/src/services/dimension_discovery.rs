//! Phase 1: dimension discovery
//!
//! One model call derives the evaluation axes for an industry. The matrix has
//! nothing to run without them, so any failure here aborts the request.

use super::{ClientError, LlmClient};
use crate::models::Dimension;
use std::collections::HashSet;
use thiserror::Error;

/// Maximum number of dimensions kept from the reply
pub const MAX_DIMENSIONS: usize = 5;

const DISCOVERY_SYSTEM_PROMPT: &str = "You are a market research analyst. \
Answer with short phrases only, no numbering and no explanations.";

/// Dimension discovery errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Dimension discovery failed: {0}")]
    Upstream(#[from] ClientError),

    #[error("Dimension discovery returned no usable dimensions")]
    NoDimensions,
}

pub struct DimensionDiscovery {
    client: LlmClient,
    model: String,
}

impl DimensionDiscovery {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Ask the discovery model for up to five industry dimensions
    pub async fn discover(&self, industry: &str) -> Result<Vec<Dimension>, DiscoveryError> {
        let prompt = format!(
            "List exactly {MAX_DIMENSIONS} short phrases (1-3 words each) naming the dimensions \
             that matter most for brand success in the {industry} industry. \
             Return ONLY a comma-separated list."
        );

        let reply = self
            .client
            .complete(&self.model, DISCOVERY_SYSTEM_PROMPT, &prompt)
            .await?;

        let dimensions = parse_dimensions(&reply);
        if dimensions.is_empty() {
            tracing::warn!(industry = %industry, reply = %reply, "No dimensions in discovery reply");
            return Err(DiscoveryError::NoDimensions);
        }

        tracing::info!(industry = %industry, dimensions = ?dimensions, "Dimensions discovered");
        Ok(dimensions)
    }
}

/// Comma-split, trim, drop blanks and repeats, keep the first five
pub(crate) fn parse_dimensions(reply: &str) -> Vec<Dimension> {
    let mut seen = HashSet::new();
    reply
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .take(MAX_DIMENSIONS)
        .map(str::to_string)
        .collect()
}
