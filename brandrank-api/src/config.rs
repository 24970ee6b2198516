//! Service wiring from bootstrap config
//!
//! Turns a [`TomlConfig`] into a ready [`RankPipeline`]: resolves the
//! credential (ENV → TOML) and builds the HTTP backend.

use crate::services::{ClientError, OpenRouterBackend, PipelineSettings, RankPipeline};
use brandrank_common::config::{resolve_api_key, TomlConfig};
use std::sync::Arc;
use std::time::Duration;

/// Build the pipeline for a validated config
///
/// Missing credentials are not an error here; requests report them instead.
pub fn build_pipeline(config: &TomlConfig) -> Result<RankPipeline, ClientError> {
    let api_key = resolve_api_key(config);
    let backend = OpenRouterBackend::new(
        &config.api_base_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    tracing::info!(
        endpoint = %backend.endpoint(),
        timeout_secs = config.request_timeout_secs,
        "Chat completion backend ready"
    );

    let settings = PipelineSettings::from_config(config);
    tracing::info!(
        models = ?settings.models,
        discovery_model = %settings.discovery_model,
        judge_model = %settings.judge_model,
        summary_model = %settings.summary_model,
        call_limit = settings.call_limit,
        "Pipeline configured"
    );

    Ok(RankPipeline::new(Arc::new(backend), settings))
}
