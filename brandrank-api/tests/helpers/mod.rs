//! Test Helper Utilities
//!
//! Shared utilities for testing brandrank-api without network access

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use brandrank_api::services::{
    CallBudget, ChatBackend, ChatRequest, ClientError, LlmClient, PipelineSettings, RankPipeline,
};
use brandrank_api::AppState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;

pub const DISCOVERY_MODEL: &str = "test/discovery";
pub const JUDGE_MODEL: &str = "test/judge";
pub const SUMMARY_MODEL: &str = "test/summary";

mod scripted_backend;

pub use scripted_backend::ScriptedBackend;

/// Shared scripted backend answering from `handler`
pub fn scripted<F>(handler: F) -> Arc<ScriptedBackend>
where
    F: Fn(&ChatRequest) -> Result<String, ClientError> + Send + Sync + 'static,
{
    Arc::new(ScriptedBackend::new(handler))
}

/// Shared backend reporting no configured credentials
pub fn no_credentials() -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend::without_credentials())
}

/// Matrix model names `model1..=count`
pub fn model_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("model{}", i)).collect()
}

pub fn test_settings(models: usize, call_limit: usize) -> PipelineSettings {
    PipelineSettings {
        models: model_names(models),
        discovery_model: DISCOVERY_MODEL.to_string(),
        judge_model: JUDGE_MODEL.to_string(),
        summary_model: SUMMARY_MODEL.to_string(),
        call_limit,
    }
}

pub fn test_pipeline(backend: Arc<ScriptedBackend>, models: usize) -> RankPipeline {
    RankPipeline::new(backend, test_settings(models, 45))
}

pub fn test_state(backend: Arc<ScriptedBackend>, models: usize) -> AppState {
    AppState::new(test_pipeline(backend, models))
}

/// Dimension named in a matrix prompt ("... judged on {dimension}. ...")
pub fn prompt_dimension(request: &ChatRequest) -> Option<String> {
    let prompt = request.user_prompt();
    let start = prompt.find("judged on ")? + "judged on ".len();
    let rest = &prompt[start..];
    let end = rest.find('.')?;
    Some(rest[..end].to_string())
}

/// JSON POST to `uri`
pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// JSON POST to `uri` asking for an event stream
pub fn post_sse(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn read_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    serde_json::from_str(&read_text(response).await).unwrap()
}

/// One parsed SSE frame
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub event: String,
    pub data: Value,
}

/// Parse an SSE body into named frames (comment frames are skipped)
pub fn parse_sse(body: &str) -> Vec<SseFrame> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data.push(payload.strip_prefix(' ').unwrap_or(payload).to_string());
                }
            }
            let event = event?;
            let data = serde_json::from_str(&data.join("\n")).unwrap();
            Some(SseFrame { event, data })
        })
        .collect()
}
