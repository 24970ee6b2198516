//! Ranking endpoints
//!
//! `POST /api/rank` streams SSE when the client accepts `text/event-stream`
//! and otherwise answers with one buffered [`FinalReport`].
//! `POST /api/rank/quick` runs a single matrix-less pass over the models.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use brandrank_common::sse::rank_event_stream;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::{ApiError, ApiResult};
use crate::models::{FinalReport, QuickResults, RankQuery};
use crate::services::{BatchSink, ChannelSink};
use crate::AppState;

const EVENT_STREAM: &str = "text/event-stream";

/// Request body for both ranking endpoints
///
/// Fields are optional so a missing field reaches validation and gets the
/// same 400 envelope as a blank one.
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub company: Option<String>,
    pub industry: Option<String>,
}

/// Validate the body and check credentials before any outbound call
fn prepare(
    state: &AppState,
    payload: Result<Json<RankRequest>, JsonRejection>,
) -> ApiResult<RankQuery> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let query = RankQuery::new(
        request.company.unwrap_or_default(),
        request.industry.unwrap_or_default(),
    )?;

    if !state.pipeline.has_credentials() {
        return Err(ApiError::Config(
            "Server configuration error: API credentials missing".to_string(),
        ));
    }

    Ok(query)
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains(EVENT_STREAM))
}

/// POST /api/rank
pub async fn rank(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RankRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let query = prepare(&state, payload)?;

    if wants_event_stream(&headers) {
        tracing::info!(company = %query.company(), industry = %query.industry(), "Streaming rank request");

        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = state.pipeline.clone();
        tokio::spawn(async move {
            let sink = ChannelSink::new(tx);
            if let Err(e) = pipeline.run(&query, &sink).await {
                tracing::warn!(error = %e, "Streaming rank run aborted");
            }
        });

        return Ok(rank_event_stream(rx).into_response());
    }

    tracing::info!(company = %query.company(), industry = %query.industry(), "Batch rank request");
    let report = run_batch(&state, &query).await?;
    Ok(Json(report).into_response())
}

async fn run_batch(state: &AppState, query: &RankQuery) -> ApiResult<FinalReport> {
    let sink = BatchSink::new();
    let stats = state
        .pipeline
        .run(query, &sink)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(sink.into_report(stats.calls_issued))
}

/// POST /api/rank/quick
pub async fn rank_quick(
    State(state): State<AppState>,
    payload: Result<Json<RankRequest>, JsonRejection>,
) -> ApiResult<Json<QuickResults>> {
    let query = prepare(&state, payload)?;
    let (results, calls_issued) = state.pipeline.run_quick(&query).await;

    tracing::info!(company = %query.company(), calls_issued, "Quick rank complete");
    Ok(Json(results))
}

/// Build ranking routes
pub fn rank_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rank", post(rank))
        .route("/api/rank/quick", post(rank_quick))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_accept_negotiation() {
        let mut headers = HeaderMap::new();
        assert!(!wants_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_event_stream(&headers));

        headers.append(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        assert!(wants_event_stream(&headers));
    }
}
