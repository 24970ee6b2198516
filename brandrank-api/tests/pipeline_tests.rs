//! Pipeline integration tests
//!
//! Drive the full three-phase run against a scripted backend and check the
//! matrix shape, per-cell isolation, call accounting and event ordering.

mod helpers;

use async_trait::async_trait;
use brandrank_api::models::RankQuery;
use brandrank_api::services::{
    BatchSink, ChannelSink, ChatBackend, ChatRequest, ClientError, RankPipeline,
};
use brandrank_common::{RankEvent, RankOutcome};
use helpers::*;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const FIVE_DIMENSIONS: &str = "price, taste, availability, heritage, innovation";

fn heineken() -> RankQuery {
    RankQuery::new("Heineken", "beer").unwrap()
}

/// 5 dimensions × 6 models; three cells fail with HTTP 500
fn scenario_backend() -> Arc<ScriptedBackend> {
    scripted(|request| match request.model.as_str() {
        DISCOVERY_MODEL => Ok(FIVE_DIMENSIONS.to_string()),
        JUDGE_MODEL => Ok("0".to_string()),
        SUMMARY_MODEL => Ok("Heineken leads on availability.".to_string()),
        model => {
            let dimension = prompt_dimension(request).unwrap_or_default();
            let failing = matches!(
                (model, dimension.as_str()),
                ("model2", "price") | ("model4", "taste") | ("model6", "innovation")
            );
            if failing {
                return Err(ClientError::Api {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            match model {
                "model1" | "model3" | "model5" => Ok("Carlsberg, Heineken, Guinness".to_string()),
                _ => Ok("Guinness, Carlsberg, Budweiser".to_string()),
            }
        }
    })
}

#[tokio::test]
async fn test_full_matrix_with_failing_cells() {
    let backend = scenario_backend();
    let pipeline = RankPipeline::new(backend.clone(), test_settings(6, 45));
    let sink = BatchSink::new();

    let stats = pipeline.run(&heineken(), &sink).await.unwrap();

    // Exactly one matrix call per (model, dimension)
    let matrix_calls = model_names(6).iter().map(|m| backend.calls_to(m)).sum::<usize>();
    assert_eq!(matrix_calls, 30);

    assert_eq!(stats.dimensions, 5);
    assert_eq!(stats.matrix.cells, 30);
    assert_eq!(stats.matrix.errors, 3);
    assert_eq!(stats.matrix.found, 15);
    assert_eq!(stats.matrix.not_found, 12);
    assert!(stats.summarized);

    let report = sink.into_report(stats.calls_issued);
    assert_eq!(report.model_results.len(), 6);
    assert!(report.model_results.values().all(|row| row.len() == 5));

    let failed = &report.model_results["model4"]["taste"];
    assert!(failed.rank.is_error());
    assert!(failed.rank.label().contains("API error 500"));

    assert_eq!(report.model_results["model1"]["price"].rank, RankOutcome::found(2));
    assert_eq!(report.model_results["model1"]["price"].raw, "Carlsberg, Heineken, Guinness");
    assert_eq!(report.model_results["model2"]["taste"].rank, RankOutcome::NotFound);
    assert_eq!(report.summary, "Heineken leads on availability.");
}

#[tokio::test]
async fn test_call_budget_counts_every_call_and_stops_escalating() {
    let backend = scripted(|request| match request.model.as_str() {
        DISCOVERY_MODEL => Ok(FIVE_DIMENSIONS.to_string()),
        JUDGE_MODEL => Ok("0".to_string()),
        SUMMARY_MODEL => Ok("summary".to_string()),
        _ => Ok("Guinness, Carlsberg, Budweiser".to_string()),
    });
    let pipeline = RankPipeline::new(backend.clone(), test_settings(6, 45));

    let stats = pipeline.run(&heineken(), &BatchSink::new()).await.unwrap();

    // Replies settle immediately, so cells finish one after another: each cell
    // escalates while the count is below 45 and none do afterwards.
    assert_eq!(backend.calls_to(JUDGE_MODEL), 22);
    assert_eq!(stats.matrix.escalations, 22);
    assert_eq!(stats.matrix.not_found, 30);

    // 1 discovery + 30 matrix + 22 judge + 1 summary
    assert_eq!(stats.calls_issued, 54);
    assert_eq!(backend.call_count(), 54);
}

#[tokio::test]
async fn test_judge_identifies_renamed_company() {
    let backend = scripted(|request| match request.model.as_str() {
        DISCOVERY_MODEL => Ok("price".to_string()),
        JUDGE_MODEL => Ok("2".to_string()),
        SUMMARY_MODEL => Ok("summary".to_string()),
        _ => Ok("AB InBev, HNK Group, Carlsberg".to_string()),
    });
    let pipeline = RankPipeline::new(backend.clone(), test_settings(1, 45));
    let sink = BatchSink::new();

    let stats = pipeline.run(&heineken(), &sink).await.unwrap();

    let report = sink.into_report(stats.calls_issued);
    assert_eq!(report.model_results["model1"]["price"].rank, RankOutcome::found(2));

    let judge_call = backend
        .calls()
        .into_iter()
        .find(|c| c.model == JUDGE_MODEL)
        .unwrap();
    assert!(judge_call.user_prompt().contains("2. HNK Group"));
}

#[tokio::test]
async fn test_exhausted_budget_leaves_cells_not_found() {
    let backend = scripted(|request| match request.model.as_str() {
        DISCOVERY_MODEL => Ok("price, taste".to_string()),
        JUDGE_MODEL => Ok("1".to_string()),
        _ => Ok("Guinness".to_string()),
    });
    // Discovery plus the first matrix call already use the whole budget
    let pipeline = RankPipeline::new(backend.clone(), test_settings(3, 2));

    let stats = pipeline.run(&heineken(), &BatchSink::new()).await.unwrap();

    assert_eq!(backend.calls_to(JUDGE_MODEL), 0);
    assert_eq!(stats.matrix.not_found, 6);
    assert_eq!(stats.calls_issued, 8);
}

#[tokio::test]
async fn test_streaming_event_order() {
    let backend = scenario_backend();
    let pipeline = RankPipeline::new(backend, test_settings(6, 45));
    let (tx, mut rx) = mpsc::unbounded_channel();

    pipeline.run(&heineken(), &ChannelSink::new(tx)).await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 32);
    assert!(matches!(&events[0], RankEvent::Dimensions { dimensions } if dimensions.len() == 5));
    assert!(events[1..31].iter().all(|e| e.event_type() == "result"));
    assert!(matches!(&events[31], RankEvent::Summary { .. }));
}

#[tokio::test]
async fn test_discovery_failure_emits_only_error() {
    let backend = scripted(|_| Err(ClientError::Timeout(60)));
    let pipeline = RankPipeline::new(backend.clone(), test_settings(6, 45));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = pipeline.run(&heineken(), &ChannelSink::new(tx)).await;
    assert!(result.is_err());
    assert_eq!(backend.call_count(), 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type(), "error");
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_raw_reply_is_kept_verbatim() {
    let backend = scripted(|request| match request.model.as_str() {
        DISCOVERY_MODEL => Ok("price".to_string()),
        SUMMARY_MODEL => Ok("summary".to_string()),
        _ => Ok("Heineken,Carlsberg ,  Guinness".to_string()),
    });
    let pipeline = RankPipeline::new(backend, test_settings(1, 45));
    let sink = BatchSink::new();

    let stats = pipeline.run(&heineken(), &sink).await.unwrap();

    let report = sink.into_report(stats.calls_issued);
    let cell = &report.model_results["model1"]["price"];
    assert_eq!(cell.rank, RankOutcome::found(1));
    assert_eq!(cell.raw, "Heineken,Carlsberg ,  Guinness");
}

const DELAY_STEP_MS: u64 = 60;

/// `modelN` answers after `(7 - N) * DELAY_STEP_MS`, so later models settle first
#[derive(Default)]
struct DelayedBackend {
    summary_prompt: Mutex<Option<String>>,
}

#[async_trait]
impl ChatBackend for DelayedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<String, ClientError> {
        match request.model.as_str() {
            DISCOVERY_MODEL => Ok(FIVE_DIMENSIONS.to_string()),
            SUMMARY_MODEL => {
                *self.summary_prompt.lock().unwrap() = Some(request.user_prompt().to_string());
                Ok("summary".to_string())
            }
            JUDGE_MODEL => Ok("0".to_string()),
            model => {
                let n: u64 = model.trim_start_matches("model").parse().unwrap();
                tokio::time::sleep(Duration::from_millis((7 - n) * DELAY_STEP_MS)).await;
                Ok("Carlsberg, Heineken".to_string())
            }
        }
    }
}

#[tokio::test]
async fn test_matrix_cells_run_concurrently_and_settle_in_completion_order() {
    let backend = Arc::new(DelayedBackend::default());
    let pipeline = RankPipeline::new(backend.clone(), test_settings(6, 45));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let started = Instant::now();
    let stats = pipeline.run(&heineken(), &ChannelSink::new(tx)).await.unwrap();
    let elapsed = started.elapsed();

    // Slowest single call is 360 ms; one call at a time would take 6.3 s
    let slowest = Duration::from_millis(6 * DELAY_STEP_MS);
    assert!(elapsed >= slowest, "finished before the slowest call: {:?}", elapsed);
    assert!(elapsed < slowest * 4, "cells did not overlap: {:?}", elapsed);
    assert_eq!(stats.matrix.found, 30);

    let mut models = Vec::new();
    while let Some(event) = rx.recv().await {
        if let RankEvent::Result(cell) = event {
            models.push(cell.model);
        }
    }
    assert_eq!(models.len(), 30);
    assert!(models[..5].iter().all(|m| m == "model6"), "first results: {:?}", &models[..5]);
    assert!(models[25..].iter().all(|m| m == "model1"), "last results: {:?}", &models[25..]);

    // Transcript lines follow the same completion order
    let prompt = backend.summary_prompt.lock().unwrap().clone().unwrap();
    let lines: Vec<&str> = prompt.lines().filter(|l| l.contains(" | top list: ")).collect();
    assert_eq!(lines.len(), 30);
    assert!(lines[0].starts_with("model6 |"));
    assert!(lines[29].starts_with("model1 |"));
}
