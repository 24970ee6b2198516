//! Ranking engine services
//!
//! Leaf-first: `string_matcher` (pure), `llm_client` + `call_budget`,
//! `entity_resolver`, `dimension_discovery` (Phase 1), `matrix_orchestrator`
//! (Phase 2), `summary_composer` (Phase 3), `result_sink`, and `pipeline`,
//! which runs the phases in order.

pub mod call_budget;
pub mod dimension_discovery;
pub mod entity_resolver;
pub mod llm_client;
pub mod matrix_orchestrator;
pub mod pipeline;
pub mod result_sink;
pub mod string_matcher;
pub mod summary_composer;

pub use call_budget::{CallBudget, DEFAULT_CALL_LIMIT};
pub use dimension_discovery::{DimensionDiscovery, DiscoveryError, MAX_DIMENSIONS};
pub use entity_resolver::EntityResolver;
pub use llm_client::{ChatBackend, ChatMessage, ChatRequest, ClientError, LlmClient, OpenRouterBackend};
pub use matrix_orchestrator::{MatrixOrchestrator, MatrixRun, MatrixStats};
pub use pipeline::{PipelineError, PipelineSettings, RankPipeline, RunStats};
pub use result_sink::{BatchSink, ChannelSink, ResultSink, SinkError};
pub use string_matcher::{find_rank, levenshtein};
pub use summary_composer::{SummaryComposer, SUMMARY_UNAVAILABLE};
