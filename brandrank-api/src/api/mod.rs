//! HTTP API handlers for brandrank-api
//!
//! Thin adapter: validate input, pick a result sink, run the pipeline.

pub mod health;
pub mod rank;

pub use health::health_routes;
pub use rank::rank_routes;
