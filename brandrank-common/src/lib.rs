//! # Brandrank Common Library
//!
//! Shared code for the brandrank service and its tests:
//! - Error type
//! - Bootstrap configuration (TOML) and credential resolution
//! - Pipeline event vocabulary (`RankEvent`) and rank outcome types
//! - SSE framing helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
pub use events::{RankEvent, RankOutcome, RankResult};
