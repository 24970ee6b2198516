//! Request-scoped data model for a ranking run

pub mod rank_query;
pub mod report;

pub use rank_query::RankQuery;
pub use report::{Dimension, FinalReport, MatrixResults, ModelId, QuickResults, Transcript};
