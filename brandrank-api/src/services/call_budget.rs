//! Per-request cap on outbound model calls
//!
//! Every call made through [`LlmClient`](super::LlmClient) is recorded here.
//! Escalations to the entity resolution judge check [`CallBudget::has_headroom`]
//! immediately before they run. Headroom is checked, not reserved, so with many
//! cells in flight the cap can be overshot by the number of concurrent escalations.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default per-request call limit
pub const DEFAULT_CALL_LIMIT: usize = 45;

#[derive(Debug)]
pub struct CallBudget {
    count: AtomicUsize,
    limit: usize,
}

impl CallBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            limit,
        }
    }

    /// Count one issued call; returns the new total
    pub fn record_call(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while fewer calls than the limit have been issued
    pub fn has_headroom(&self) -> bool {
        self.count() < self.limit
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.count())
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_LIMIT)
    }
}
