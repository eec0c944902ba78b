//! Collection runner contract.
//!
//! A runner executes a parsed collection and reports through three signals:
//! request events and assertion events on the channel, and a single
//! completion value returned from `execute`. The coordinator relays the
//! channel while `execute` is in flight and handles the completion last.

mod http;

pub use http::{HttpRunner, HttpRunnerConfig};

use crate::collection::Collection;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    RequestCompleted {
        item: Option<String>,
        status: Option<u16>,
        elapsed_ms: u64,
    },
    /// The exchange itself failed (bad URL, connection refused, timeout...).
    RequestFailed {
        item: Option<String>,
        error: String,
    },
    AssertionEvaluated {
        item: Option<String>,
        assertion: String,
        /// `None` when the assertion passed.
        error: Option<String>,
    },
}

/// Statistics reported by the runner at the end of a run.
/// Missing fields are filled in by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub requests_total: Option<u64>,
    pub failures: Option<u64>,
    /// Unix epoch milliseconds.
    pub started_ms: Option<i64>,
    pub completed_ms: Option<i64>,
}

/// Terminal signal of a run. Always produced, even when the runner failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCompletion {
    pub error: Option<String>,
    pub report: Option<RunReport>,
}

#[async_trait]
pub trait CollectionRunner: Send + Sync {
    async fn execute(
        &self,
        collection: Arc<Collection>,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> RunCompletion;
}

pub(crate) fn now_epoch_ms() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    (nanos / 1_000_000) as i64
}
