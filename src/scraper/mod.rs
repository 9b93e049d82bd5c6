pub mod attempt;
pub mod error;
pub mod queue;
pub mod text;
pub mod ui;

use crate::config::TimingConfig;
use crate::progress::Reporter;
use crate::storage::ArtifactPlanner;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use self::error::AttemptError;

pub use self::attempt::process_ticker;
pub use self::queue::{ModelQueue, QueueReport};

// ── Shared job state ──────────────────────────────────────────────────────────

/// Read-only state every queue of a job shares.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub timing: TimingConfig,
    pub planner: ArtifactPlanner,
    pub stop: CancellationToken,
    pub reporter: Reporter,
}

impl JobContext {
    pub fn new(
        timing: TimingConfig,
        planner: ArtifactPlanner,
        stop: CancellationToken,
        reporter: Reporter,
    ) -> Self {
        Self { timing, planner, stop, reporter }
    }
}

/// Run one page action under a deadline.
pub(crate) async fn bounded<T, F>(limit: Duration, what: &'static str, fut: F) -> Result<T, AttemptError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(AttemptError::Driver),
        Err(_) => Err(AttemptError::ActionTimeout { what, limit }),
    }
}
