//! Human-readable progress lines for whoever drives a job (CLI, desktop shell).

use crate::models::{Artifact, ModelName, Platform, WorkItem, queue_label};
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    ModelSelected { platform: Platform, model: ModelName },
    AttemptFailed { item: WorkItem, attempt: u32, max_attempts: u32, reason: String },
    TickerSucceeded { item: WorkItem, artifact: Artifact },
    TickerFailed { item: WorkItem, reason: String },
    QueueStopped { platform: Platform, model: ModelName, skipped: usize },
    QueueAborted { platform: Platform, model: ModelName, reason: String },
    AggregateSaved { platform: Platform, path: PathBuf },
    JobFinished { success: usize, failed: usize, stopped: usize },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::ModelSelected { platform, model } => {
                write!(f, "{} Model selected.", queue_label(*platform, model))
            }
            Progress::AttemptFailed { item, attempt, max_attempts, reason } => {
                write!(f, "{} - Attempt {}/{} failed: {}", item, attempt, max_attempts, reason)
            }
            Progress::TickerSucceeded { item, artifact: Artifact::File(path) } => {
                write!(f, "{} - Downloaded to {}", item, path.display())
            }
            Progress::TickerSucceeded { item, artifact: Artifact::Code(_) } => {
                write!(f, "{} - Code extracted.", item)
            }
            Progress::TickerFailed { item, reason } => {
                write!(f, "{} - Skipped after retries: {}", item, reason)
            }
            Progress::QueueStopped { platform, model, skipped } => write!(
                f,
                "{} Stopped. Skipping {} remaining ticker(s).",
                queue_label(*platform, model),
                skipped
            ),
            Progress::QueueAborted { platform, model, reason } => {
                write!(f, "{} Error: {}", queue_label(*platform, model), reason)
            }
            Progress::AggregateSaved { platform, path } => {
                write!(f, "Saved aggregated {} TV codes to {}", platform, path.display())
            }
            Progress::JobFinished { success, failed, stopped } => write!(
                f,
                "Job finished: {} succeeded, {} failed ({} stopped)",
                success, failed, stopped
            ),
        }
    }
}

/// Traces every event and forwards it to the caller's channel, if any.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    tx: Option<UnboundedSender<Progress>>,
}

impl Reporter {
    pub fn new(tx: UnboundedSender<Progress>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Tracing only.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: Progress) {
        match &event {
            Progress::AttemptFailed { .. } | Progress::QueueStopped { .. } => warn!("{}", event),
            Progress::TickerFailed { .. } | Progress::QueueAborted { .. } => error!("{}", event),
            _ => info!("{}", event),
        }
        if let Some(tx) = &self.tx {
            // A receiver that went away only loses progress lines.
            let _ = tx.send(event);
        }
    }
}
