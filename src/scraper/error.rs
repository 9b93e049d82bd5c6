use crate::models::FailureKind;
use std::time::Duration;
use thiserror::Error;

/// Why a single attempt at one ticker failed. Every variant is retried.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("no loading screen or data update detected after {0:?} (click might have been ignored)")]
    NotAcknowledged(Duration),

    #[error("server indicated failure: {0}")]
    ServerFailure(String),

    #[error("ticker '{0}' not found in loaded content (stale data?)")]
    StaleData(String),

    #[error("stale data detected: found '{marker}' but not for {ticker}")]
    StaleMarker { ticker: String, marker: &'static str },

    #[error("no code line found for ticker {0} (stale data from previous search?)")]
    CodeTimeout(String),

    #[error("download did not arrive within {0:?}")]
    DownloadTimeout(Duration),

    #[error("{what} timed out after {limit:?}")]
    ActionTimeout { what: &'static str, limit: Duration },

    #[error("page action failed: {0:#}")]
    Driver(#[from] anyhow::Error),

    #[error("could not store artifact: {0:#}")]
    Storage(anyhow::Error),
}

impl AttemptError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AttemptError::StaleData(_)
            | AttemptError::StaleMarker { .. }
            | AttemptError::CodeTimeout(_) => FailureKind::Validation,
            _ => FailureKind::TransientUi,
        }
    }
}

/// Failures that take down a whole model queue rather than one attempt.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("could not open page: {0}")]
    PageInit(AttemptError),

    #[error("model selection failed: {0}")]
    ModelSelection(AttemptError),
}

impl QueueError {
    pub fn kind(&self) -> FailureKind {
        match self {
            QueueError::PageInit(_) => FailureKind::Internal,
            QueueError::ModelSelection(_) => FailureKind::ModelSelection,
        }
    }
}
