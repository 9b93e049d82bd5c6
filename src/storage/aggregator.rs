use super::ArtifactPlanner;
use crate::models::Platform;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::info;

/// Extracted code lines per platform, in extraction order. One per job.
#[derive(Debug, Default)]
pub struct CodeAggregator {
    standard: Vec<String>,
    cme: Vec<String>,
}

impl CodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_mut(&mut self, platform: Platform) -> &mut Vec<String> {
        match platform {
            Platform::Standard => &mut self.standard,
            Platform::Cme => &mut self.cme,
        }
    }

    pub fn bucket(&self, platform: Platform) -> &[String] {
        match platform {
            Platform::Standard => &self.standard,
            Platform::Cme => &self.cme,
        }
    }

    pub fn push(&mut self, platform: Platform, code: impl Into<String>) {
        self.bucket_mut(platform).push(code.into());
    }

    /// Write one file per non-empty bucket and clear it. Empty buckets write nothing.
    pub fn flush(
        &mut self,
        planner: &ArtifactPlanner,
        at: NaiveDateTime,
    ) -> Result<Vec<(Platform, PathBuf)>> {
        let mut written = Vec::new();

        for platform in Platform::ALL {
            if self.bucket(platform).is_empty() {
                continue;
            }

            let path = planner.prepare_aggregate(platform, at)?;
            let lines = std::mem::take(self.bucket_mut(platform));
            std::fs::write(&path, lines.join("\n"))
                .with_context(|| format!("Failed to write aggregated codes to {:?}", path))?;

            info!("Saved {} aggregated TV codes to {:?}", lines.len(), path);
            written.push((platform, path));
        }

        Ok(written)
    }
}
