//! On-disk layout of everything a job produces.
//!
//! ```text
//! root/<Model>/<Ticker>/<Ticker>_<stamp>.<ext>        standard downloads
//! root/CME/<Model>/<Ticker>/<Ticker>_<stamp>.<ext>    CME downloads
//! root/[CME/]TV Code/TV_Codes_<stamp>.txt             aggregated codes
//! ```

pub mod aggregator;

pub use self::aggregator::CodeAggregator;

use crate::models::{CODE_MODEL, ModelName, Platform, Ticker};
use crate::utils::{format_timestamp, sanitize_segment};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;

// ── Planner ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ArtifactPlanner {
    root: PathBuf,
    extension: String,
}

impl ArtifactPlanner {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn platform_root(&self, platform: Platform) -> PathBuf {
        match platform.subfolder() {
            Some(sub) => self.root.join(sub),
            None => self.root.clone(),
        }
    }

    pub fn artifact_dir(&self, platform: Platform, model: &ModelName, ticker: &Ticker) -> PathBuf {
        self.platform_root(platform)
            .join(sanitize_segment(model.as_str()))
            .join(sanitize_segment(ticker.as_str()))
    }

    /// Planned download path. Pure; see [`Self::prepare_artifact`].
    pub fn artifact_path(
        &self,
        platform: Platform,
        model: &ModelName,
        ticker: &Ticker,
        at: NaiveDateTime,
    ) -> PathBuf {
        let stem = format!("{}_{}", sanitize_segment(ticker.as_str()), format_timestamp(at));
        self.artifact_dir(platform, model, ticker)
            .join(format!("{}.{}", stem, self.extension))
    }

    pub fn aggregate_dir(&self, platform: Platform) -> PathBuf {
        self.platform_root(platform).join(CODE_MODEL)
    }

    pub fn aggregate_path(&self, platform: Platform, at: NaiveDateTime) -> PathBuf {
        self.aggregate_dir(platform)
            .join(format!("TV_Codes_{}.txt", format_timestamp(at)))
    }

    /// Create the directory and return a download path that is not taken yet.
    pub fn prepare_artifact(
        &self,
        platform: Platform,
        model: &ModelName,
        ticker: &Ticker,
        at: NaiveDateTime,
    ) -> Result<PathBuf> {
        prepare(self.artifact_path(platform, model, ticker, at))
    }

    pub fn prepare_aggregate(&self, platform: Platform, at: NaiveDateTime) -> Result<PathBuf> {
        prepare(self.aggregate_path(platform, at))
    }
}

fn prepare(path: PathBuf) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    Ok(first_free(path))
}

/// `x.html` → `x_2.html` → `x_3.html` … until the name is unused.
fn first_free(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 2u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 25)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn model(s: &str) -> ModelName {
        ModelName::new(s).unwrap()
    }

    fn ticker(s: &str) -> Ticker {
        Ticker::new(s).unwrap()
    }

    #[test]
    fn test_standard_layout() {
        let p = ArtifactPlanner::new("/dl", "html");
        assert_eq!(
            p.artifact_path(Platform::Standard, &model("Gamma"), &ticker("SPX"), at()),
            PathBuf::from("/dl/Gamma/SPX/SPX_20241025_120000.html")
        );
    }

    #[test]
    fn test_cme_layout() {
        let p = ArtifactPlanner::new("/dl", ".html");
        assert_eq!(
            p.artifact_path(Platform::Cme, &model("Delta"), &ticker("ES"), at()),
            PathBuf::from("/dl/CME/Delta/ES/ES_20241025_120000.html")
        );
    }

    #[test]
    fn test_aggregate_layout() {
        let p = ArtifactPlanner::new("/dl", "html");
        assert_eq!(
            p.aggregate_path(Platform::Standard, at()),
            PathBuf::from("/dl/TV Code/TV_Codes_20241025_120000.txt")
        );
        assert_eq!(
            p.aggregate_path(Platform::Cme, at()),
            PathBuf::from("/dl/CME/TV Code/TV_Codes_20241025_120000.txt")
        );
    }

    #[test]
    fn test_segments_are_sanitized() {
        let p = ArtifactPlanner::new("/dl", "html");
        assert_eq!(
            p.artifact_path(Platform::Standard, &model("A/B"), &ticker("BRK:B"), at()),
            PathBuf::from("/dl/A_B/BRK_B/BRK_B_20241025_120000.html")
        );
    }

    #[test]
    fn test_dot_ticker_stays_inside_its_folder() {
        let p = ArtifactPlanner::new("/dl", "html");
        assert_eq!(
            p.artifact_path(Platform::Standard, &model("Gamma"), &ticker(".."), at()),
            PathBuf::from("/dl/Gamma/_/__20241025_120000.html")
        );
        assert_eq!(
            p.artifact_dir(Platform::Cme, &model("Gamma"), &ticker(".")),
            PathBuf::from("/dl/CME/Gamma/_")
        );
    }

    #[test]
    fn test_prepare_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let p = ArtifactPlanner::new(dir.path(), "html");

        let first = p.prepare_artifact(Platform::Standard, &model("Gamma"), &ticker("SPX"), at()).unwrap();
        assert!(first.parent().unwrap().is_dir());
        std::fs::write(&first, "one").unwrap();

        let second = p.prepare_artifact(Platform::Standard, &model("Gamma"), &ticker("SPX"), at()).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "SPX_20241025_120000_2.html");
        std::fs::write(&second, "two").unwrap();

        let third = p.prepare_artifact(Platform::Standard, &model("Gamma"), &ticker("SPX"), at()).unwrap();
        assert_eq!(third.file_name().unwrap(), "SPX_20241025_120000_3.html");
    }
}
