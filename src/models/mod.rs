use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The model that yields a scraped text code instead of a downloaded file.
pub const CODE_MODEL: &str = "TV Code";

const STANDARD_CATALOGUE: &[&str] = &[
    "Gamma", "Delta", "Theta", "Term", "Smile", "Levels", "Table", CODE_MODEL,
];
const CME_CATALOGUE: &[&str] = &["Gamma", "Delta", "Smile", "Term", CODE_MODEL];

// ── Platform ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Standard,
    Cme,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Standard, Platform::Cme];

    pub fn catalogue(self) -> &'static [&'static str] {
        match self {
            Platform::Standard => STANDARD_CATALOGUE,
            Platform::Cme => CME_CATALOGUE,
        }
    }

    /// Extra directory level under the destination root.
    pub fn subfolder(self) -> Option<&'static str> {
        match self {
            Platform::Standard => None,
            Platform::Cme => Some("CME"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Standard => f.write_str("Standard"),
            Platform::Cme => f.write_str("CME"),
        }
    }
}

// ── Ticker / model names ──────────────────────────────────────────────────────

/// Case-preserving security identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(s: impl AsRef<str>) -> Option<Self> {
        let s = s.as_ref().trim();
        if s.is_empty() { None } else { Some(Self(s.to_string())) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    pub fn new(s: impl AsRef<str>) -> Option<Self> {
        let s = s.as_ref().trim();
        if s.is_empty() { None } else { Some(Self(s.to_string())) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `TV Code` takes the extraction branch on both platforms.
    pub fn is_code_extraction(&self) -> bool {
        self.0 == CODE_MODEL
    }

    pub fn in_catalogue(&self, platform: Platform) -> bool {
        platform.catalogue().contains(&self.0.as_str())
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log prefix of a model queue: `[Gamma]` or `[CME-Gamma]`.
pub fn queue_label(platform: Platform, model: &ModelName) -> String {
    match platform {
        Platform::Standard => format!("[{}]", model),
        Platform::Cme => format!("[CME-{}]", model),
    }
}

// ── Work items and outcomes ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub platform: Platform,
    pub model: ModelName,
    pub ticker: Ticker,
}

impl WorkItem {
    pub fn new(platform: Platform, model: ModelName, ticker: Ticker) -> Self {
        Self { platform, model, ticker }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", queue_label(self.platform, &self.model), self.ticker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Artifact {
    File(PathBuf),
    Code(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Click ignored, server toast, download never arrived.
    TransientUi,
    /// Rendered content never matched the submitted ticker.
    Validation,
    ModelSelection,
    /// Page could not be opened or the queue task died.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Success(Artifact),
    Failure { kind: FailureKind, reason: String },
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    Failed { kind: FailureKind, reason: String },
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub item: WorkItem,
    pub failure: Failure,
}

impl FailedItem {
    pub fn failed(item: WorkItem, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self { item, failure: Failure::Failed { kind, reason: reason.into() } }
    }

    pub fn stopped(item: WorkItem) -> Self {
        Self { item, failure: Failure::Stopped }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.failure, Failure::Stopped)
    }

    pub fn reason(&self) -> &str {
        match &self.failure {
            Failure::Failed { reason, .. } => reason,
            Failure::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for FailedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            Failure::Stopped => write!(f, "{} (Stopped)", self.item),
            Failure::Failed { reason, .. } => write!(f, "{}: {}", self.item, reason),
        }
    }
}

// ── Job plan ──────────────────────────────────────────────────────────────────

/// Everything a run needs. Immutable once the run starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPlan {
    pub standard_tickers: Vec<Ticker>,
    pub standard_models: Vec<ModelName>,
    pub cme_tickers: Vec<Ticker>,
    pub cme_models: Vec<ModelName>,
    pub destination_root: PathBuf,
    pub concurrent_across_models: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("no models selected (Standard or CME)")]
    NothingSelected,
    #[error("{0} models selected but the {0} ticker list is empty")]
    MissingTickers(Platform),
    #[error("model {model:?} is not offered on the {platform} platform")]
    UnknownModel { platform: Platform, model: String },
    #[error("no destination folder given")]
    MissingDestination,
}

impl JobPlan {
    pub fn tickers(&self, platform: Platform) -> &[Ticker] {
        match platform {
            Platform::Standard => &self.standard_tickers,
            Platform::Cme => &self.cme_tickers,
        }
    }

    pub fn models(&self, platform: Platform) -> &[ModelName] {
        match platform {
            Platform::Standard => &self.standard_models,
            Platform::Cme => &self.cme_models,
        }
    }

    /// Platform × model × ticker, in processing order.
    pub fn work_items(&self) -> Vec<WorkItem> {
        let mut items = Vec::new();
        for platform in Platform::ALL {
            let tickers = self.tickers(platform);
            for model in self.models(platform) {
                for ticker in tickers {
                    items.push(WorkItem::new(platform, model.clone(), ticker.clone()));
                }
            }
        }
        items
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.destination_root.as_os_str().is_empty() {
            return Err(PlanError::MissingDestination);
        }
        if self.standard_models.is_empty() && self.cme_models.is_empty() {
            return Err(PlanError::NothingSelected);
        }
        for platform in Platform::ALL {
            let models = self.models(platform);
            if !models.is_empty() && self.tickers(platform).is_empty() {
                return Err(PlanError::MissingTickers(platform));
            }
            if let Some(model) = models.iter().find(|m| !m.in_catalogue(platform)) {
                return Err(PlanError::UnknownModel {
                    platform,
                    model: model.to_string(),
                });
            }
        }
        Ok(())
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobSummary {
    pub success_count: usize,
    pub failed_items: Vec<FailedItem>,
    pub downloads: Vec<PathBuf>,
    pub aggregate_files: Vec<PathBuf>,
    /// Aggregate files that could not be written. The codes are still counted as successes.
    pub aggregate_errors: Vec<String>,
}

impl JobSummary {
    pub fn total(&self) -> usize {
        self.success_count + self.failed_items.len()
    }

    pub fn stopped_count(&self) -> usize {
        self.failed_items.iter().filter(|f| f.is_stopped()).count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers(list: &[&str]) -> Vec<Ticker> {
        list.iter().filter_map(Ticker::new).collect()
    }

    fn models(list: &[&str]) -> Vec<ModelName> {
        list.iter().filter_map(ModelName::new).collect()
    }

    #[test]
    fn test_ticker_trims_and_rejects_empty() {
        assert_eq!(Ticker::new("  spx ").unwrap().as_str(), "spx");
        assert!(Ticker::new("   ").is_none());
    }

    #[test]
    fn test_code_model_detection() {
        assert!(ModelName::new("TV Code").unwrap().is_code_extraction());
        assert!(!ModelName::new("tv code").unwrap().is_code_extraction());
        assert!(!ModelName::new("Gamma").unwrap().is_code_extraction());
    }

    #[test]
    fn test_work_items_order() {
        let plan = JobPlan {
            standard_tickers: tickers(&["AAPL", "MSFT"]),
            standard_models: models(&["Gamma", "TV Code"]),
            cme_tickers: tickers(&["ES"]),
            cme_models: models(&["Delta"]),
            destination_root: "out".into(),
            concurrent_across_models: false,
        };
        let labels: Vec<String> = plan.work_items().iter().map(|w| w.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "[Gamma] AAPL",
                "[Gamma] MSFT",
                "[TV Code] AAPL",
                "[TV Code] MSFT",
                "[CME-Delta] ES",
            ]
        );
    }

    #[test]
    fn test_empty_platform_contributes_nothing() {
        let plan = JobPlan {
            standard_tickers: tickers(&["AAPL"]),
            standard_models: vec![],
            cme_tickers: vec![],
            cme_models: models(&["Gamma"]),
            destination_root: "out".into(),
            concurrent_across_models: false,
        };
        assert!(plan.work_items().is_empty());
    }

    #[test]
    fn test_validate() {
        let mut plan = JobPlan {
            standard_tickers: tickers(&["AAPL"]),
            standard_models: models(&["Gamma"]),
            destination_root: "out".into(),
            ..Default::default()
        };
        assert_eq!(plan.validate(), Ok(()));

        plan.cme_models = models(&["Gamma"]);
        assert_eq!(plan.validate(), Err(PlanError::MissingTickers(Platform::Cme)));

        plan.cme_tickers = tickers(&["ES"]);
        plan.cme_models = models(&["Theta"]);
        assert_eq!(
            plan.validate(),
            Err(PlanError::UnknownModel { platform: Platform::Cme, model: "Theta".into() })
        );

        let empty = JobPlan { destination_root: "out".into(), ..Default::default() };
        assert_eq!(empty.validate(), Err(PlanError::NothingSelected));

        let no_dest = JobPlan { standard_models: models(&["Gamma"]), ..Default::default() };
        assert_eq!(no_dest.validate(), Err(PlanError::MissingDestination));
    }

    #[test]
    fn test_failed_item_display() {
        let item = WorkItem::new(
            Platform::Cme,
            ModelName::new("Gamma").unwrap(),
            Ticker::new("ES").unwrap(),
        );
        assert_eq!(FailedItem::stopped(item.clone()).to_string(), "[CME-Gamma] ES (Stopped)");
        let failed = FailedItem::failed(item, FailureKind::TransientUi, "boom");
        assert_eq!(failed.to_string(), "[CME-Gamma] ES: boom");
        assert_eq!(failed.reason(), "boom");
    }
}
