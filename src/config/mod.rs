use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::models::Platform;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the two platform sections live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_standard_path")]
    pub standard_path: String,

    #[serde(default = "default_cme_path")]
    pub cme_path: String,
}

/// Retry budget and every bounded wait used while driving a page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_early_check_ms")]
    pub early_check_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_render_settle_ms")]
    pub render_settle_ms: u64,

    #[serde(default = "default_model_select_settle_ms")]
    pub model_select_settle_ms: u64,

    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
}

/// Job defaults; CLI flags override these
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default = "default_destination_root")]
    pub destination_root: PathBuf,

    #[serde(default)]
    pub concurrent_across_models: bool,

    #[serde(default)]
    pub ticker_file: Option<PathBuf>,

    #[serde(default)]
    pub cme_ticker_file: Option<PathBuf>,

    #[serde(default)]
    pub models: Vec<String>,

    #[serde(default)]
    pub cme_models: Vec<String>,

    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for per-run log files; unset disables them.
    #[serde(default = "default_log_dir")]
    pub dir: Option<PathBuf>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.lietaresearch.com".to_string()
}
fn default_standard_path() -> String {
    "platform".to_string()
}
fn default_cme_path() -> String {
    "platform/cme".to_string()
}
fn default_max_attempts() -> u32 {
    15
}
fn default_retry_backoff_ms() -> u64 {
    2000
}
fn default_early_check_ms() -> u64 {
    2000
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_poll_timeout_secs() -> u64 {
    60
}
fn default_download_timeout_secs() -> u64 {
    60
}
fn default_render_settle_ms() -> u64 {
    1000
}
fn default_model_select_settle_ms() -> u64 {
    500
}
fn default_action_timeout_secs() -> u64 {
    60
}
fn default_destination_root() -> PathBuf {
    PathBuf::from("downloads")
}
fn default_artifact_extension() -> String {
    "html".to_string()
}
fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            standard_path: default_standard_path(),
            cme_path: default_cme_path(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            early_check_ms: default_early_check_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            render_settle_ms: default_render_settle_ms(),
            model_select_settle_ms: default_model_select_settle_ms(),
            action_timeout_secs: default_action_timeout_secs(),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            destination_root: default_destination_root(),
            concurrent_across_models: false,
            ticker_file: None,
            cme_ticker_file: None,
            models: Vec::new(),
            cme_models: Vec::new(),
            artifact_extension: default_artifact_extension(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: default_log_dir() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            timing: TimingConfig::default(),
            job: JobConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ── Derived values ───────────────────────────────────────────────────────────

impl PlatformConfig {
    /// Entry URL of a platform section, e.g. `https://host/platform/cme`.
    pub fn url(&self, platform: Platform) -> Result<Url> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        let base = Url::parse(&base).with_context(|| format!("Invalid base_url {:?}", self.base_url))?;
        let path = match platform {
            Platform::Standard => &self.standard_path,
            Platform::Cme => &self.cme_path,
        };
        base.join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid {} path {:?}", platform, path))
    }
}

impl TimingConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn early_check(&self) -> Duration {
        Duration::from_millis(self.early_check_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Number of poll ticks that fit in the poll timeout (120 with defaults).
    pub fn poll_ticks(&self) -> u32 {
        let ticks = (self.poll_timeout_secs * 1000) / self.poll_interval_ms.max(1);
        ticks.clamp(1, u32::MAX as u64) as u32
    }

    /// Ticks for the toast watch that runs beside a download wait.
    pub fn download_watch_ticks(&self) -> u32 {
        let ticks = (self.download_timeout_secs * 1000) / self.poll_interval_ms.max(1);
        ticks.clamp(1, u32::MAX as u64) as u32
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    pub fn model_select_settle(&self) -> Duration {
        Duration::from_millis(self.model_select_settle_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("LIETA").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Configuration does not match the expected schema")?;
        Ok(app_cfg)
    }
}
