//! Deterministic stand-in for the platform page, driven by a JSON site script.
//!
//! Used for rehearsing a job (`lieta-batch replay`) and by every core test.
//! Submitting a ticker without a script leaves the previous ticker's content on
//! screen, which is how stale renders are reproduced.
//!
//! ```json
//! {
//!   "standard": {
//!     "idle_body": "Welcome",
//!     "models": ["Gamma", "TV Code"],
//!     "tickers": {
//!       "AAPL": { "frames": ["AAPL Dealers Gamma Hedging"], "computing": true },
//!       "XYZ":  { "computing": true, "toast": "獲取數據失敗" },
//!       "MSFT": { "frames": ["MSFT chart"], "download": { "kind": "toast", "message": "Please Try Again" } }
//!     }
//!   }
//! }
//! ```

use super::{BrowserSession, DownloadHandle, DownloadWait, PageDriver};
use crate::models::Platform;
use crate::scraper::ui;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// ── Script ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteScript {
    #[serde(default)]
    pub standard: PageScript,
    #[serde(default)]
    pub cme: PageScript,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageScript {
    /// Body text before any ticker was submitted.
    #[serde(default)]
    pub idle_body: String,
    /// Selectable models; empty accepts any.
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub tickers: HashMap<String, TickerScript>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TickerScript {
    /// Body text returned by successive reads; the last frame repeats.
    #[serde(default)]
    pub frames: Vec<String>,
    /// Show the computing indicator while this ticker is on screen.
    #[serde(default)]
    pub computing: bool,
    /// Failure notification shown right after submission.
    #[serde(default)]
    pub toast: Option<String>,
    /// Number of confirm clicks the page drops before reacting.
    #[serde(default)]
    pub ignored_submits: u32,
    #[serde(default)]
    pub download: DownloadScript,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadScript {
    Deliver {
        #[serde(default)]
        content: String,
    },
    /// Clicking download raises this notification instead.
    Toast { message: String },
    Never,
}

impl Default for DownloadScript {
    fn default() -> Self {
        DownloadScript::Deliver { content: String::new() }
    }
}

impl SiteScript {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid site script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read site script {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("In {:?}", path))
    }

    fn page(&self, platform: Platform) -> &PageScript {
        match platform {
            Platform::Standard => &self.standard,
            Platform::Cme => &self.cme,
        }
    }
}

impl PageScript {
    pub fn with_ticker(mut self, ticker: &str, script: TickerScript) -> Self {
        self.tickers.insert(ticker.to_string(), script);
        self
    }
}

impl TickerScript {
    /// Content that renders immediately.
    pub fn rendered(frame: impl Into<String>) -> Self {
        Self {
            frames: vec![frame.into()],
            ..Default::default()
        }
    }

    pub fn computing(mut self) -> Self {
        self.computing = true;
        self
    }

    pub fn then(mut self, frame: impl Into<String>) -> Self {
        self.frames.push(frame.into());
        self
    }

    pub fn with_toast(mut self, toast: impl Into<String>) -> Self {
        self.toast = Some(toast.into());
        self
    }

    pub fn ignoring(mut self, submits: u32) -> Self {
        self.ignored_submits = submits;
        self
    }

    pub fn with_download(mut self, download: DownloadScript) -> Self {
        self.download = download;
        self
    }
}

// ── Observations ──────────────────────────────────────────────────────────────

/// What the scripted browser saw happen, for inspection after a run.
#[derive(Debug, Default)]
pub struct SessionLog {
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    submissions: Mutex<Vec<String>>,
    selected_models: Mutex<Vec<String>>,
    saved: Mutex<Vec<PathBuf>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionLog {
    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    /// Every confirm click, in order, including ignored ones.
    pub fn submissions(&self) -> Vec<String> {
        lock(&self.submissions).clone()
    }

    pub fn selected_models(&self) -> Vec<String> {
        lock(&self.selected_models).clone()
    }

    /// Paths passed to `save_as`, in order.
    pub fn saved_paths(&self) -> Vec<PathBuf> {
        lock(&self.saved).clone()
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScriptedSession {
    site: Arc<SiteScript>,
    log: Arc<SessionLog>,
    stop_on_submit: Option<(String, CancellationToken)>,
}

impl ScriptedSession {
    pub fn new(site: SiteScript) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(SessionLog::default()),
            stop_on_submit: None,
        }
    }

    pub fn log(&self) -> Arc<SessionLog> {
        Arc::clone(&self.log)
    }

    /// Cancel `token` the moment `ticker` is submitted, like a user pressing stop.
    pub fn stop_on_submit(mut self, ticker: &str, token: CancellationToken) -> Self {
        self.stop_on_submit = Some((ticker.to_string(), token));
        self
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>> {
        self.log.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            stop_on_submit: self.stop_on_submit.clone(),
            state: Mutex::new(PageState::default()),
        }))
    }
}

// ── Page ──────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct PageState {
    platform: Option<Platform>,
    picker_open: bool,
    model: Option<String>,
    input: String,
    /// Ticker whose content is currently rendered.
    shown: Option<String>,
    reads: usize,
    submits: HashMap<String, u32>,
    toast: Option<String>,
    download_tx: Option<oneshot::Sender<ScriptedDownload>>,
    closed: bool,
}

struct ScriptedPage {
    site: Arc<SiteScript>,
    log: Arc<SessionLog>,
    stop_on_submit: Option<(String, CancellationToken)>,
    state: Mutex<PageState>,
}

impl ScriptedPage {
    fn state(&self) -> Result<MutexGuard<'_, PageState>> {
        let st = lock(&self.state);
        if st.closed {
            bail!("page is closed");
        }
        Ok(st)
    }

    fn script(&self, st: &PageState) -> Result<&PageScript> {
        let platform = st
            .platform
            .ok_or_else(|| anyhow!("page has not navigated anywhere"))?;
        Ok(self.site.page(platform))
    }

    fn visible_lines(&self, st: &PageState) -> Result<Vec<String>> {
        let script = self.script(st)?;
        let mut lines = Vec::new();

        match st.shown.as_ref().and_then(|t| script.tickers.get(t)) {
            Some(ts) => {
                if let Some(frame) = ts.frames.get(st.reads.min(ts.frames.len().saturating_sub(1))) {
                    lines.extend(frame.lines().map(str::to_string));
                }
                if ts.computing {
                    lines.push(ui::COMPUTING_TEXT.to_string());
                }
            }
            None => lines.extend(script.idle_body.lines().map(str::to_string)),
        }
        if let Some(toast) = &st.toast {
            lines.push(toast.clone());
        }
        Ok(lines)
    }

    fn submit(&self, st: &mut PageState) -> Result<()> {
        if st.model.is_none() {
            bail!("no model selected");
        }
        let ticker = st.input.clone();
        lock(&self.log.submissions).push(ticker.clone());

        if let Some((target, token)) = &self.stop_on_submit {
            if *target == ticker {
                token.cancel();
            }
        }

        let n = {
            let n = st.submits.entry(ticker.clone()).or_insert(0);
            *n += 1;
            *n
        };
        st.toast = None;

        let Some(ts) = self.script(st)?.tickers.get(&ticker).cloned() else {
            debug!("scripted page: {} has no script, previous content stays", ticker);
            return Ok(());
        };
        if n <= ts.ignored_submits {
            debug!("scripted page: ignoring submit {} for {}", n, ticker);
            return Ok(());
        }

        st.shown = Some(ticker);
        st.reads = 0;
        st.toast = ts.toast;
        Ok(())
    }

    fn click_download(&self, st: &mut PageState) -> Result<()> {
        let script = self.script(st)?;
        let Some(ts) = st.shown.as_ref().and_then(|t| script.tickers.get(t)) else {
            return Ok(());
        };
        match ts.download.clone() {
            DownloadScript::Deliver { content } => {
                if let Some(tx) = st.download_tx.take() {
                    let _ = tx.send(ScriptedDownload {
                        content,
                        log: Arc::clone(&self.log),
                    });
                }
            }
            DownloadScript::Toast { message } => st.toast = Some(message),
            DownloadScript::Never => {}
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut st = self.state()?;
        let platform = if url.trim_end_matches('/').ends_with("/cme") {
            Platform::Cme
        } else {
            Platform::Standard
        };
        *st = PageState {
            platform: Some(platform),
            ..Default::default()
        };
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        self.state().map(|_| ())
    }

    async fn click_by_visible_text(&self, text: &str, exact: bool) -> Result<()> {
        let mut st = self.state()?;
        if !exact && text == ui::MODEL_PICKER {
            st.picker_open = true;
            return Ok(());
        }
        if exact && st.picker_open {
            let script = self.script(&st)?;
            if !script.models.is_empty() && !script.models.iter().any(|m| m == text) {
                bail!("no visible element with text {:?}", text);
            }
            st.picker_open = false;
            st.model = Some(text.to_string());
            lock(&self.log.selected_models).push(text.to_string());
            return Ok(());
        }
        let visible = self.visible_lines(&st)?;
        let found = visible
            .iter()
            .any(|l| if exact { l.trim() == text } else { l.contains(text) });
        if found {
            Ok(())
        } else {
            bail!("no visible element with text {:?}", text)
        }
    }

    async fn fill_by_placeholder(&self, placeholder: &str, value: &str) -> Result<()> {
        let mut st = self.state()?;
        if placeholder != ui::TICKER_PLACEHOLDER {
            bail!("no input with placeholder {:?}", placeholder);
        }
        st.input = value.to_string();
        Ok(())
    }

    async fn click_by_role(&self, role: &str, name: &str) -> Result<()> {
        let mut st = self.state()?;
        if role != ui::BUTTON_ROLE {
            bail!("no element with role {:?}", role);
        }
        match name {
            ui::CONFIRM_BUTTON => self.submit(&mut st),
            ui::DOWNLOAD_BUTTON => self.click_download(&mut st),
            other => bail!("no button named {:?}", other),
        }
    }

    async fn count_by_visible_text(&self, text: &str) -> Result<usize> {
        let st = self.state()?;
        Ok(self.visible_lines(&st)?.iter().filter(|l| l.contains(text)).count())
    }

    async fn read_body_text(&self) -> Result<String> {
        let mut st = self.state()?;
        let body = self.visible_lines(&st)?.join("\n");
        if st.shown.is_some() {
            st.reads += 1;
        }
        Ok(body)
    }

    fn expect_download(&self, timeout: Duration) -> DownloadWait<'_> {
        let (tx, rx) = oneshot::channel();
        let armed = self.state().map(|mut st| st.download_tx = Some(tx));

        Box::pin(async move {
            armed?;
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(download)) => Ok(Box::new(download) as Box<dyn DownloadHandle>),
                Ok(Err(_)) => Err(anyhow!("download listener was discarded")),
                Err(_) => Err(anyhow!("timeout {:?} exceeded while waiting for download", timeout)),
            }
        })
    }

    async fn close(&self) -> Result<()> {
        let mut st = self.state()?;
        st.closed = true;
        st.download_tx = None;
        self.log.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedDownload {
    content: String,
    log: Arc<SessionLog>,
}

#[async_trait]
impl DownloadHandle for ScriptedDownload {
    async fn save_as(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.content)
            .with_context(|| format!("Failed to save download to {:?}", path))?;
        lock(&self.log.saved).push(path.to_path_buf());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
