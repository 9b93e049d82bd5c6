//! Browser boundary. The core only talks to pages through these traits, so the
//! engine behind them (Playwright, CDP, a replay script) can change freely.

pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

/// Pending download returned by [`PageDriver::expect_download`].
pub type DownloadWait<'a> =
    Pin<Box<dyn Future<Output = Result<Box<dyn DownloadHandle>>> + Send + 'a>>;

/// One browser tab, exclusively owned by one model queue.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn wait_for_network_idle(&self) -> Result<()>;
    async fn click_by_visible_text(&self, text: &str, exact: bool) -> Result<()>;
    async fn fill_by_placeholder(&self, placeholder: &str, value: &str) -> Result<()>;
    async fn click_by_role(&self, role: &str, name: &str) -> Result<()>;
    /// Number of visible elements whose text contains `text`.
    async fn count_by_visible_text(&self, text: &str) -> Result<usize>;
    /// `document.body.innerText`
    async fn read_body_text(&self) -> Result<String>;

    /// Arm a download listener. Must start listening before returning, so a
    /// download triggered right after this call is not missed.
    fn expect_download(&self, timeout: Duration) -> DownloadWait<'_>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait DownloadHandle: Send + Sync {
    async fn save_as(&self, path: &Path) -> Result<()>;
}

/// Logged-in browser context shared by every queue of a job. Read-only to the core.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>>;
}
