//! One ticker on an already prepared page.
//!
//! A single attempt walks the phases below; [`process_ticker`] repeats
//! attempts with a fixed backoff until one resolves or the budget is spent.
//!
//! ```text
//! Idle ─submit─▶ Submitted ─delay─▶ EarlyCheck ─ack─▶ Polling{0..n} ─match─▶ Rendered
//!                                                                              │
//!                              Resolved ◀── Extracting{0..n} (TV Code) ◀───────┤
//!                              Resolved ◀── Downloading (others) ◀─────────────┘
//! ```
//!
//! Every transition checks the stop token first, so a stop lands within one
//! poll interval.

use super::error::AttemptError;
use super::text::{clean_code_line, find_code_line, mentions_ticker, toast_message};
use super::{JobContext, bounded, ui};
use crate::driver::{DownloadHandle, PageDriver};
use crate::models::{Artifact, AttemptResult, WorkItem};
use crate::progress::Progress;
use crate::utils::now_local;
use tokio::time::sleep;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, trace};

#[derive(Debug)]
pub enum Phase {
    Idle,
    Submitted,
    EarlyCheck,
    Polling { tick: u32 },
    Rendered,
    Extracting { tick: u32 },
    Downloading,
    Resolved(Resolution),
}

#[derive(Debug)]
pub enum Resolution {
    Success(Artifact),
    Failed(AttemptError),
    Stopped,
}

// ── Verdicts ──────────────────────────────────────────────────────────────────

/// The page reacted to the submit if it is computing or already shows the ticker.
pub fn judge_early(computing: bool, body: &str, ticker: &str) -> bool {
    computing || mentions_ticker(body, ticker)
}

#[derive(Debug, PartialEq, Eq)]
pub enum RenderVerdict {
    ServerFailure(String),
    Rendered,
    Pending,
}

/// Toasts win over content; content must name the submitted ticker.
pub fn judge_render(toast: Option<String>, body: &str, ticker: &str) -> RenderVerdict {
    match toast {
        Some(msg) => RenderVerdict::ServerFailure(msg),
        None if mentions_ticker(body, ticker) => RenderVerdict::Rendered,
        None => RenderVerdict::Pending,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CodeVerdict {
    Found(String),
    /// Marker on screen, but only for some other ticker.
    StaleMarker,
    ServerFailure(String),
    Pending,
}

pub fn judge_code(marker_visible: bool, toast: Option<String>, body: &str, ticker: &str) -> CodeVerdict {
    if marker_visible {
        if let Some(line) = find_code_line(body, ticker, ui::CODE_MARKER) {
            return CodeVerdict::Found(clean_code_line(line));
        }
    }
    match toast {
        Some(msg) => CodeVerdict::ServerFailure(msg),
        None if marker_visible => CodeVerdict::StaleMarker,
        None => CodeVerdict::Pending,
    }
}

enum ToastWatch {
    Toast(String),
    Quiet,
    Stopped,
}

enum Race<D> {
    Download(D),
    Watch(ToastWatch),
}

// ── Attempt ───────────────────────────────────────────────────────────────────

pub struct TickerAttempt<'a> {
    page: &'a dyn PageDriver,
    ctx: &'a JobContext,
    item: &'a WorkItem,
}

impl<'a> TickerAttempt<'a> {
    pub fn new(page: &'a dyn PageDriver, ctx: &'a JobContext, item: &'a WorkItem) -> Self {
        Self { page, ctx, item }
    }

    fn ticker(&self) -> &str {
        self.item.ticker.as_str()
    }

    pub async fn run(&self) -> Resolution {
        let mut phase = Phase::Idle;
        loop {
            phase = match self.advance(phase).await {
                Phase::Resolved(resolution) => return resolution,
                next => next,
            };
            trace!("{} -> {:?}", self.item, phase);
        }
    }

    /// One transition.
    pub async fn advance(&self, phase: Phase) -> Phase {
        let next = match phase {
            Phase::Resolved(resolution) => return Phase::Resolved(resolution),
            _ if self.ctx.stop.is_cancelled() => return Phase::Resolved(Resolution::Stopped),
            Phase::Idle => self.submit().await,
            Phase::Submitted => {
                sleep(self.ctx.timing.early_check()).await;
                Ok(Phase::EarlyCheck)
            }
            Phase::EarlyCheck => self.early_check().await,
            Phase::Polling { tick } => self.poll_render(tick).await,
            Phase::Rendered => {
                sleep(self.ctx.timing.render_settle()).await;
                if self.item.model.is_code_extraction() {
                    Ok(Phase::Extracting { tick: 0 })
                } else {
                    Ok(Phase::Downloading)
                }
            }
            Phase::Extracting { tick } => self.poll_code(tick).await,
            Phase::Downloading => self.download().await,
        };
        next.unwrap_or_else(|e| Phase::Resolved(Resolution::Failed(e)))
    }

    async fn submit(&self) -> Result<Phase, AttemptError> {
        let limit = self.ctx.timing.action_timeout();
        bounded(
            limit,
            "ticker input",
            self.page.fill_by_placeholder(ui::TICKER_PLACEHOLDER, self.ticker()),
        )
        .await?;
        bounded(
            limit,
            "confirm click",
            self.page.click_by_role(ui::BUTTON_ROLE, ui::CONFIRM_BUTTON),
        )
        .await?;
        Ok(Phase::Submitted)
    }

    async fn early_check(&self) -> Result<Phase, AttemptError> {
        let limit = self.ctx.timing.action_timeout();
        let computing = bounded(
            limit,
            "computing indicator",
            self.page.count_by_visible_text(ui::COMPUTING_TEXT),
        )
        .await?
            > 0;
        let body = bounded(limit, "body text", self.page.read_body_text()).await?;

        if judge_early(computing, &body, self.ticker()) {
            Ok(Phase::Polling { tick: 0 })
        } else {
            Err(AttemptError::NotAcknowledged(self.ctx.timing.early_check()))
        }
    }

    async fn visible_toast(&self) -> Result<Option<String>, AttemptError> {
        let limit = self.ctx.timing.action_timeout();
        for needle in ui::FAILURE_TOASTS {
            let count = bounded(limit, "toast check", self.page.count_by_visible_text(needle)).await?;
            if count > 0 {
                let body = bounded(limit, "body text", self.page.read_body_text())
                    .await
                    .unwrap_or_default();
                return Ok(Some(toast_message(&body, needle)));
            }
        }
        Ok(None)
    }

    async fn observe_render(&self) -> Result<RenderVerdict, AttemptError> {
        let toast = self.visible_toast().await?;
        if toast.is_some() {
            return Ok(judge_render(toast, "", self.ticker()));
        }
        let limit = self.ctx.timing.action_timeout();
        let body = bounded(limit, "body text", self.page.read_body_text()).await?;
        Ok(judge_render(None, &body, self.ticker()))
    }

    async fn poll_render(&self, tick: u32) -> Result<Phase, AttemptError> {
        if tick >= self.ctx.timing.poll_ticks() {
            return Err(AttemptError::StaleData(self.ticker().to_string()));
        }
        match self.observe_render().await {
            Ok(RenderVerdict::ServerFailure(msg)) => return Err(AttemptError::ServerFailure(msg)),
            Ok(RenderVerdict::Rendered) => return Ok(Phase::Rendered),
            Ok(RenderVerdict::Pending) => {}
            Err(e) => debug!("{} - read failed while waiting, polling on: {}", self.item, e),
        }
        sleep(self.ctx.timing.poll_interval()).await;
        Ok(Phase::Polling { tick: tick + 1 })
    }

    async fn observe_code(&self) -> Result<CodeVerdict, AttemptError> {
        let limit = self.ctx.timing.action_timeout();
        let marker_visible = bounded(
            limit,
            "code marker",
            self.page.count_by_visible_text(ui::CODE_MARKER),
        )
        .await?
            > 0;
        let body = if marker_visible {
            bounded(limit, "body text", self.page.read_body_text()).await?
        } else {
            String::new()
        };
        let toast = self.visible_toast().await?;
        Ok(judge_code(marker_visible, toast, &body, self.ticker()))
    }

    async fn poll_code(&self, tick: u32) -> Result<Phase, AttemptError> {
        if tick >= self.ctx.timing.poll_ticks() {
            return Err(AttemptError::CodeTimeout(self.ticker().to_string()));
        }
        match self.observe_code().await {
            Ok(CodeVerdict::Found(code)) => {
                // Pace the next submit.
                sleep(self.ctx.timing.render_settle()).await;
                return Ok(Phase::Resolved(Resolution::Success(Artifact::Code(code))));
            }
            Ok(CodeVerdict::StaleMarker) => {
                return Err(AttemptError::StaleMarker {
                    ticker: self.ticker().to_string(),
                    marker: ui::CODE_MARKER,
                });
            }
            Ok(CodeVerdict::ServerFailure(msg)) => return Err(AttemptError::ServerFailure(msg)),
            Ok(CodeVerdict::Pending) => {}
            Err(e) => debug!("{} - read failed while waiting for code, polling on: {}", self.item, e),
        }
        sleep(self.ctx.timing.poll_interval()).await;
        Ok(Phase::Extracting { tick: tick + 1 })
    }

    /// Polls for a failure toast until one shows, the watch runs out, or stop.
    async fn watch_for_toast(&self) -> ToastWatch {
        for _ in 0..self.ctx.timing.download_watch_ticks() {
            if self.ctx.stop.is_cancelled() {
                return ToastWatch::Stopped;
            }
            match self.visible_toast().await {
                Ok(Some(msg)) => return ToastWatch::Toast(msg),
                Ok(None) => {}
                Err(e) => debug!("{} - toast check failed during download: {}", self.item, e),
            }
            sleep(self.ctx.timing.poll_interval()).await;
        }
        ToastWatch::Quiet
    }

    async fn download(&self) -> Result<Phase, AttemptError> {
        let limit = self.ctx.timing.download_timeout();
        let action_limit = self.ctx.timing.action_timeout();

        let wait = tokio::time::timeout(limit, self.page.expect_download(limit));
        bounded(
            action_limit,
            "download click",
            self.page.click_by_role(ui::BUTTON_ROLE, ui::DOWNLOAD_BUTTON),
        )
        .await?;

        tokio::pin!(wait);
        let watch = self.watch_for_toast();
        tokio::pin!(watch);

        let first = tokio::select! {
            res = &mut wait => Race::Download(res),
            watched = &mut watch => Race::Watch(watched),
        };
        let arrived = match first {
            Race::Download(res) => res,
            Race::Watch(ToastWatch::Toast(msg)) => return Err(AttemptError::ServerFailure(msg)),
            Race::Watch(ToastWatch::Stopped) => return Ok(Phase::Resolved(Resolution::Stopped)),
            Race::Watch(ToastWatch::Quiet) => wait.await,
        };
        let handle: Box<dyn DownloadHandle> = match arrived {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(AttemptError::Driver(e)),
            Err(_) => return Err(AttemptError::DownloadTimeout(limit)),
        };

        let item = self.item;
        let path = self
            .ctx
            .planner
            .prepare_artifact(item.platform, &item.model, &item.ticker, now_local())
            .map_err(AttemptError::Storage)?;
        bounded(action_limit, "save download", handle.save_as(&path)).await?;

        Ok(Phase::Resolved(Resolution::Success(Artifact::File(path))))
    }
}

// ── Retry loop ────────────────────────────────────────────────────────────────

/// Run attempts for one work item until success, stop, or the budget is spent.
pub async fn process_ticker(page: &dyn PageDriver, ctx: &JobContext, item: &WorkItem) -> AttemptResult {
    let max_attempts = ctx.timing.max_attempts.max(1);
    let mut backoff = FixedInterval::from_millis(ctx.timing.retry_backoff().as_millis() as u64)
        .take(max_attempts as usize - 1);

    for attempt in 1..=max_attempts {
        if ctx.stop.is_cancelled() {
            return AttemptResult::Stopped;
        }

        let err = match TickerAttempt::new(page, ctx, item).run().await {
            Resolution::Success(artifact) => return AttemptResult::Success(artifact),
            Resolution::Stopped => return AttemptResult::Stopped,
            Resolution::Failed(err) => err,
        };

        ctx.reporter.emit(Progress::AttemptFailed {
            item: item.clone(),
            attempt,
            max_attempts,
            reason: err.to_string(),
        });

        match backoff.next() {
            Some(delay) => sleep(delay).await,
            None => {
                return AttemptResult::Failure {
                    kind: err.kind(),
                    reason: err.to_string(),
                };
            }
        }
    }

    // Only reached when the loop body never ran, which max(1) rules out.
    AttemptResult::Stopped
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::driver::BrowserSession;
    use crate::driver::scripted::{DownloadScript, PageScript, ScriptedSession, SiteScript, TickerScript};
    use crate::models::{FailureKind, ModelName, Platform, Ticker};
    use crate::progress::Reporter;
    use crate::storage::ArtifactPlanner;
    use tokio_util::sync::CancellationToken;

    const TOAST: &str = "獲取數據失敗，請稍後再試";

    fn item(model: &str, ticker: &str) -> WorkItem {
        WorkItem::new(
            Platform::Standard,
            ModelName::new(model).unwrap(),
            Ticker::new(ticker).unwrap(),
        )
    }

    fn ctx(root: &std::path::Path) -> JobContext {
        JobContext::new(
            TimingConfig::default(),
            ArtifactPlanner::new(root, "html"),
            CancellationToken::new(),
            Reporter::silent(),
        )
    }

    async fn page_for(script: PageScript, model: &str) -> (ScriptedSession, Box<dyn PageDriver>) {
        let session = ScriptedSession::new(SiteScript { standard: script, ..Default::default() });
        let page = session.new_page().await.unwrap();
        page.navigate("https://host/platform").await.unwrap();
        page.click_by_visible_text(ui::MODEL_PICKER, false).await.unwrap();
        page.click_by_visible_text(model, true).await.unwrap();
        (session, page)
    }

    // ── pure verdicts

    #[test]
    fn test_judge_early() {
        assert!(judge_early(true, "", "AAPL"));
        assert!(judge_early(false, "AAPL Dealers", "AAPL"));
        assert!(!judge_early(false, "MSFT Dealers", "AAPL"));
    }

    #[test]
    fn test_judge_render_prefers_toast() {
        assert_eq!(
            judge_render(Some("Please Try Again".into()), "AAPL Dealers", "AAPL"),
            RenderVerdict::ServerFailure("Please Try Again".into())
        );
        assert_eq!(judge_render(None, "AAPL Dealers", "AAPL"), RenderVerdict::Rendered);
        assert_eq!(judge_render(None, "MSFT Dealers", "AAPL"), RenderVerdict::Pending);
    }

    #[test]
    fn test_judge_code() {
        let body = "MSFT Put Wall 400\nAAPL Put Wall 180";
        assert_eq!(
            judge_code(true, None, body, "AAPL"),
            CodeVerdict::Found("AAPL Put Wall 180".into())
        );
        assert_eq!(judge_code(true, None, "MSFT Put Wall 400", "AAPL"), CodeVerdict::StaleMarker);
        assert_eq!(
            judge_code(true, Some("x".into()), "MSFT Put Wall 400", "AAPL"),
            CodeVerdict::ServerFailure("x".into())
        );
        assert_eq!(judge_code(false, None, "", "AAPL"), CodeVerdict::Pending);
        assert_eq!(
            judge_code(false, Some("x".into()), "", "AAPL"),
            CodeVerdict::ServerFailure("x".into())
        );
    }

    // ── single attempts

    #[tokio::test(start_paused = true)]
    async fn test_attempt_extracts_code() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("AAPL Put Wall 180 Call Wall 200"));
        let (_s, page) = page_for(script, "TV Code").await;
        let ctx = ctx(dir.path());
        let item = item("TV Code", "AAPL");

        match TickerAttempt::new(page.as_ref(), &ctx, &item).run().await {
            Resolution::Success(Artifact::Code(code)) => {
                assert_eq!(code, "AAPL Put Wall 180 Call Wall 200")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_click_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("AAPL Dealers").ignoring(1));
        let (_s, page) = page_for(script, "Gamma").await;
        let ctx = ctx(dir.path());
        let item = item("Gamma", "AAPL");

        let started = tokio::time::Instant::now();
        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        assert!(matches!(res, Resolution::Failed(AttemptError::NotAcknowledged(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_computing_without_render_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("Loading chart").computing());
        let (_s, page) = page_for(script, "Gamma").await;
        let ctx = ctx(dir.path());
        let item = item("Gamma", "AAPL");

        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        match res {
            Resolution::Failed(e @ AttemptError::StaleData(_)) => {
                assert_eq!(e.kind(), FailureKind::Validation)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_after_a_few_polls() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default().with_ticker(
            "AAPL",
            TickerScript::rendered("Loading")
                .then("Loading")
                .then("Loading")
                .then("AAPL Dealers Gamma Hedging")
                .computing(),
        );
        let (s, page) = page_for(script, "Gamma").await;
        let ctx = ctx(dir.path());
        let item = item("Gamma", "AAPL");

        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        assert!(matches!(res, Resolution::Success(Artifact::File(_))));
        assert_eq!(s.log().saved_paths().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_marker_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("AAPL Dealers\nMSFT Put Wall 400"));
        let (_s, page) = page_for(script, "TV Code").await;
        let ctx = ctx(dir.path());
        let item = item("TV Code", "AAPL");

        let started = tokio::time::Instant::now();
        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        assert!(matches!(res, Resolution::Failed(AttemptError::StaleMarker { .. })));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_toast_wins_race() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default().with_ticker(
            "AAPL",
            TickerScript::rendered("AAPL Dealers").with_download(DownloadScript::Toast {
                message: "Please Try Again later".into(),
            }),
        );
        let (s, page) = page_for(script, "Gamma").await;
        let ctx = ctx(dir.path());
        let item = item("Gamma", "AAPL");

        match TickerAttempt::new(page.as_ref(), &ctx, &item).run().await {
            Resolution::Failed(AttemptError::ServerFailure(msg)) => {
                assert_eq!(msg, "Please Try Again later")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.log().saved_paths().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_that_never_arrives_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default().with_ticker(
            "AAPL",
            TickerScript::rendered("AAPL Dealers").with_download(DownloadScript::Never),
        );
        let (_s, page) = page_for(script, "Gamma").await;
        let ctx = ctx(dir.path());
        let item = item("Gamma", "AAPL");

        let started = tokio::time::Instant::now();
        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        // Either our deadline or the driver's own fires first; both are the same limit.
        assert!(matches!(
            res,
            Resolution::Failed(AttemptError::DownloadTimeout(_) | AttemptError::Driver(_))
        ));
        assert!(started.elapsed() >= std::time::Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let (_s, page) = page_for(PageScript::default(), "Gamma").await;
        let ctx = ctx(dir.path());
        ctx.stop.cancel();
        let item = item("Gamma", "AAPL");

        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        assert!(matches!(res, Resolution::Stopped));
    }

    const STOP_AT: std::time::Duration = std::time::Duration::from_millis(10_200);

    fn cancel_after(token: CancellationToken, after: std::time::Duration) {
        tokio::spawn(async move {
            sleep(after).await;
            token.cancel();
        });
    }

    /// Run one attempt with a stop arriving at `STOP_AT`; returns how long it took.
    async fn stopped_attempt(script: PageScript, model: &str) -> std::time::Duration {
        let dir = tempfile::tempdir().unwrap();
        let (_s, page) = page_for(script, model).await;
        let ctx = ctx(dir.path());
        let item = item(model, "AAPL");
        let started = tokio::time::Instant::now();
        cancel_after(ctx.stop.clone(), STOP_AT);

        let res = TickerAttempt::new(page.as_ref(), &ctx, &item).run().await;
        assert!(matches!(res, Resolution::Stopped), "{:?}", res);
        started.elapsed()
    }

    fn assert_within_one_tick(elapsed: std::time::Duration) {
        let tick = TimingConfig::default().poll_interval();
        assert!(elapsed >= STOP_AT, "{:?}", elapsed);
        assert!(elapsed <= STOP_AT + tick, "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_render_poll() {
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("Loading chart").computing());
        assert_within_one_tick(stopped_attempt(script, "Gamma").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_code_poll() {
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("AAPL Dealers Gamma Hedging"));
        assert_within_one_tick(stopped_attempt(script, "TV Code").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_download_wait() {
        let script = PageScript::default().with_ticker(
            "AAPL",
            TickerScript::rendered("AAPL Dealers").with_download(DownloadScript::Never),
        );
        assert_within_one_tick(stopped_attempt(script, "Gamma").await);
    }

    // ── retry loop

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_page_reacts() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default()
            .with_ticker("AAPL", TickerScript::rendered("AAPL Dealers").ignoring(2));
        let (s, page) = page_for(script, "Gamma").await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx = ctx(dir.path());
        ctx.reporter = Reporter::new(tx);
        let item = item("Gamma", "AAPL");

        let res = process_ticker(page.as_ref(), &ctx, &item).await;
        assert!(matches!(res, AttemptResult::Success(Artifact::File(_))));
        assert_eq!(s.log().submissions().len(), 3);

        let mut failed_attempts = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let Progress::AttemptFailed { attempt, .. } = ev {
                failed_attempts.push(attempt);
            }
        }
        assert_eq!(failed_attempts, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_every_time_exhausts_budget() {
        let dir = tempfile::tempdir().unwrap();
        let script = PageScript::default()
            .with_ticker("XYZ", TickerScript::default().computing().with_toast(TOAST));
        let (s, page) = page_for(script, "Gamma").await;
        let ctx = ctx(dir.path());
        let item = item("Gamma", "XYZ");

        match process_ticker(page.as_ref(), &ctx, &item).await {
            AttemptResult::Failure { kind, reason } => {
                assert_eq!(kind, FailureKind::TransientUi);
                assert!(reason.contains(TOAST), "{}", reason);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.log().submissions().len(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let (_s, page) = page_for(PageScript::default(), "Gamma").await;
        let mut ctx = ctx(dir.path());
        ctx.timing.max_attempts = 3;
        let item = item("Gamma", "NOPE");

        let started = tokio::time::Instant::now();
        let res = process_ticker(page.as_ref(), &ctx, &item).await;
        assert!(matches!(res, AttemptResult::Failure { .. }));
        // three 2s early checks, two 2s backoffs, no trailing backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_secs(10), "{:?}", elapsed);
        assert!(elapsed < std::time::Duration::from_secs(11), "{:?}", elapsed);
    }
}
