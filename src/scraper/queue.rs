//! One model on one platform: a page of its own, the model picked once, then
//! every ticker in order.

use super::attempt::process_ticker;
use super::error::{AttemptError, QueueError};
use super::{JobContext, bounded, ui};
use crate::driver::{BrowserSession, PageDriver};
use crate::models::{
    Artifact, AttemptResult, FailedItem, ModelName, Platform, Ticker, WorkItem, queue_label,
};
use crate::progress::Progress;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct ModelQueue {
    platform: Platform,
    model: ModelName,
    tickers: Vec<Ticker>,
    url: Url,
}

/// Outcome of every ticker of one queue. Each ticker lands in exactly one list.
#[derive(Debug)]
pub struct QueueReport {
    pub platform: Platform,
    pub model: ModelName,
    pub successes: Vec<(WorkItem, Artifact)>,
    pub failures: Vec<FailedItem>,
}

impl QueueReport {
    fn new(platform: Platform, model: ModelName) -> Self {
        Self {
            platform,
            model,
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn processed(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Extracted code lines, in ticker order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.successes.iter().filter_map(|(_, a)| match a {
            Artifact::Code(code) => Some(code.as_str()),
            Artifact::File(_) => None,
        })
    }
}

impl ModelQueue {
    pub fn new(platform: Platform, model: ModelName, tickers: Vec<Ticker>, url: Url) -> Self {
        Self { platform, model, tickers, url }
    }

    pub fn label(&self) -> String {
        queue_label(self.platform, &self.model)
    }

    fn item(&self, ticker: &Ticker) -> WorkItem {
        WorkItem::new(self.platform, self.model.clone(), ticker.clone())
    }

    pub fn items(&self) -> impl Iterator<Item = WorkItem> + '_ {
        self.tickers.iter().map(|t| self.item(t))
    }

    pub async fn run(&self, session: &dyn BrowserSession, ctx: &JobContext) -> QueueReport {
        let mut report = QueueReport::new(self.platform, self.model.clone());

        if ctx.stop.is_cancelled() {
            self.stop_remaining(&mut report, ctx);
            return report;
        }

        let page = match bounded(ctx.timing.action_timeout(), "open page", session.new_page()).await {
            Ok(page) => page,
            Err(e) => {
                self.abort_remaining(&mut report, ctx, QueueError::PageInit(e));
                return report;
            }
        };
        debug!("{} Page initialized.", self.label());

        if let Err(e) = self.drive(page.as_ref(), ctx, &mut report).await {
            self.abort_remaining(&mut report, ctx, e);
        }

        if let Err(e) = bounded(ctx.timing.action_timeout(), "close page", page.close()).await {
            warn!("{} Failed to close page: {}", self.label(), e);
        }

        info!(
            "{} Finished: {} succeeded, {} failed",
            self.label(),
            report.successes.len(),
            report.failures.len()
        );
        report
    }

    async fn select_model(&self, page: &dyn PageDriver, ctx: &JobContext) -> Result<(), AttemptError> {
        let limit = ctx.timing.action_timeout();
        bounded(limit, "navigate", page.navigate(self.url.as_str())).await?;
        bounded(limit, "network idle", page.wait_for_network_idle()).await?;
        bounded(
            limit,
            "open model picker",
            page.click_by_visible_text(ui::MODEL_PICKER, false),
        )
        .await?;
        sleep(ctx.timing.model_select_settle()).await;
        bounded(
            limit,
            "pick model",
            page.click_by_visible_text(self.model.as_str(), true),
        )
        .await?;
        Ok(())
    }

    async fn drive(
        &self,
        page: &dyn PageDriver,
        ctx: &JobContext,
        report: &mut QueueReport,
    ) -> Result<(), QueueError> {
        self.select_model(page, ctx)
            .await
            .map_err(QueueError::ModelSelection)?;
        ctx.reporter.emit(Progress::ModelSelected {
            platform: self.platform,
            model: self.model.clone(),
        });

        for ticker in &self.tickers {
            if ctx.stop.is_cancelled() {
                self.stop_remaining(report, ctx);
                break;
            }

            let item = self.item(ticker);
            match process_ticker(page, ctx, &item).await {
                AttemptResult::Success(artifact) => {
                    ctx.reporter.emit(Progress::TickerSucceeded {
                        item: item.clone(),
                        artifact: artifact.clone(),
                    });
                    report.successes.push((item, artifact));
                }
                AttemptResult::Failure { kind, reason } => {
                    ctx.reporter.emit(Progress::TickerFailed {
                        item: item.clone(),
                        reason: reason.clone(),
                    });
                    report.failures.push(FailedItem::failed(item, kind, reason));
                }
                AttemptResult::Stopped => {
                    report.failures.push(FailedItem::stopped(item));
                    self.stop_remaining(report, ctx);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Record every ticker not yet processed as stopped.
    fn stop_remaining(&self, report: &mut QueueReport, ctx: &JobContext) {
        let remaining = &self.tickers[report.processed()..];
        for ticker in remaining {
            report.failures.push(FailedItem::stopped(self.item(ticker)));
        }
        ctx.reporter.emit(Progress::QueueStopped {
            platform: self.platform,
            model: self.model.clone(),
            skipped: remaining.len(),
        });
    }

    /// Record every ticker not yet processed as failed with the queue's error.
    fn abort_remaining(&self, report: &mut QueueReport, ctx: &JobContext, err: QueueError) {
        let kind = err.kind();
        let reason = err.to_string();
        ctx.reporter.emit(Progress::QueueAborted {
            platform: self.platform,
            model: self.model.clone(),
            reason: reason.clone(),
        });
        for ticker in &self.tickers[report.processed()..] {
            report
                .failures
                .push(FailedItem::failed(self.item(ticker), kind, reason.clone()));
        }
    }
}
