//! Job orchestrator: one [`ModelQueue`] per selected model, per platform.
//!
//! ## Run modes
//!
//! Sequential (default): Standard models first, then CME, one queue at a time.
//!
//! Concurrent (`concurrent_across_models`): every queue of both platforms is
//! spawned at once, each on its own page, and reports are joined in plan order.
//!
//! Either way the job always finishes with a [`JobSummary`] and, when any
//! TV Code ticker succeeded, one aggregate file per platform.

use crate::config::{AppConfig, TimingConfig};
use crate::driver::BrowserSession;
use crate::models::{Artifact, FailedItem, FailureKind, JobPlan, JobSummary, Platform, WorkItem};
use crate::progress::{Progress, Reporter};
use crate::scraper::{JobContext, ModelQueue, QueueReport};
use crate::storage::{ArtifactPlanner, CodeAggregator};
use crate::utils::now_local;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

pub struct Pipeline {
    session: Arc<dyn BrowserSession>,
    timing: TimingConfig,
    artifact_extension: String,
    standard_url: Url,
    cme_url: Url,
    reporter: Reporter,
}

impl Pipeline {
    pub fn new(config: &AppConfig, session: Arc<dyn BrowserSession>) -> Result<Self> {
        Ok(Self {
            session,
            timing: config.timing.clone(),
            artifact_extension: config.job.artifact_extension.clone(),
            standard_url: config.platform.url(Platform::Standard)?,
            cme_url: config.platform.url(Platform::Cme)?,
            reporter: Reporter::silent(),
        })
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    fn url(&self, platform: Platform) -> &Url {
        match platform {
            Platform::Standard => &self.standard_url,
            Platform::Cme => &self.cme_url,
        }
    }

    pub async fn run(&self, plan: &JobPlan, stop: CancellationToken) -> JobSummary {
        let ctx = Arc::new(JobContext::new(
            self.timing.clone(),
            ArtifactPlanner::new(&plan.destination_root, &self.artifact_extension),
            stop,
            self.reporter.clone(),
        ));

        info!(
            "=== Starting job: {} Standard model(s) x {} ticker(s), {} CME model(s) x {} ticker(s), {} ===",
            plan.standard_models.len(),
            plan.standard_tickers.len(),
            plan.cme_models.len(),
            plan.cme_tickers.len(),
            if plan.concurrent_across_models { "concurrent" } else { "sequential" },
        );

        let mut summary = JobSummary::default();
        let mut codes = CodeAggregator::new();
        let mut handles: Vec<(Vec<WorkItem>, JoinHandle<QueueReport>)> = Vec::new();

        for platform in Platform::ALL {
            let tickers = plan.tickers(platform);
            let models = plan.models(platform);
            if tickers.is_empty() || models.is_empty() {
                continue;
            }

            for (i, model) in models.iter().enumerate() {
                if ctx.stop.is_cancelled() {
                    let skipped = &models[i..];
                    info!("Stop requested, skipping {} {} model(s)", skipped.len(), platform);
                    for model in skipped {
                        for ticker in tickers {
                            summary.failed_items.push(FailedItem::stopped(WorkItem::new(
                                platform,
                                model.clone(),
                                ticker.clone(),
                            )));
                        }
                    }
                    break;
                }

                let queue = ModelQueue::new(
                    platform,
                    model.clone(),
                    tickers.to_vec(),
                    self.url(platform).clone(),
                );

                if plan.concurrent_across_models {
                    let items: Vec<WorkItem> = queue.items().collect();
                    let session = Arc::clone(&self.session);
                    let ctx = Arc::clone(&ctx);
                    let handle =
                        tokio::spawn(async move { queue.run(session.as_ref(), &ctx).await });
                    handles.push((items, handle));
                } else {
                    let report = queue.run(self.session.as_ref(), &ctx).await;
                    absorb(report, &mut summary, &mut codes);
                }
            }
        }

        for (items, handle) in handles {
            match handle.await {
                Ok(report) => absorb(report, &mut summary, &mut codes),
                Err(e) => {
                    error!("Queue task panic: {}", e);
                    for item in items {
                        summary.failed_items.push(FailedItem::failed(
                            item,
                            FailureKind::Internal,
                            format!("queue task failed: {}", e),
                        ));
                    }
                }
            }
        }

        match codes.flush(&ctx.planner, now_local()) {
            Ok(written) => {
                for (platform, path) in written {
                    ctx.reporter.emit(Progress::AggregateSaved { platform, path: path.clone() });
                    summary.aggregate_files.push(path);
                }
            }
            Err(e) => {
                error!("Failed to save aggregated TV codes: {:#}", e);
                summary.aggregate_errors.push(format!("{:#}", e));
            }
        }

        log_summary(&summary);
        ctx.reporter.emit(Progress::JobFinished {
            success: summary.success_count,
            failed: summary.failed_items.len(),
            stopped: summary.stopped_count(),
        });
        summary
    }
}

/// Build a pipeline from config and run `plan` to completion.
pub async fn run_job(
    config: &AppConfig,
    session: Arc<dyn BrowserSession>,
    plan: &JobPlan,
    stop: CancellationToken,
    reporter: Reporter,
) -> Result<JobSummary> {
    let pipeline = Pipeline::new(config, session)?.with_reporter(reporter);
    Ok(pipeline.run(plan, stop).await)
}

fn absorb(report: QueueReport, summary: &mut JobSummary, codes: &mut CodeAggregator) {
    for (item, artifact) in report.successes {
        summary.success_count += 1;
        match artifact {
            Artifact::File(path) => summary.downloads.push(path),
            Artifact::Code(code) => codes.push(item.platform, code),
        }
    }
    summary.failed_items.extend(report.failures);
}

fn log_summary(summary: &JobSummary) {
    let rule = "=".repeat(30);
    info!("{}", rule);
    info!("JOB SUMMARY");
    info!("Total Processed: {}", summary.total());
    info!("Success: {}", summary.success_count);
    info!("Failed: {}", summary.failed_items.len());
    for err in &summary.aggregate_errors {
        info!("Aggregate not saved: {}", err);
    }
    if !summary.failed_items.is_empty() {
        info!("Failed Items:");
        for item in &summary.failed_items {
            info!(" - {}", item);
        }
    }
    info!("{}", rule);
}
