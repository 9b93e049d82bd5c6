use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use lieta_batch::config::{AppConfig, JobConfig};
use lieta_batch::driver::BrowserSession;
use lieta_batch::driver::scripted::{ScriptedSession, SiteScript};
use lieta_batch::loader::load_tickers;
use lieta_batch::models::{JobPlan, JobSummary, ModelName, Platform, Ticker};
use lieta_batch::pipeline::Pipeline;
use lieta_batch::storage::ArtifactPlanner;
use lieta_batch::utils::{self, format_timestamp, now_local};

#[derive(Parser)]
#[command(name = "lieta-batch", about = "Batch chart downloader for the Lieta research platform", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List the models each platform offers
    Models,

    /// Parse a ticker file (txt or csv) and print the result
    Tickers {
        file: PathBuf,
    },

    /// Build and validate a job plan without running it
    Plan {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Run a job against a scripted site (Ctrl-C stops it)
    Replay {
        /// JSON site script
        #[arg(short, long)]
        script: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        job: JobArgs,
    },
}

/// Overrides for the `job` config section.
#[derive(Args, Debug)]
struct JobArgs {
    /// Standard tickers, comma separated (default: job.ticker_file)
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// CME tickers, comma separated (default: job.cme_ticker_file)
    #[arg(long, value_delimiter = ',')]
    cme_tickers: Vec<String>,

    /// Standard models, comma separated
    #[arg(long, value_delimiter = ',')]
    models: Vec<String>,

    /// CME models, comma separated
    #[arg(long, value_delimiter = ',')]
    cme_models: Vec<String>,

    /// Destination root folder
    #[arg(short, long, env = "LIETA_DEST")]
    dest: Option<PathBuf>,

    /// Run every model queue at once
    #[arg(long)]
    concurrent: bool,
}

impl JobArgs {
    fn into_plan(self, job: &JobConfig) -> Result<JobPlan> {
        let plan = JobPlan {
            standard_tickers: tickers_or_file(&self.tickers, job.ticker_file.as_deref())?,
            standard_models: model_names(if self.models.is_empty() { &job.models } else { &self.models }),
            cme_tickers: tickers_or_file(&self.cme_tickers, job.cme_ticker_file.as_deref())?,
            cme_models: model_names(if self.cme_models.is_empty() { &job.cme_models } else { &self.cme_models }),
            destination_root: self.dest.unwrap_or_else(|| job.destination_root.clone()),
            concurrent_across_models: self.concurrent || job.concurrent_across_models,
        };
        plan.validate().context("Invalid job")?;
        Ok(plan)
    }
}

fn tickers_or_file(given: &[String], file: Option<&Path>) -> Result<Vec<Ticker>> {
    if !given.is_empty() {
        return Ok(given.iter().filter_map(Ticker::new).collect());
    }
    match file {
        Some(path) => load_tickers(path),
        None => Ok(vec![]),
    }
}

fn model_names(names: &[String]) -> Vec<ModelName> {
    names.iter().filter_map(ModelName::new).collect()
}

/// Console output, plus `<dir>/run_<stamp>.log` when a log dir is given.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = match verbose {
        0 => "lieta_batch=info,warn",
        1 => "lieta_batch=debug,info",
        _ => "trace",
    };

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log dir {:?}", dir))?;
            let path = dir.join(format!("run_{}.log", format_timestamp(now_local())));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {:?}", path))?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    Ok(log_path)
}

fn print_summary(summary: &JobSummary) {
    println!("─────────────────────────────────");
    println!("  Job Summary");
    println!("─────────────────────────────────");
    println!("  Processed : {}", summary.total());
    println!("  Success   : {}", summary.success_count);
    println!("  Failed    : {}", summary.failed_items.len());
    println!("  Stopped   : {}", summary.stopped_count());
    for path in &summary.aggregate_files {
        println!("  Codes     : {}", path.display());
    }
    for err in &summary.aggregate_errors {
        println!("  Not saved : {}", err);
    }
    if !summary.failed_items.is_empty() {
        println!("─────────────────────────────────");
        for item in &summary.failed_items {
            println!("  - {}", item);
        }
    }
    println!("─────────────────────────────────");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let log_dir = match cli.command {
        Command::Replay { .. } => config.logging.dir.as_deref(),
        _ => None,
    };
    if let Some(path) = init_tracing(cli.verbose, log_dir)? {
        info!("Logging to {:?}", path);
    }

    match cli.command {
        Command::Models => {
            for platform in Platform::ALL {
                println!("{}:", platform);
                for model in platform.catalogue() {
                    println!("  {}", model);
                }
            }
        }

        Command::Tickers { file } => {
            let tickers = load_tickers(&file)?;
            if tickers.is_empty() {
                println!("No tickers in {:?}.", file);
            } else {
                println!("{} tickers:", tickers.len());
                for t in &tickers {
                    println!("  {}", t);
                }
            }
        }

        Command::Plan { job } => {
            let plan = job.into_plan(&config.job)?;
            let planner = ArtifactPlanner::new(&plan.destination_root, &config.job.artifact_extension);
            let items = plan.work_items();
            println!("{} work items:", items.len());
            for item in &items {
                let dest = if item.model.is_code_extraction() {
                    planner.aggregate_dir(item.platform)
                } else {
                    planner.artifact_dir(item.platform, &item.model, &item.ticker)
                };
                println!("  {:<28} -> {}", item.to_string(), dest.display());
            }
        }

        Command::Replay { script, json, job } => {
            let plan = job.into_plan(&config.job)?;
            let site = SiteScript::load(&script)?;
            let session: Arc<dyn BrowserSession> = Arc::new(ScriptedSession::new(site));

            let stop = CancellationToken::new();
            let on_ctrl_c = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Stop requested, finishing the current step...");
                    on_ctrl_c.cancel();
                }
            });

            let summary = {
                let _t = utils::Timer::start("Replay job");
                Pipeline::new(&config, session)?.run(&plan, stop).await
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
    }

    Ok(())
}
