//! Rehearse CLI: record browsing sessions into step lists and replay them.
//!
//! A thin driver over the automation worker; every browser operation goes
//! through the worker's single-flight channel.

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use rehearse_browser::{AutomationWorker, SessionConfig};
use rehearse_protocols::{RunStatus, Step, StepStatus};

/// Rehearse CLI.
#[derive(Parser)]
#[command(name = "rehearse")]
#[command(about = "Browser record-and-replay automation engine")]
#[command(version)]
struct Cli {
    /// Chrome remote-debugging port
    #[arg(long, default_value_t = 9222, global = true)]
    port: u16,

    /// Run the browser headless
    #[arg(long, global = true)]
    headless: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a browsing session into a step-list JSON file
    Record {
        /// Seed URL opened before recording starts
        #[arg(long)]
        url: String,

        /// Output file for the recorded steps
        #[arg(long, default_value = "steps.json")]
        out: PathBuf,

        /// Stop automatically after this many seconds (otherwise press Enter)
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Replay a recorded step list
    Run {
        /// Step-list JSON file
        #[arg(long)]
        steps: PathBuf,

        /// Optional seed URL navigated before the first step
        #[arg(long)]
        url: Option<String>,

        /// Write the full run report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = SessionConfig {
        debug_port: cli.port,
        headless: cli.headless,
        ..SessionConfig::default()
    };

    match cli.command {
        Commands::Record { url, out, duration } => record(config, &url, &out, duration),
        Commands::Run { steps, url, report } => {
            replay(config, &steps, url.as_deref(), report.as_deref())
        }
    }
}

fn record(config: SessionConfig, url: &str, out: &Path, duration: Option<u64>) -> Result<()> {
    let worker = AutomationWorker::start(config)?;
    worker.start_recording(Some(url))?;

    // Drain the in-page buffer once per second while recording runs.
    match duration {
        Some(secs) => {
            let deadline = Instant::now() + Duration::from_secs(secs);
            while Instant::now() < deadline {
                thread::sleep(Duration::from_secs(1));
                if let Err(e) = worker.sync_events() {
                    warn!("event sync failed: {}", e);
                }
            }
        }
        None => {
            println!("Recording. Press Enter to stop.");
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let mut line = String::new();
                let _ = io::stdin().lock().read_line(&mut line);
                let _ = tx.send(());
            });
            while rx.recv_timeout(Duration::from_secs(1)).is_err() {
                if let Err(e) = worker.sync_events() {
                    warn!("event sync failed: {}", e);
                }
            }
        }
    }

    let steps = worker.stop_recording()?;
    let json = serde_json::to_string_pretty(&steps)?;
    fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;

    info!("recorded {} steps into {}", steps.len(), out.display());
    Ok(())
}

fn replay(
    config: SessionConfig,
    steps_path: &Path,
    seed_url: Option<&str>,
    report_path: Option<&Path>,
) -> Result<()> {
    let raw = fs::read_to_string(steps_path)
        .with_context(|| format!("reading {}", steps_path.display()))?;
    let steps: Vec<Step> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", steps_path.display()))?;

    info!("replaying {} steps", steps.len());
    let worker = AutomationWorker::start(config)?;
    let report = worker.execute_steps(steps, seed_url)?;

    for result in &report.results {
        let marker = match result.status {
            StepStatus::Success => "ok",
            StepStatus::Error => "ERR",
            StepStatus::Skipped => "skip",
        };
        let detail = result
            .error
            .as_deref()
            .or(result.extracted_text.as_deref())
            .unwrap_or("");
        println!(
            "{:>4} {:<5} {:?} {}",
            result.step.order, marker, result.step.action, detail
        );
    }
    println!(
        "status: {:?}  duration: {:.2}s  steps: {}",
        report.status,
        report.duration,
        report.results.len()
    );

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    if report.status == RunStatus::Error {
        if let Some(error) = &report.error {
            eprintln!("run failed: {}", error);
        }
        std::process::exit(1);
    }
    Ok(())
}
