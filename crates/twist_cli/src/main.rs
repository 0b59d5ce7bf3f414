//! Oliver Twist CLI
//!
//! Checks a concurrent file server's recorded behaviour: `order` validates
//! completion order against the causal order in the trace, `replay` reruns
//! the audited order against a reference model and diffs the responses.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use config::{CliConfig, ConfigLayer, LogLevel, parse_format};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use twist_log::{AuditFormat, TraceFormat};
use twist_order::{CausalOrder, OrderReport, OrderValidator};
use twist_replay::{
    ReplayEngine, ReplayOutcome, ResponseReport, ResponseValidator, Schedule, TraceGroups,
};
use twist_storage::FsStorage;

#[derive(Parser)]
#[command(name = "twist")]
#[command(about = "Oliver Twist - ordering and replay oracle for a concurrent file server", long_about = None)]
struct Cli {
    /// Log level
    #[arg(short, long, global = true, value_enum)]
    logging: Option<LogLevel>,
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Print the report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check completion order against the causal order of the trace
    Order {
        /// Audit log, one completion per line
        #[arg(short = 'x', long)]
        audit: PathBuf,
        /// Trace of the test run
        #[arg(short = 'y', long)]
        trace: PathBuf,
        /// Trace encoding (auto, document, lines)
        #[arg(long, value_parser = parse_format)]
        format: Option<TraceFormat>,
    },
    /// Replay the audited order and compare responses
    Replay {
        /// Audit log, `type,uri,status,id` per line
        #[arg(short = 'x', long)]
        audit: PathBuf,
        /// Trace of the test run
        #[arg(short = 'y', long)]
        trace: PathBuf,
        /// Scratch directory for replayed responses
        #[arg(short = 'r', long)]
        replay_dir: Option<PathBuf>,
        /// Directory of captured responses
        #[arg(short = 'd', long)]
        response_dir: Option<PathBuf>,
        /// Trace encoding (auto, document, lines)
        #[arg(long, value_parser = parse_format)]
        format: Option<TraceFormat>,
    },
}

impl Cli {
    /// Settings given on the command line
    fn overrides(&self) -> ConfigLayer {
        let mut layer = ConfigLayer {
            logging: self.logging,
            ..ConfigLayer::default()
        };
        match &self.command {
            Commands::Order { format, .. } => layer.format = *format,
            Commands::Replay {
                replay_dir,
                response_dir,
                format,
                ..
            } => {
                layer.replay_dir = replay_dir.clone();
                layer.response_dir = response_dir.clone();
                layer.format = *format;
            }
        }
        layer
    }
}

/// Everything a replay run produced
#[derive(Debug, Serialize)]
struct ReplayRun {
    outcome: ReplayOutcome,
    report: ResponseReport,
}

impl ReplayRun {
    fn passed(&self) -> bool {
        self.report.passed()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display()))?,
        None => CliConfig::default(),
    };
    config.apply(cli.overrides());
    init_logging(config.logging);

    let passed = match &cli.command {
        Commands::Order { audit, trace, .. } => {
            let report = run_order(audit, trace, &config)?;
            emit(&report, cli.json)?;
            report.passed()
        }
        Commands::Replay { audit, trace, .. } => {
            let run = run_replay(audit, trace, &config, FsStorage::cwd())?;
            emit(&run, cli.json)?;
            run.passed()
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(level: LogLevel) {
    let Some(directive) = level.directive() else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn emit<T: Serialize>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}

fn run_order(audit: &Path, trace: &Path, config: &CliConfig) -> Result<OrderReport> {
    let events = twist_log::load_trace(trace, config.format)
        .wrap_err_with(|| format!("failed to load trace {}", trace.display()))?;
    let events = twist_log::order_by_timestamp(events)?;
    let order = CausalOrder::extract(&events)?;
    let entries = twist_log::load_audit(audit, AuditFormat::Completion)
        .wrap_err_with(|| format!("failed to load audit log {}", audit.display()))?;

    let report = OrderValidator::new(&order).validate(&entries);
    for finding in &report.findings {
        error!("{finding}");
    }
    info!(
        checked = report.checked,
        findings = report.findings.len(),
        "order check finished"
    );
    Ok(report)
}

/// Replay against `storage`; relative paths in the trace and the configured
/// directories resolve against its root
fn run_replay(
    audit: &Path,
    trace: &Path,
    config: &CliConfig,
    mut storage: FsStorage,
) -> Result<ReplayRun> {
    let events = twist_log::load_trace(trace, config.format)
        .wrap_err_with(|| format!("failed to load trace {}", trace.display()))?;
    let groups = TraceGroups::from_events(events);
    let entries = twist_log::load_audit(audit, AuditFormat::Outcome)
        .wrap_err_with(|| format!("failed to load audit log {}", audit.display()))?;
    let schedule = Schedule::reconstruct(&groups, &entries)?;

    let replay_config = config.replay_config();
    let response_dir = storage.root().join(&replay_config.response_dir);
    std::fs::create_dir_all(&response_dir).wrap_err_with(|| {
        format!(
            "failed to create response directory {}",
            response_dir.display()
        )
    })?;

    let engine = ReplayEngine::new(replay_config);
    let outcome = engine.replay(&mut storage, &schedule)?;
    let report = ResponseValidator::new(engine.config()).compare(&storage, schedule.replayed())?;

    for mismatch in &report.mismatches {
        error!("{mismatch}");
    }
    info!(
        executed = outcome.executed,
        matched = report.matched.len(),
        mismatched = report.mismatches.len(),
        "replay finished"
    );
    Ok(ReplayRun { outcome, report })
}
