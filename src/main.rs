//! rediscopy - copy every key from one Redis-compatible server to another
//!
//! Flushes the destination, then moves each source key with DUMP/RESTORE,
//! preserving its remaining TTL.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use colored::Colorize;
use tracing::warn;

use rediscopy::config::{CopyConfig, LogFormat, LoggingConfig};
use rediscopy::confirm::confirm_destructive;
use rediscopy::replication::{CopyReport, Replicator};
use rediscopy::store::RedisStore;

/// rediscopy - full DUMP/RESTORE copy between Redis-compatible servers
///
/// WARNING: every key on the destination is deleted before copying.
#[derive(Parser, Debug)]
#[command(name = "rediscopy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Source host:port
    #[arg(long = "src", value_name = "ADDR")]
    src: Option<String>,

    /// Source password
    #[arg(long = "srcpw", value_name = "PASSWORD", env = "REDISCOPY_SRC_PASSWORD")]
    src_password: Option<String>,

    /// Source db number
    #[arg(long = "srcdb", value_name = "DB")]
    src_db: Option<i64>,

    /// Destination host:port
    #[arg(long = "dest", value_name = "ADDR")]
    dest: Option<String>,

    /// Destination password
    #[arg(long = "destpw", value_name = "PASSWORD", env = "REDISCOPY_DEST_PASSWORD")]
    dest_password: Option<String>,

    /// Destination db number
    #[arg(long = "destdb", value_name = "DB")]
    dest_db: Option<i64>,

    /// Number of concurrent transfer workers [default: 50]
    #[arg(short = 'c', long = "concurrency", value_name = "N")]
    concurrency: Option<usize>,

    /// Print status every N keys, 0 disables [default: 1000]
    #[arg(short = 's', long = "status", value_name = "N")]
    status: Option<u64>,

    /// Only copy keys matching this glob [default: *]
    #[arg(long = "pattern", value_name = "GLOB")]
    pattern: Option<String>,

    /// SCAN COUNT hint used while loading keys [default: 1000]
    #[arg(long = "scan-batch", value_name = "N")]
    scan_batch: Option<usize>,

    /// Fail keys whose TTL cannot be read instead of copying them without expiry
    #[arg(long = "strict-ttl", action = ArgAction::SetTrue)]
    strict_ttl: bool,

    /// Log level: trace, debug, info, warn, error
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "REDISCOPY_LOG_LEVEL"
    )]
    log_level: Option<String>,

    /// Log format: pretty, json
    #[arg(long = "log-format", value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply CLI argument overrides to the configuration
    fn apply_to_config(&self, config: &mut CopyConfig) {
        if let Some(ref addr) = self.src {
            config.source.addr = addr.clone();
        }
        if let Some(ref password) = self.src_password {
            config.source.password = Some(password.clone());
        }
        if let Some(db) = self.src_db {
            config.source.db = db;
        }
        if let Some(ref addr) = self.dest {
            config.destination.addr = addr.clone();
        }
        if let Some(ref password) = self.dest_password {
            config.destination.password = Some(password.clone());
        }
        if let Some(db) = self.dest_db {
            config.destination.db = db;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(status) = self.status {
            config.status_interval = status;
        }
        if let Some(ref pattern) = self.pattern {
            config.pattern = pattern.clone();
        }
        if let Some(scan_batch) = self.scan_batch {
            config.scan_batch = scan_batch;
        }
        if self.strict_ttl {
            config.strict_ttl = true;
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CopyConfig> {
    let mut config = match cli.config {
        Some(ref path) => CopyConfig::from_file(path)?,
        None => CopyConfig::default(),
    };
    cli.apply_to_config(&mut config);
    Ok(config)
}

fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // stdout carries the prompt and the summary
    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{} {}", "error:".red().bold(), message);
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };
    if !config.source.is_configured() {
        return fail("--src flag is required");
    }
    if !config.destination.is_configured() {
        return fail("--dest flag is required");
    }
    if let Err(e) = config.validate() {
        return fail(e);
    }

    init_logging(&config.logging);

    println!(
        "{} src={} dest={} concur={}",
        "rediscopy".bold(),
        config.source.addr.yellow(),
        config.destination.addr.yellow(),
        config.concurrency
    );

    let stdin = std::io::stdin();
    match confirm_destructive(stdin.lock(), std::io::stdout(), &config.destination.addr) {
        Ok(true) => {}
        Ok(false) => {
            println!("Aborting");
            return ExitCode::SUCCESS;
        }
        Err(e) => return fail(format!("failed to read confirmation: {}", e)),
    }

    match run(config).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", "Aborting copy".red());
            fail(e)
        }
    }
}

async fn run(config: CopyConfig) -> anyhow::Result<CopyReport> {
    let options = config.replication_options()?;
    let source = RedisStore::connect(&config.source).await?;
    let destination = RedisStore::connect(&config.destination).await?;

    let replicator = Replicator::new(Arc::new(source), Arc::new(destination), options);

    let cancel = replicator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight keys (press Ctrl-C again to exit now)");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    Ok(replicator.run().await?)
}

fn print_summary(report: &CopyReport) {
    println!();
    if report.cancelled {
        println!("{}", "⚠ Copy cancelled.".yellow().bold());
    } else if report.is_clean() {
        println!("{}", "✓ Copy complete.".green().bold());
    } else {
        println!("{}", "✗ Copy complete with errors.".red().bold());
    }
    println!("Copy complete. Total keys: {}", report.attempted());
    if report.cancelled {
        println!(
            "  {} keys queued, {} dropped before transfer",
            report.published,
            report.published.saturating_sub(report.attempted())
        );
    }
    println!();

    let counts = &report.counts;
    println!("{}", "Summary".bold().underline());
    println!("  Enumerated:       {}", report.enumerated);
    println!("  Copied:           {}", counts.copied);
    println!("  Skipped missing:  {}", counts.skipped_missing);
    println!("  Failed dump:      {}", counts.failed_dump);
    println!("  Failed restore:   {}", counts.failed_restore);
    if counts.ttl_fallbacks > 0 {
        println!(
            "  TTL not read:     {} {}",
            counts.ttl_fallbacks,
            "(restored without expiry)".dimmed()
        );
    }
    println!("  Duration:         {}", format_duration(report.elapsed));
    println!("  Rate:             {:.0} keys/s", report.keys_per_second());
    println!();

    if !report.failures.is_empty() {
        println!("{}", "Failed Keys".bold().underline());
        for failure in &report.failures {
            println!(
                "  {} {} [{}] {}",
                "✗".red(),
                failure.key,
                failure.kind,
                failure.error.to_string().dimmed()
            );
        }
        println!();
    }
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}
