//! sarscan CLI — SAR signal scanner and backtester.
//!
//! Modes:
//! - `scan` (default) — entry signals on the latest bar of each watchlist ticker
//! - `backtest` — full-history trades and statistics per ticker
//! - `stop` — stop-loss quote for a position opened at a given price
//! - `check` — validate the configuration and exit
//!
//! The report goes to stdout; logs go to stderr (`RUST_LOG`, default `info`).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use sarscan_core::data::{CsvProvider, DataProvider, SyntheticProvider, YahooProvider};
use sarscan_core::risk::StopRequest;
use sarscan_runner::config::ScanConfig;
use sarscan_runner::{notify, report, save_artifacts, Scanner};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(
    name = "sarscan",
    version,
    about = "Parabolic SAR signal scanner and backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    opts: RunArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Report entry signals on the latest bar (default).
    Scan,
    /// Walk the full history and report trades and statistics.
    Backtest {
        /// Write trades.csv and summary.json under <DIR>/<run-id>/.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Quote the stop for a position opened at --entry.
    Stop {
        /// Ticker (prompted when missing).
        #[arg(long)]
        ticker: Option<String>,

        /// Entry price (prompted when missing).
        #[arg(long)]
        entry: Option<String>,
    },
    /// Validate the configuration and exit.
    Check,
}

#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Comma-separated tickers, replacing the configured watchlist.
    #[arg(long, global = true, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Start date (YYYY-MM-DD). Defaults to the mode's lookback before --end.
    #[arg(long, global = true)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    end: Option<String>,

    /// Read bars from <DIR>/<SYMBOL>.csv instead of the network.
    #[arg(long, global = true, conflicts_with = "synthetic")]
    csv_dir: Option<PathBuf>,

    /// Use deterministic synthetic bars (development only).
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Print the report without pushing it.
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,

    /// Process tickers in parallel.
    #[arg(long, global = true, default_value_t = false)]
    parallel: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.opts)?;

    match cli.command.unwrap_or(Command::Scan) {
        Command::Scan => run_scan(&cli.opts, config),
        Command::Backtest { output_dir } => run_backtest(&cli.opts, config, output_dir),
        Command::Stop { ticker, entry } => run_stop(&cli.opts, config, ticker, entry),
        Command::Check => run_check(&cli.opts, &config),
    }
}

fn load_config(opts: &RunArgs) -> Result<ScanConfig> {
    let mut config = match &opts.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    if !opts.tickers.is_empty() {
        config.watchlist = opts
            .tickers
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    config.parallel |= opts.parallel;
    config.validate()?;
    Ok(config)
}

fn parse_date(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--{flag} '{s}' is not a YYYY-MM-DD date"))
        })
        .transpose()
}

fn build_provider(opts: &RunArgs, config: &ScanConfig) -> Result<Box<dyn DataProvider>> {
    if opts.synthetic {
        warn!("using synthetic data; results are not real market history");
        return Ok(Box::new(SyntheticProvider::new()));
    }
    if let Some(dir) = &opts.csv_dir {
        return Ok(Box::new(CsvProvider::new(dir)));
    }
    let yahoo = YahooProvider::new(Duration::from_secs(config.data.timeout_secs))?
        .with_retries(config.data.max_retries, RETRY_BASE_DELAY);
    Ok(Box::new(yahoo))
}

fn build_scanner(opts: &RunArgs, config: ScanConfig) -> Result<Scanner> {
    let provider = build_provider(opts, &config)?;
    let start = parse_date("start", opts.start.as_deref())?;
    let end = parse_date("end", opts.end.as_deref())?;
    Ok(Scanner::new(config, provider)?.with_dates(start, end)?)
}

/// Print the report and push it unless this is a dry run.
fn publish(opts: &RunArgs, config: &ScanConfig, text: &str) {
    println!("{text}");
    if opts.dry_run {
        info!("dry run; notification skipped");
        return;
    }
    let sink = notify::from_env(&config.notify);
    notify::deliver(sink.as_ref(), text);
}

fn run_scan(opts: &RunArgs, config: ScanConfig) -> Result<()> {
    let scanner = build_scanner(opts, config)?;
    info!(
        tickers = scanner.config().watchlist.len(),
        as_of = %scanner.as_of(),
        "scanning"
    );
    let outcome = scanner.scan_watchlist();
    let text = report::scan_report(scanner.as_of(), &outcome);
    publish(opts, scanner.config(), &text);
    Ok(())
}

fn run_backtest(opts: &RunArgs, config: ScanConfig, output_dir: Option<PathBuf>) -> Result<()> {
    let scanner = build_scanner(opts, config)?;
    info!(
        tickers = scanner.config().watchlist.len(),
        as_of = %scanner.as_of(),
        "backtesting"
    );
    let outcome = scanner.backtest_watchlist();
    let text = report::backtest_report(
        scanner.as_of(),
        &outcome,
        scanner.config().report.recent_trades,
    );
    publish(opts, scanner.config(), &text);

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&outcome, scanner.config(), scanner.as_of(), &dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}: ")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("failed to read {label}"))?;
    Ok(line.trim().to_string())
}

fn run_stop(
    opts: &RunArgs,
    config: ScanConfig,
    ticker: Option<String>,
    entry: Option<String>,
) -> Result<()> {
    let ticker = match ticker {
        Some(t) => t,
        None => prompt("Ticker")?,
    };
    let entry = match entry {
        Some(e) => e,
        None => prompt("Entry price")?,
    };
    let request = StopRequest::parse(&ticker, &entry)?;

    let scanner = build_scanner(opts, config)?;
    let quote = scanner.quote_ticker(&request)?;
    println!("{}", report::stop_quote_block(&quote));
    Ok(())
}

fn run_check(opts: &RunArgs, config: &ScanConfig) -> Result<()> {
    build_provider(opts, config)?;
    let run_id = config.run_id()?;
    println!("Configuration OK");
    println!("Run id: {run_id}");
    println!("Watchlist: {}", config.watchlist.join(", "));
    let notify_ready = config.notify.enabled
        && [notify::TOKEN_ENV, notify::RECIPIENT_ENV]
            .iter()
            .all(|key| std::env::var(key).is_ok_and(|v| !v.trim().is_empty()));
    println!(
        "Notifications: {}",
        if notify_ready { "enabled" } else { "disabled" }
    );
    Ok(())
}
