//! Backtest artifacts — trade tape as CSV and a JSON summary.
//!
//! A run writes `<output>/<run_id>/trades.csv` and `summary.json`, where the run
//! id is the config fingerprint. Re-running the same config overwrites the same
//! directory. Summaries carry a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use sarscan_core::data::DataSource;
use sarscan_core::domain::{OpenPositionSnapshot, TradeRecord};

use crate::config::{RunId, ScanConfig};
use crate::metrics::TradeStats;
use crate::runner::{BacktestOutcome, Skipped};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub symbol: String,
    pub source: DataSource,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub stats: TradeStats,
    pub open_at_end: Option<OpenPositionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSummary {
    pub symbol: String,
    pub reason: String,
}

impl From<&Skipped> for SkippedSummary {
    fn from(s: &Skipped) -> Self {
        Self {
            symbol: s.symbol.clone(),
            reason: s.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub run_id: RunId,
    pub as_of: NaiveDate,
    pub has_synthetic: bool,
    pub config: ScanConfig,
    pub tickers: Vec<TickerSummary>,
    pub skipped: Vec<SkippedSummary>,
}

impl RunSummary {
    pub fn new(outcome: &BacktestOutcome, config: &ScanConfig, as_of: NaiveDate) -> Result<Self> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            run_id: config.run_id()?,
            as_of,
            has_synthetic: outcome.has_synthetic(),
            config: config.clone(),
            tickers: outcome
                .results
                .iter()
                .map(|r| TickerSummary {
                    symbol: r.symbol.clone(),
                    source: r.source,
                    first_date: r.first_date,
                    last_date: r.last_date,
                    stats: r.stats.clone(),
                    open_at_end: r.open_at_end.clone(),
                })
                .collect(),
            skipped: outcome.skipped.iter().map(SkippedSummary::from).collect(),
        })
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize run summary")
}

/// Parse a summary, rejecting unknown schema versions.
pub fn import_summary_json(json: &str) -> Result<RunSummary> {
    let summary: RunSummary =
        serde_json::from_str(json).context("failed to deserialize run summary")?;
    if summary.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            summary.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(summary)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: symbol, entry_date, entry_price, exit_date, exit_price, exit_stop,
/// bars_held, pl_pct, reason
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "exit_stop",
        "bars_held",
        "pl_pct",
        "reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.symbol,
            &t.entry_date.to_string(),
            &format!("{:.4}", t.entry_price),
            &t.exit_date.to_string(),
            &format!("{:.4}", t.exit_price),
            &format!("{:.4}", t.exit_stop),
            &t.bars_held.to_string(),
            &format!("{:.4}", t.pl_pct()),
            t.reason.label(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `trades.csv` and `summary.json` under `output_dir/<run_id>/`.
///
/// Returns the path to the run directory.
pub fn save_artifacts(
    outcome: &BacktestOutcome,
    config: &ScanConfig,
    as_of: NaiveDate,
    output_dir: &Path,
) -> Result<PathBuf> {
    let summary = RunSummary::new(outcome, config, as_of)?;
    let run_dir = output_dir.join(&summary.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let trades_csv = export_trades_csv(&outcome.all_trades())?;
    std::fs::write(run_dir.join("trades.csv"), trades_csv)
        .with_context(|| format!("failed to write trades.csv in {}", run_dir.display()))?;

    let json = export_summary_json(&summary)?;
    std::fs::write(run_dir.join("summary.json"), json)
        .with_context(|| format!("failed to write summary.json in {}", run_dir.display()))?;

    info!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

pub fn load_summary(run_dir: &Path) -> Result<RunSummary> {
    let path = run_dir.join("summary.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_summary_json(&json)
}
