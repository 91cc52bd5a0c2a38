//! Watchlist runner — wires together data, indicators, evaluator, and stats.
//!
//! Each ticker is processed in isolation: fetch → clean → indicator frame →
//! evaluate. Any failure is captured as a `RunError` for that ticker alone; the
//! watchlist entry points log it, record it in `skipped`, and carry on.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use sarscan_core::data::{clean_bars, DataError, DataProvider, DataSource};
use sarscan_core::domain::{Bar, OpenPositionSnapshot, Signal, TradeRecord};
use sarscan_core::indicators::{compute_frame, IndicatorError, IndicatorFrame};
use sarscan_core::risk::{quote_stop, StopQuote, StopRequest};
use sarscan_core::strategy::{Evaluator, StrategyError};

use crate::config::{ConfigError, ScanConfig};
use crate::metrics::TradeStats;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("{symbol}: {source}")]
    Data {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("{symbol}: {source}")]
    Indicator {
        symbol: String,
        #[source]
        source: IndicatorError,
    },

    #[error("invalid date window: start {start} is after end {end}")]
    DateWindow { start: NaiveDate, end: NaiveDate },
}

/// Which history window to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Scan,
    Backtest,
}

/// A ticker that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub symbol: String,
    pub reason: String,
}

/// Latest-bar evaluation of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerScan {
    pub symbol: String,
    pub source: DataSource,
    pub as_of: NaiveDate,
    pub close: f64,
    pub signal: Option<Signal>,
}

/// Full-history evaluation of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerBacktest {
    pub symbol: String,
    pub source: DataSource,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Rows evaluated after warmup.
    pub rows: usize,
    pub trades: Vec<TradeRecord>,
    pub stats: TradeStats,
    pub open_at_end: Option<OpenPositionSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub results: Vec<TickerScan>,
    pub skipped: Vec<Skipped>,
}

impl ScanOutcome {
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.results.iter().filter_map(|r| r.signal.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestOutcome {
    pub results: Vec<TickerBacktest>,
    pub skipped: Vec<Skipped>,
}

impl BacktestOutcome {
    /// Every trade across the watchlist, in watchlist order.
    pub fn all_trades(&self) -> Vec<TradeRecord> {
        self.results.iter().flat_map(|r| r.trades.iter().cloned()).collect()
    }

    pub fn has_synthetic(&self) -> bool {
        self.results.iter().any(|r| r.source == DataSource::Synthetic)
    }
}

pub struct Scanner {
    config: ScanConfig,
    provider: Box<dyn DataProvider>,
    evaluator: Evaluator,
    start: Option<NaiveDate>,
    end: NaiveDate,
}

impl Scanner {
    /// Validates the config and builds the evaluator. The history window ends today.
    pub fn new(config: ScanConfig, provider: Box<dyn DataProvider>) -> Result<Self, RunError> {
        config.validate()?;
        let evaluator = Evaluator::new(config.strategy.clone())?;
        Ok(Self {
            config,
            provider,
            evaluator,
            start: None,
            end: chrono::Local::now().date_naive(),
        })
    }

    /// Pin the history window. A missing start falls back to the mode's lookback.
    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, RunError> {
        if let Some(end) = end {
            self.end = end;
        }
        if let Some(start) = start {
            if start > self.end {
                return Err(RunError::DateWindow { start, end: self.end });
            }
        }
        self.start = start;
        Ok(self)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn as_of(&self) -> NaiveDate {
        self.end
    }

    pub fn window(&self, mode: Mode) -> (NaiveDate, NaiveDate) {
        let days = match mode {
            Mode::Scan => self.config.data.scan_lookback_days,
            Mode::Backtest => self.config.data.backtest_lookback_days,
        };
        let start = self
            .start
            .unwrap_or_else(|| self.end - Duration::days(i64::from(days)));
        (start, self.end)
    }

    fn load(&self, symbol: &str, mode: Mode) -> Result<(Vec<Bar>, DataSource), RunError> {
        let (start, end) = self.window(mode);
        let fetched = self
            .provider
            .fetch(symbol, start, end)
            .map_err(|source| RunError::Data {
                symbol: symbol.to_string(),
                source,
            })?;
        let bars = clean_bars(symbol, fetched.bars);
        debug!(symbol, provider = self.provider.name(), bars = bars.len(), "loaded");
        Ok((bars, fetched.source))
    }

    fn frame(&self, symbol: &str, bars: &[Bar]) -> Result<IndicatorFrame, RunError> {
        compute_frame(bars, &self.config.strategy.indicators).map_err(|source| {
            RunError::Indicator {
                symbol: symbol.to_string(),
                source,
            }
        })
    }

    /// Entry signal on the latest bar of one ticker.
    pub fn scan_ticker(&self, symbol: &str) -> Result<TickerScan, RunError> {
        let (bars, source) = self.load(symbol, Mode::Scan)?;
        let frame = self.frame(symbol, &bars)?;
        let signal = self.evaluator.latest_signal(&frame);
        let (as_of, close) = frame
            .last()
            .map(|row| (row.date(), row.close()))
            .ok_or_else(|| RunError::Indicator {
                symbol: symbol.to_string(),
                source: IndicatorError::NoUsableRows { dropped: bars.len() },
            })?;

        if signal.is_some() {
            info!(symbol, %as_of, close, "entry signal");
        }
        Ok(TickerScan {
            symbol: symbol.to_string(),
            source,
            as_of,
            close,
            signal,
        })
    }

    /// Full-history backtest of one ticker.
    pub fn backtest_ticker(&self, symbol: &str) -> Result<TickerBacktest, RunError> {
        let (bars, source) = self.load(symbol, Mode::Backtest)?;
        let frame = self.frame(symbol, &bars)?;
        let run = self.evaluator.run(&frame);
        let stats = TradeStats::compute(&run.trades);

        let (first_date, last_date) = match (frame.rows().first(), frame.last()) {
            (Some(first), Some(last)) => (first.date(), last.date()),
            _ => {
                return Err(RunError::Indicator {
                    symbol: symbol.to_string(),
                    source: IndicatorError::NoUsableRows { dropped: bars.len() },
                })
            }
        };

        debug!(symbol, trades = stats.trade_count, "backtest complete");
        Ok(TickerBacktest {
            symbol: symbol.to_string(),
            source,
            first_date,
            last_date,
            rows: frame.len(),
            trades: run.trades,
            stats,
            open_at_end: run.open_at_end,
        })
    }

    /// Stop quote for a position opened at `request.entry_price`.
    pub fn quote_ticker(&self, request: &StopRequest) -> Result<StopQuote, RunError> {
        let symbol = request.ticker.as_str();
        let (bars, _) = self.load(symbol, Mode::Scan)?;
        let frame = self.frame(symbol, &bars)?;
        quote_stop(&frame, request, &self.config.strategy).ok_or_else(|| RunError::Indicator {
            symbol: symbol.to_string(),
            source: IndicatorError::NoUsableRows { dropped: bars.len() },
        })
    }

    /// Run `f` for every watchlist ticker, in watchlist order.
    fn each_ticker<T, F>(&self, f: F) -> (Vec<T>, Vec<Skipped>)
    where
        T: Send,
        F: Fn(&str) -> Result<T, RunError> + Sync,
    {
        let tickers: Vec<&str> = self
            .config
            .watchlist
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let outcomes: Vec<(&str, Result<T, RunError>)> = if self.config.parallel {
            tickers.par_iter().map(|&t| (t, f(t))).collect()
        } else {
            tickers.iter().map(|&t| (t, f(t))).collect()
        };

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(r) => results.push(r),
                Err(e) => {
                    warn!(symbol, error = %e, "skipping ticker");
                    skipped.push(Skipped {
                        symbol: symbol.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        (results, skipped)
    }

    pub fn scan_watchlist(&self) -> ScanOutcome {
        let (results, skipped) = self.each_ticker(|t| self.scan_ticker(t));
        info!(
            scanned = results.len(),
            signals = results.iter().filter(|r| r.signal.is_some()).count(),
            skipped = skipped.len(),
            "scan finished"
        );
        ScanOutcome { results, skipped }
    }

    pub fn backtest_watchlist(&self) -> BacktestOutcome {
        let (results, skipped) = self.each_ticker(|t| self.backtest_ticker(t));
        info!(tested = results.len(), skipped = skipped.len(), "backtest finished");
        BacktestOutcome { results, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarscan_core::data::{FetchResult, SyntheticProvider};

    struct FailingProvider;

    impl DataProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(&self, symbol: &str, _start: NaiveDate, _end: NaiveDate) -> Result<FetchResult, DataError> {
            Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config(watchlist: &[&str]) -> ScanConfig {
        ScanConfig {
            watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn windows_follow_mode_lookback() {
        let scanner = Scanner::new(config(&["A"]), Box::new(SyntheticProvider::new()))
            .unwrap()
            .with_dates(None, Some(d(2024, 6, 30)))
            .unwrap();
        assert_eq!(scanner.window(Mode::Scan), (d(2023, 7, 1), d(2024, 6, 30)));
        assert_eq!(scanner.window(Mode::Backtest), (d(2022, 7, 1), d(2024, 6, 30)));
    }

    #[test]
    fn explicit_start_overrides_lookback() {
        let scanner = Scanner::new(config(&["A"]), Box::new(SyntheticProvider::new()))
            .unwrap()
            .with_dates(Some(d(2020, 1, 1)), Some(d(2024, 6, 30)))
            .unwrap();
        assert_eq!(scanner.window(Mode::Scan).0, d(2020, 1, 1));
        assert_eq!(scanner.window(Mode::Backtest).0, d(2020, 1, 1));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let result = Scanner::new(config(&["A"]), Box::new(SyntheticProvider::new()))
            .unwrap()
            .with_dates(Some(d(2025, 1, 1)), Some(d(2024, 1, 1)));
        assert!(matches!(result, Err(RunError::DateWindow { .. })));
    }

    #[test]
    fn failing_tickers_are_skipped_in_order() {
        let scanner = Scanner::new(config(&["B", "A", "C"]), Box::new(FailingProvider)).unwrap();
        let outcome = scanner.scan_watchlist();
        assert!(outcome.results.is_empty());
        let symbols: Vec<_> = outcome.skipped.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "A", "C"]);
        assert!(outcome.skipped[0].reason.contains("symbol not found"));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let result = Scanner::new(config(&[]), Box::new(SyntheticProvider::new()));
        assert!(matches!(result, Err(RunError::Config(_))));
    }
}
