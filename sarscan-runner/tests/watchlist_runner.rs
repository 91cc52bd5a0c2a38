//! Integration tests for the watchlist runner: per-ticker isolation, ordering,
//! and end-to-end scan/backtest/stop over offline data.

use chrono::NaiveDate;
use sarscan_core::data::synthetic::generate_bars;
use sarscan_core::data::{CsvProvider, DataError, DataProvider, DataSource, FetchResult, SyntheticProvider};
use sarscan_core::domain::ExitReason;
use sarscan_core::indicators::IndicatorConfig;
use sarscan_core::risk::StopRequest;
use sarscan_core::strategy::StrategyConfig;
use sarscan_runner::config::ScanConfig;
use sarscan_runner::report;
use sarscan_runner::runner::{RunError, Scanner};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Serves synthetic history for most symbols, a stub for `SHORT`, and nothing
/// for `MISSING`.
struct MixedProvider;

impl DataProvider for MixedProvider {
    fn name(&self) -> &str {
        "mixed"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let bars = match symbol {
            "MISSING" => {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            "SHORT" => generate_bars(symbol, start, end).into_iter().take(10).collect(),
            _ => generate_bars(symbol, start, end),
        };
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }
}

fn config(watchlist: &[&str], parallel: bool) -> ScanConfig {
    ScanConfig {
        watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
        parallel,
        ..Default::default()
    }
}

fn scanner(watchlist: &[&str], parallel: bool) -> Scanner {
    Scanner::new(config(watchlist, parallel), Box::new(MixedProvider))
        .unwrap()
        .with_dates(None, Some(d(2024, 6, 28)))
        .unwrap()
}

#[test]
fn failing_tickers_do_not_stop_the_watchlist() {
    let outcome = scanner(&["ALSO", "MISSING", "GOOD", "SHORT"], false).backtest_watchlist();

    let tested: Vec<_> = outcome.results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(tested, vec!["ALSO", "GOOD"]);

    let skipped: Vec<_> = outcome.skipped.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(skipped, vec!["MISSING", "SHORT"]);
    assert!(outcome.skipped[1].reason.contains("not enough bars"), "{}", outcome.skipped[1].reason);
}

#[test]
fn parallel_run_matches_sequential_order_and_results() {
    let watchlist = ["2330.TW", "MISSING", "0050.TW", "2454.TW", "SHORT", "2308.TW"];
    let sequential = scanner(&watchlist, false).backtest_watchlist();
    let parallel = scanner(&watchlist, true).backtest_watchlist();

    assert_eq!(sequential.results, parallel.results);
    assert_eq!(sequential.skipped, parallel.skipped);

    let scan_seq = scanner(&watchlist, false).scan_watchlist();
    let scan_par = scanner(&watchlist, true).scan_watchlist();
    assert_eq!(scan_seq.results, scan_par.results);
}

#[test]
fn backtest_trades_are_consistent_with_stats() {
    let outcome = scanner(&["2330.TW", "2454.TW"], false).backtest_watchlist();
    for r in &outcome.results {
        assert_eq!(r.stats.trade_count, r.trades.len());
        assert!(r.first_date <= r.last_date);
        assert!(r.last_date <= d(2024, 6, 28));
        for t in &r.trades {
            assert_eq!(t.symbol, r.symbol);
            assert!(t.entry_date >= r.first_date && t.exit_date <= r.last_date);
        }
    }
    assert_eq!(outcome.all_trades().len(), outcome.results.iter().map(|r| r.trades.len()).sum::<usize>());
    assert!(!outcome.has_synthetic());
}

#[test]
fn synthetic_source_is_tagged() {
    let scanner = Scanner::new(config(&["2330.TW"], false), Box::new(SyntheticProvider::new()))
        .unwrap()
        .with_dates(None, Some(d(2024, 6, 28)))
        .unwrap();
    let outcome = scanner.backtest_watchlist();
    assert!(outcome.has_synthetic());
    let text = report::backtest_report(scanner.as_of(), &outcome, 3);
    assert!(text.contains("[synthetic]"));
}

// ─── Offline CSV reversal ───────────────────────────────────────────

fn reversal_csv() -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    let mut closes = Vec::new();
    for i in 0..40 {
        closes.push(130.0 - i as f64 * 0.5);
    }
    for i in 1..=30 {
        closes.push(110.5 + i as f64 * 1.5);
    }
    for i in 1..=10 {
        closes.push(155.5 - i as f64 * 4.0);
    }
    let mut date = d(2023, 1, 2);
    let mut prev = closes[0];
    for c in closes {
        let high = prev.max(c) + 0.5;
        let low = prev.min(c) - 0.5;
        out.push_str(&format!("{date},{prev},{high},{low},{c},1000\n"));
        prev = c;
        date = date.succ_opt().unwrap();
    }
    out
}

fn csv_scanner(dir: &std::path::Path, end: NaiveDate) -> Scanner {
    let config = ScanConfig {
        watchlist: vec!["REV".into(), "NOPE".into()],
        strategy: StrategyConfig {
            indicators: IndicatorConfig {
                ma_long: None,
                adx_period: None,
                min_bars: 30,
                ..Default::default()
            },
            filters: vec![],
            ..Default::default()
        },
        ..Default::default()
    };
    Scanner::new(config, Box::new(CsvProvider::new(dir)))
        .unwrap()
        .with_dates(Some(d(2023, 1, 1)), Some(end))
        .unwrap()
}

#[test]
fn csv_backtest_finds_the_reversal_trade() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("REV.csv"), reversal_csv()).unwrap();

    let outcome = csv_scanner(dir.path(), d(2023, 12, 31)).backtest_watchlist();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].symbol, "NOPE");

    let rev = &outcome.results[0];
    assert_eq!(rev.trades.len(), 1);
    assert_eq!(rev.trades[0].entry_date, d(2023, 2, 11));
    assert_eq!(rev.trades[0].reason, ExitReason::TrailingStop);
    assert_eq!(rev.stats.win_rate, 1.0);
    assert!(rev.open_at_end.is_none());
}

#[test]
fn csv_scan_reports_signal_on_entry_day() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("REV.csv"), reversal_csv()).unwrap();

    let scanner = csv_scanner(dir.path(), d(2023, 2, 11));
    let outcome = scanner.scan_watchlist();
    let signals: Vec<_> = outcome.signals().collect();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].symbol, "REV");
    assert_eq!(signals[0].price, 112.0);

    let text = report::scan_report(scanner.as_of(), &outcome);
    assert!(text.contains("REV"));
    assert!(text.contains("- NOPE:"));
    assert!(!text.contains(report::NO_SIGNAL));
}

#[test]
fn quote_ticker_reads_latest_bar_and_rejects_unknown() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("REV.csv"), reversal_csv()).unwrap();
    let scanner = csv_scanner(dir.path(), d(2023, 3, 1));

    let quote = scanner
        .quote_ticker(&StopRequest::parse("rev", "112").unwrap())
        .unwrap();
    assert_eq!(quote.ticker, "REV");
    assert_eq!(quote.latest_date, d(2023, 3, 1));
    assert!((quote.floor - 112.0 * 0.92).abs() < 1e-9);
    assert!(quote.effective >= quote.floor);

    let err = scanner
        .quote_ticker(&StopRequest::parse("NOPE", "10").unwrap())
        .unwrap_err();
    assert!(matches!(err, RunError::Data { .. }));
}
