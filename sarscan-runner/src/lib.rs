//! sarscan runner — watchlist orchestration on top of `sarscan-core`.
//!
//! - Scanner configuration loaded from TOML
//! - Per-ticker scan/backtest/stop-quote with a per-ticker error boundary
//! - Trade statistics
//! - Plain-text report blocks
//! - LINE push notifications
//! - CSV/JSON backtest artifacts

pub mod config;
pub mod export;
pub mod metrics;
pub mod notify;
pub mod report;
pub mod runner;

pub use config::{ConfigError, DataConfig, NotifyConfig, ReportConfig, RunId, ScanConfig};
pub use export::{save_artifacts, RunSummary, SCHEMA_VERSION};
pub use metrics::TradeStats;
pub use notify::{deliver, LinePush, Notifier, NotifyError, NullNotifier};
pub use runner::{
    BacktestOutcome, Mode, RunError, ScanOutcome, Scanner, Skipped, TickerBacktest, TickerScan,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scanner_is_send_sync() {
        assert_send::<Scanner>();
        assert_sync::<Scanner>();
    }

    #[test]
    fn outcomes_are_send_sync() {
        assert_send::<ScanOutcome>();
        assert_sync::<ScanOutcome>();
        assert_send::<BacktestOutcome>();
        assert_sync::<BacktestOutcome>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<ScanConfig>();
        assert_sync::<ScanConfig>();
    }
}
