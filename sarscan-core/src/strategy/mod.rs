//! SAR-flip entry strategy with a ratcheting Chandelier stop.
//!
//! The same evaluator drives both the live scan (last bar only) and the
//! full-history backtest.

pub mod config;
pub mod evaluator;
pub mod ratchet;

pub use config::{EntryFilter, StopRule, StrategyConfig};
pub use evaluator::{BacktestRun, Evaluator, StopPoint, StrategyError};
pub use ratchet::RatchetStop;
