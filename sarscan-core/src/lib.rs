//! sarscan core — market data, indicators, the SAR-flip evaluator, stop calculator.
//!
//! This crate contains everything that does not touch configuration files or the
//! outside world beyond fetching bars:
//! - Domain types (bars, positions, trades, signals)
//! - Data providers (Yahoo Finance, CSV, synthetic) and bar cleaning
//! - Indicator engine producing an aligned indicator frame
//! - Signal evaluator with a ratcheting stop, shared by scan and backtest
//! - Stop-loss calculator for positions opened elsewhere

pub mod data;
pub mod domain;
pub mod indicators;
pub mod risk;
pub mod strategy;
