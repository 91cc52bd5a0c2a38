//! Indicator engine.
//!
//! Every indicator is a pure function over a full bar series that returns one value
//! per bar, NaN during warmup. `compute_frame` runs the configured set once per
//! ticker and drops the leading rows that are still warming up.

pub mod adx;
pub mod atr;
pub mod chandelier;
pub mod frame;
pub mod highest;
pub mod parabolic_sar;
pub mod rsi;
pub mod sma;

pub use adx::{Adx, Dmi, DmiSeries};
pub use atr::Atr;
pub use chandelier::ChandelierStop;
pub use frame::{compute_frame, IndicatorConfig, IndicatorError, IndicatorFrame, IndicatorRow};
pub use highest::HighestHigh;
pub use parabolic_sar::{ParabolicSar, SarParams};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Bar;

/// Trait for indicators.
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_5", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series. Same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Synthetic bars from closes: open = prev close, high/low = ±1 around the body.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
                adj_close: close,
            }
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            symbol: "TEST".to_string(),
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
            adj_close: close,
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
