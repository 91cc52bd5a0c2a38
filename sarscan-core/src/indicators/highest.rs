//! Highest high over a trailing window: max(high[t-period+1..=t]).
//!
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct HighestHigh {
    period: usize,
    name: String,
}

impl HighestHigh {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "HighestHigh period must be >= 1");
        Self {
            period,
            name: format!("highest_high_{period}"),
        }
    }
}

/// Rolling maximum. Windows containing NaN produce NaN.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }
    result
}

impl Indicator for HighestHigh {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        rolling_max(&highs, self.period)
    }
}
