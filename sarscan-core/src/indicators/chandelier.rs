//! Chandelier stop — highest high over the ATR window minus ATR × multiplier.
//!
//! This is the dynamic trailing-stop level for long positions. The evaluator
//! ratchets it; the series itself is free to move down when volatility expands.
//! Lookback: period.

use super::atr::Atr;
use super::highest::HighestHigh;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct ChandelierStop {
    period: usize,
    multiplier: f64,
    name: String,
}

impl ChandelierStop {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Chandelier period must be >= 1");
        assert!(multiplier > 0.0, "Chandelier multiplier must be positive");
        Self {
            period,
            multiplier,
            name: format!("chandelier_{period}_{multiplier}"),
        }
    }

    /// Combine precomputed highest-high and ATR series.
    pub fn from_parts(highest: &[f64], atr: &[f64], multiplier: f64) -> Vec<f64> {
        highest
            .iter()
            .zip(atr)
            .map(|(&hh, &a)| {
                if hh.is_nan() || a.is_nan() {
                    f64::NAN
                } else {
                    hh - a * multiplier
                }
            })
            .collect()
    }
}

impl Indicator for ChandelierStop {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let highest = HighestHigh::new(self.period).compute(bars);
        let atr = Atr::new(self.period).compute(bars);
        Self::from_parts(&highest, &atr, self.multiplier)
    }
}
