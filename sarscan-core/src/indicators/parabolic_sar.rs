//! Parabolic SAR — Wilder's stop-and-reverse.
//!
//! Sequential: tracks trend direction, extreme point (EP) and acceleration factor
//! (AF). Below price in an uptrend, above price in a downtrend. The evaluator's
//! entry trigger is the bar where SAR moves from above close to below close.
//!
//! Lookback: 1 (the first value is emitted on the second bar).

use serde::{Deserialize, Serialize};

use super::Indicator;
use crate::domain::Bar;

/// Acceleration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarParams {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        Self {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    params: SarParams,
    name: String,
}

impl ParabolicSar {
    pub fn new(params: SarParams) -> Self {
        assert!(params.af_start > 0.0, "AF start must be > 0");
        assert!(params.af_step > 0.0, "AF step must be > 0");
        assert!(params.af_max >= params.af_start, "AF max must be >= AF start");
        Self {
            params,
            name: format!(
                "psar_{}_{}_{}",
                params.af_start, params.af_step, params.af_max
            ),
        }
    }

    pub fn default_params() -> Self {
        Self::new(SarParams::default())
    }
}

impl Indicator for ParabolicSar {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < 2 || bars[..2].iter().any(|b| b.high.is_nan() || b.low.is_nan()) {
            return result;
        }

        let SarParams {
            af_start,
            af_step,
            af_max,
        } = self.params;

        let mut trend = if bars[1].close >= bars[0].close {
            Trend::Up
        } else {
            Trend::Down
        };
        let mut af = af_start;
        let (mut sar, mut ep) = match trend {
            Trend::Up => (bars[0].low, bars[1].high),
            Trend::Down => (bars[0].high, bars[1].low),
        };
        result[1] = sar;

        for i in 2..n {
            let bar = &bars[i];
            if bar.high.is_nan() || bar.low.is_nan() || bar.close.is_nan() {
                // void bar: emit nothing, keep state
                continue;
            }

            let mut next = sar + af * (ep - sar);
            match trend {
                Trend::Up => {
                    // never above the two prior lows
                    for prev in [bars[i - 1].low, bars[i - 2].low] {
                        if !prev.is_nan() {
                            next = next.min(prev);
                        }
                    }
                    if bar.low < next {
                        trend = Trend::Down;
                        next = ep;
                        ep = bar.low;
                        af = af_start;
                    } else if bar.high > ep {
                        ep = bar.high;
                        af = (af + af_step).min(af_max);
                    }
                }
                Trend::Down => {
                    // never below the two prior highs
                    for prev in [bars[i - 1].high, bars[i - 2].high] {
                        if !prev.is_nan() {
                            next = next.max(prev);
                        }
                    }
                    if bar.high > next {
                        trend = Trend::Up;
                        next = ep;
                        ep = bar.high;
                        af = af_start;
                    } else if bar.low < ep {
                        ep = bar.low;
                        af = (af + af_step).min(af_max);
                    }
                }
            }

            sar = next;
            result[i] = sar;
        }

        result
    }
}
