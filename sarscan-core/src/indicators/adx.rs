//! ADX / DMI — Wilder's directional movement system.
//!
//! 1. +DM / -DM from consecutive highs and lows
//! 2. Wilder-smooth +DM, -DM and TR
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! DI lookback: period. ADX lookback: 2 * period - 1.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Bar;

/// All three DMI outputs, aligned with the input bars.
#[derive(Debug, Clone, Default)]
pub struct DmiSeries {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

/// Directional movement index calculator.
#[derive(Debug, Clone)]
pub struct Dmi {
    period: usize,
}

impl Dmi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "DMI period must be >= 1");
        Self { period }
    }

    pub fn compute(&self, bars: &[Bar]) -> DmiSeries {
        let n = bars.len();
        let mut out = DmiSeries {
            plus_di: vec![f64::NAN; n],
            minus_di: vec![f64::NAN; n],
            adx: vec![f64::NAN; n],
        };
        if n < 2 {
            return out;
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let (cur, prev) = (&bars[i], &bars[i - 1]);
            if cur.high.is_nan() || cur.low.is_nan() || prev.high.is_nan() || prev.low.is_nan() {
                continue;
            }
            let up = cur.high - prev.high;
            let down = prev.low - cur.low;
            plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
            minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        }

        let smooth_tr = wilder_smooth(&true_range(bars), self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            let tr = smooth_tr[i];
            if tr.is_nan() || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() || tr == 0.0 {
                continue;
            }
            let plus_di = 100.0 * smooth_plus[i] / tr;
            let minus_di = 100.0 * smooth_minus[i] / tr;
            out.plus_di[i] = plus_di;
            out.minus_di[i] = minus_di;

            let sum = plus_di + minus_di;
            dx[i] = if sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / sum
            };
        }

        out.adx = wilder_smooth(&dx, self.period);
        out
    }
}

/// ADX as a single-series indicator.
#[derive(Debug, Clone)]
pub struct Adx {
    dmi: Dmi,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            dmi: Dmi::new(period),
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.dmi.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.dmi.compute(bars).adx
    }
}
