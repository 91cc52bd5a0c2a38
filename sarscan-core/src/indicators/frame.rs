//! Indicator frame — a bar series augmented with every derived series the
//! evaluator reads, with warmup rows dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{Atr, ChandelierStop, Dmi, HighestHigh, Indicator, ParabolicSar, Rsi, SarParams, Sma};
use crate::domain::Bar;

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("not enough bars: have {have}, need at least {need}")]
    InsufficientBars { have: usize, need: usize },

    #[error("no rows left after dropping {dropped} warmup rows")]
    NoUsableRows { dropped: usize },

    #[error("invalid indicator config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> IndicatorError {
    IndicatorError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

/// Which series to compute and with what parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sar: SarParams,
    pub ma_short: usize,
    /// Long moving average; `None` disables the series.
    pub ma_long: Option<usize>,
    pub atr_period: usize,
    /// ATR multiple subtracted from the highest high for the Chandelier stop.
    pub atr_multiplier: f64,
    /// ATR multiple subtracted from the close for the stop set on the entry bar.
    pub initial_atr_multiplier: f64,
    /// ADX/DMI period; `None` disables the series.
    pub adx_period: Option<usize>,
    /// RSI period; `None` disables the series.
    pub rsi_period: Option<usize>,
    /// Fewer bars than this is a fetch failure, not a short frame.
    pub min_bars: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sar: SarParams::default(),
            ma_short: 5,
            ma_long: Some(50),
            atr_period: 14,
            atr_multiplier: 3.0,
            initial_atr_multiplier: 2.0,
            adx_period: Some(14),
            rsi_period: None,
            min_bars: 60,
        }
    }
}

impl IndicatorConfig {
    /// Reject parameters the indicators cannot be built from.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let sar = &self.sar;
        if [sar.af_start, sar.af_step, sar.af_max]
            .iter()
            .any(|v| v.is_nan() || *v <= 0.0)
        {
            return Err(invalid("sar", "acceleration factors must be positive"));
        }
        if sar.af_start > sar.af_max {
            return Err(invalid(
                "sar.af_start",
                format!("{} exceeds af_max {}", sar.af_start, sar.af_max),
            ));
        }

        if self.ma_short == 0 {
            return Err(invalid("ma_short", "must be at least 1"));
        }
        if let Some(long) = self.ma_long {
            if long == 0 {
                return Err(invalid("ma_long", "must be at least 1"));
            }
            if self.ma_short >= long {
                return Err(invalid(
                    "ma_short",
                    format!("{} must be shorter than ma_long {long}", self.ma_short),
                ));
            }
        }
        if self.atr_period == 0 {
            return Err(invalid("atr_period", "must be at least 1"));
        }
        if self.adx_period == Some(0) {
            return Err(invalid("adx_period", "must be at least 1"));
        }
        if self.rsi_period == Some(0) {
            return Err(invalid("rsi_period", "must be at least 1"));
        }
        for (field, k) in [
            ("atr_multiplier", self.atr_multiplier),
            ("initial_atr_multiplier", self.initial_atr_multiplier),
        ] {
            if !k.is_finite() || k <= 0.0 {
                return Err(invalid(field, format!("{k} must be positive")));
            }
        }
        Ok(())
    }

    /// Longest warmup among the enabled series.
    pub fn max_lookback(&self) -> Result<usize, IndicatorError> {
        self.validate()?;
        let mut lookbacks = vec![
            ParabolicSar::new(self.sar).lookback(),
            Sma::new(self.ma_short).lookback(),
            ChandelierStop::new(self.atr_period, self.atr_multiplier).lookback(),
        ];
        if let Some(p) = self.ma_long {
            lookbacks.push(Sma::new(p).lookback());
        }
        if let Some(p) = self.adx_period {
            lookbacks.push(super::Adx::new(p).lookback());
        }
        if let Some(p) = self.rsi_period {
            lookbacks.push(Rsi::new(p).lookback());
        }
        Ok(lookbacks.into_iter().max().unwrap_or(0))
    }
}

/// One bar plus its indicator values. Optional fields are `None` when the series
/// is disabled in the config; enabled series are always defined on kept rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub bar: Bar,
    pub sar: f64,
    pub ma_short: f64,
    pub ma_long: Option<f64>,
    pub atr: f64,
    /// Chandelier stop level for this bar.
    pub dynamic_stop: f64,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorRow {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    /// SAR below close: the indicator is acting as support.
    pub fn sar_below_close(&self) -> bool {
        self.sar < self.bar.close
    }

    /// SAR above close: the indicator is acting as resistance.
    pub fn sar_above_close(&self) -> bool {
        self.sar > self.bar.close
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub symbol: String,
    rows: Vec<IndicatorRow>,
    /// Number of input bars discarded because a required series was undefined.
    pub dropped: usize,
}

impl IndicatorFrame {
    /// Build a frame from already-computed rows (replays, fixtures).
    pub fn from_rows(symbol: impl Into<String>, rows: Vec<IndicatorRow>) -> Self {
        Self {
            symbol: symbol.into(),
            rows,
            dropped: 0,
        }
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// The last two rows, oldest first.
    pub fn last_pair(&self) -> Option<(&IndicatorRow, &IndicatorRow)> {
        match self.rows.as_slice() {
            [.., prev, cur] => Some((prev, cur)),
            _ => None,
        }
    }
}

fn optional(enabled: bool, series: &[f64], i: usize) -> Option<Option<f64>> {
    if !enabled {
        return Some(None);
    }
    let v = series[i];
    if v.is_nan() {
        None
    } else {
        Some(Some(v))
    }
}

/// Compute every configured indicator over `bars` and keep the rows where all
/// enabled series are defined.
pub fn compute_frame(bars: &[Bar], config: &IndicatorConfig) -> Result<IndicatorFrame, IndicatorError> {
    config.validate()?;
    if bars.len() < config.min_bars.max(2) {
        return Err(IndicatorError::InsufficientBars {
            have: bars.len(),
            need: config.min_bars.max(2),
        });
    }

    let n = bars.len();
    let sar = ParabolicSar::new(config.sar).compute(bars);
    let ma_short = Sma::new(config.ma_short).compute(bars);
    let ma_long = match config.ma_long {
        Some(p) => Sma::new(p).compute(bars),
        None => vec![f64::NAN; n],
    };
    let atr = Atr::new(config.atr_period).compute(bars);
    let highest = HighestHigh::new(config.atr_period).compute(bars);
    let dynamic_stop = ChandelierStop::from_parts(&highest, &atr, config.atr_multiplier);
    let dmi = match config.adx_period {
        Some(p) => Dmi::new(p).compute(bars),
        None => Default::default(),
    };
    let rsi = match config.rsi_period {
        Some(p) => Rsi::new(p).compute(bars),
        None => vec![f64::NAN; n],
    };

    let adx_on = config.adx_period.is_some();
    let mut rows = Vec::with_capacity(n);
    for (i, bar) in bars.iter().enumerate() {
        if [sar[i], ma_short[i], atr[i], dynamic_stop[i]]
            .iter()
            .any(|v| v.is_nan())
        {
            continue;
        }
        let (Some(ma_long), Some(adx), Some(plus_di), Some(minus_di), Some(rsi)) = (
            optional(config.ma_long.is_some(), &ma_long, i),
            optional(adx_on, &dmi.adx, i),
            optional(adx_on, &dmi.plus_di, i),
            optional(adx_on, &dmi.minus_di, i),
            optional(config.rsi_period.is_some(), &rsi, i),
        ) else {
            continue;
        };

        rows.push(IndicatorRow {
            bar: bar.clone(),
            sar: sar[i],
            ma_short: ma_short[i],
            ma_long,
            atr: atr[i],
            dynamic_stop: dynamic_stop[i],
            adx,
            plus_di,
            minus_di,
            rsi,
        });
    }

    let dropped = n - rows.len();
    if rows.is_empty() {
        return Err(IndicatorError::NoUsableRows { dropped });
    }

    let symbol = bars[0].symbol.clone();
    debug!(symbol = %symbol, bars = n, dropped, "computed indicator frame");

    Ok(IndicatorFrame {
        symbol,
        rows,
        dropped,
    })
}
