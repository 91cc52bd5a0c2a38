//! Strategy parameters: indicator settings, active entry filters, stop rule.

use serde::{Deserialize, Serialize};

use super::evaluator::StrategyError;
use crate::indicators::IndicatorConfig;

/// Extra entry conditions on top of the SAR flip and short-MA check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryFilter {
    /// Close above the long moving average.
    LongMa,
    /// ADX above `min_adx` with +DI above -DI.
    TrendStrength { min_adx: f64 },
    /// RSI above `min_rsi`.
    Momentum { min_rsi: f64 },
}

impl EntryFilter {
    pub fn name(&self) -> &'static str {
        match self {
            EntryFilter::LongMa => "long_ma",
            EntryFilter::TrendStrength { .. } => "trend_strength",
            EntryFilter::Momentum { .. } => "momentum",
        }
    }
}

/// How the stop of an open position is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopRule {
    /// max(previous stop, Chandelier stop, entry × (1 − max_loss_fraction)).
    Chandelier { max_loss_fraction: f64 },
    /// Fixed entry × (1 − max_loss_fraction), no trailing.
    HardPercent { max_loss_fraction: f64 },
}

impl Default for StopRule {
    fn default() -> Self {
        StopRule::Chandelier {
            max_loss_fraction: 0.08,
        }
    }
}

impl StopRule {
    pub fn max_loss_fraction(&self) -> f64 {
        match *self {
            StopRule::Chandelier { max_loss_fraction } => max_loss_fraction,
            StopRule::HardPercent { max_loss_fraction } => max_loss_fraction,
        }
    }

    /// Worst-case floor below entry.
    pub fn floor(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.max_loss_fraction())
    }

    /// Stop proposed for a bar, before the ratchet.
    pub fn candidate(&self, entry_price: f64, dynamic_stop: f64) -> f64 {
        let floor = self.floor(entry_price);
        match self {
            StopRule::Chandelier { .. } => floor.max(dynamic_stop),
            StopRule::HardPercent { .. } => floor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub indicators: IndicatorConfig,
    pub filters: Vec<EntryFilter>,
    pub stop: StopRule,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorConfig::default(),
            filters: vec![
                EntryFilter::LongMa,
                EntryFilter::TrendStrength { min_adx: 20.0 },
            ],
            stop: StopRule::default(),
        }
    }
}

impl StrategyConfig {
    /// Indicator parameters, stop bounds, and series required by each filter.
    pub fn validate(&self) -> Result<(), StrategyError> {
        let ind = &self.indicators;
        ind.validate()?;

        let f = self.stop.max_loss_fraction();
        if f.is_nan() || f <= 0.0 || f >= 1.0 {
            return Err(StrategyError::MaxLossOutOfRange(f));
        }

        for filter in &self.filters {
            let missing = match filter {
                EntryFilter::LongMa if ind.ma_long.is_none() => Some("long moving average"),
                EntryFilter::TrendStrength { .. } if ind.adx_period.is_none() => Some("ADX/DMI"),
                EntryFilter::Momentum { .. } if ind.rsi_period.is_none() => Some("RSI"),
                _ => None,
            };
            if let Some(series) = missing {
                return Err(StrategyError::MissingSeries {
                    filter: filter.name(),
                    series,
                });
            }
        }
        Ok(())
    }
}
