//! TradeRecord — the outcome of a closed long position.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close fell through the stop below the entry price.
    StopLoss,
    /// Close fell through the stop at or above the entry price (gain protected).
    TrailingStop,
    /// Still open when the data ran out; closed at the last close for reporting only.
    EndOfPeriod,
}

impl ExitReason {
    /// Classify a stop breach by where the exit happened relative to entry.
    pub fn for_stop_breach(entry_price: f64, exit_price: f64) -> Self {
        if exit_price < entry_price {
            ExitReason::StopLoss
        } else {
            ExitReason::TrailingStop
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop-loss",
            ExitReason::TrailingStop => "trailing stop",
            ExitReason::EndOfPeriod => "held to end of period",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A complete round trip: entry → exit. Created only at exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,

    pub entry_date: NaiveDate,
    pub entry_price: f64,

    pub exit_date: NaiveDate,
    pub exit_price: f64,

    /// Stop level in force on the exit bar.
    pub exit_stop: f64,
    pub bars_held: usize,
    pub reason: ExitReason,
}

impl TradeRecord {
    /// Profit/loss in percent of the entry price.
    pub fn pl_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.exit_price - self.entry_price) / self.entry_price * 100.0
    }

    pub fn is_winner(&self) -> bool {
        self.pl_pct() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            symbol: "2330.TW".into(),
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_price: 100.0,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            exit_price: 93.0,
            exit_stop: 94.0,
            bars_held: 4,
            reason: ExitReason::StopLoss,
        }
    }

    #[test]
    fn pl_pct_calculation() {
        let trade = sample_trade();
        assert!((trade.pl_pct() - -7.0).abs() < 1e-10);
        assert!(!trade.is_winner());
    }

    #[test]
    fn breach_reason_depends_on_entry() {
        assert_eq!(ExitReason::for_stop_breach(100.0, 93.0), ExitReason::StopLoss);
        assert_eq!(ExitReason::for_stop_breach(100.0, 112.0), ExitReason::TrailingStop);
        assert_eq!(ExitReason::for_stop_breach(100.0, 100.0), ExitReason::TrailingStop);
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::EndOfPeriod).unwrap();
        assert_eq!(json, "\"end_of_period\"");
    }
}
