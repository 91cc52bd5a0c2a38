//! Signal — a live entry detection on the most recent bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub date: NaiveDate,
    /// Close of the signal bar.
    pub price: f64,
    /// Suggested initial stop.
    pub stop: f64,
}

impl Signal {
    /// Distance from price to stop, in percent of price.
    pub fn risk_pct(&self) -> f64 {
        if self.price == 0.0 {
            return 0.0;
        }
        (self.price - self.stop) / self.price * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_pct_from_price_and_stop() {
        let sig = Signal {
            symbol: "2454.TW".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            price: 105.0,
            stop: 96.6,
        };
        assert!((sig.risk_pct() - 8.0).abs() < 1e-9);
    }
}
