//! Stop-loss calculator for a position opened outside the scanner.

use serde::Serialize;
use thiserror::Error;

use crate::indicators::IndicatorFrame;
use crate::strategy::StrategyConfig;

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("entry price '{0}' is not a number")]
    NotANumber(String),

    #[error("entry price must be positive, got {0}")]
    NonPositive(f64),
}

/// Validated stop-calculator input.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRequest {
    pub ticker: String,
    pub entry_price: f64,
}

impl StopRequest {
    /// Parse untrusted user input.
    ///
    /// ```
    /// use sarscan_core::risk::StopRequest;
    ///
    /// let req = StopRequest::parse(" 2330.tw ", "612.5").unwrap();
    /// assert_eq!(req.ticker, "2330.TW");
    /// assert_eq!(req.entry_price, 612.5);
    /// assert!(StopRequest::parse("2330.TW", "-1").is_err());
    /// ```
    pub fn parse(ticker: &str, entry_price: &str) -> Result<Self, RequestError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(RequestError::EmptyTicker);
        }

        let text = entry_price.trim();
        let price: f64 = text
            .parse()
            .map_err(|_| RequestError::NotANumber(text.to_string()))?;
        if !price.is_finite() {
            return Err(RequestError::NotANumber(text.to_string()));
        }
        if price <= 0.0 {
            return Err(RequestError::NonPositive(price));
        }

        Ok(Self {
            ticker,
            entry_price: price,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopQuote {
    pub ticker: String,
    pub entry_price: f64,
    pub latest_close: f64,
    pub latest_date: chrono::NaiveDate,
    /// entry × (1 − max_loss_fraction)
    pub floor: f64,
    /// Chandelier level on the latest bar.
    pub dynamic: f64,
    /// max(floor, dynamic) under the Chandelier rule, the floor alone otherwise.
    pub effective: f64,
    /// Distance from the latest close down to the effective stop, in percent.
    pub distance_pct: f64,
    /// Latest close is already below the effective stop.
    pub breached: bool,
}

impl StopQuote {
    /// P/L of the position at the latest close, in percent.
    pub fn open_pl_pct(&self) -> f64 {
        (self.latest_close - self.entry_price) / self.entry_price * 100.0
    }
}

/// Quote the stop for `request` against the latest row of `frame`.
/// Returns `None` for an empty frame.
pub fn quote_stop(
    frame: &IndicatorFrame,
    request: &StopRequest,
    config: &StrategyConfig,
) -> Option<StopQuote> {
    let last = frame.last()?;
    let floor = config.stop.floor(request.entry_price);
    let dynamic = last.dynamic_stop;
    let effective = config.stop.candidate(request.entry_price, dynamic);
    let close = last.close();

    Some(StopQuote {
        ticker: request.ticker.clone(),
        entry_price: request.entry_price,
        latest_close: close,
        latest_date: last.date(),
        floor,
        dynamic,
        effective,
        distance_pct: (close - effective) / close * 100.0,
        breached: close < effective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::indicators::IndicatorRow;
    use chrono::NaiveDate;

    fn frame(close: f64, dynamic_stop: f64) -> IndicatorFrame {
        let row = IndicatorRow {
            bar: Bar {
                symbol: "2330.TW".into(),
                date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
                adj_close: close,
            },
            sar: close - 5.0,
            ma_short: close,
            ma_long: None,
            atr: 1.0,
            dynamic_stop,
            adx: None,
            plus_di: None,
            minus_di: None,
            rsi: None,
        };
        IndicatorFrame::from_rows("2330.TW", vec![row])
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(StopRequest::parse("  ", "10"), Err(RequestError::EmptyTicker));
        assert_eq!(
            StopRequest::parse("AAPL", "ten"),
            Err(RequestError::NotANumber("ten".into()))
        );
        assert_eq!(StopRequest::parse("AAPL", "0"), Err(RequestError::NonPositive(0.0)));
        assert!(matches!(
            StopRequest::parse("AAPL", "NaN"),
            Err(RequestError::NotANumber(_))
        ));
    }

    #[test]
    fn dynamic_stop_above_floor_wins() {
        let req = StopRequest::parse("2330.TW", "100").unwrap();
        let quote = quote_stop(&frame(110.0, 101.0), &req, &StrategyConfig::default()).unwrap();
        assert!((quote.floor - 92.0).abs() < 1e-9);
        assert_eq!(quote.effective, 101.0);
        assert!(!quote.breached);
        assert!((quote.distance_pct - 9.0 / 110.0 * 100.0).abs() < 1e-9);
        assert!((quote.open_pl_pct() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn floor_wins_when_dynamic_is_low() {
        let req = StopRequest::parse("2330.TW", "100").unwrap();
        let quote = quote_stop(&frame(90.0, 80.0), &req, &StrategyConfig::default()).unwrap();
        assert!((quote.effective - 92.0).abs() < 1e-9);
        assert!(quote.breached);
        assert!(quote.distance_pct < 0.0);
    }

    #[test]
    fn empty_frame_has_no_quote() {
        let req = StopRequest::parse("X", "1").unwrap();
        let empty = IndicatorFrame::from_rows("X", Vec::new());
        assert!(quote_stop(&empty, &req, &StrategyConfig::default()).is_none());
    }
}
