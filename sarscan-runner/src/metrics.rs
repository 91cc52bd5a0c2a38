//! Trade statistics — pure functions over a list of closed trades.
//!
//! Every statistic works on per-trade P/L percentages. Returns compound trade by
//! trade as if the whole stake were reinvested; there is no capital, sizing, or
//! calendar time involved.

use serde::{Deserialize, Serialize};
use sarscan_core::domain::TradeRecord;

/// Aggregate statistics for one ticker's backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trade_count: usize,
    /// Fraction of trades with P/L > 0.
    pub win_rate: f64,
    /// Compounded return as a fraction: ∏(1 + pl/100) − 1.
    pub total_return: f64,
    /// Mean P/L % of winning trades (0 when there are none).
    pub avg_win_pct: f64,
    /// Mean P/L % of losing trades, negative (0 when there are none).
    pub avg_loss_pct: f64,
    /// |avg win| / |avg loss|; 0 when there are no losers.
    pub win_loss_ratio: f64,
    /// Sum of winning P/L % over the absolute sum of losing P/L %, capped at 100.
    pub profit_factor: f64,
    /// Worst peak-to-trough of the compounded trade equity, as a negative fraction.
    pub max_drawdown: f64,
    pub max_consecutive_losses: usize,
    pub avg_bars_held: f64,
}

impl TradeStats {
    pub fn compute(trades: &[TradeRecord]) -> Self {
        let pls: Vec<f64> = trades.iter().map(TradeRecord::pl_pct).collect();
        let avg_win_pct = avg_win(&pls);
        let avg_loss_pct = avg_loss(&pls);
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(&pls),
            total_return: compounded_return(&pls),
            avg_win_pct,
            avg_loss_pct,
            win_loss_ratio: win_loss_ratio(avg_win_pct, avg_loss_pct),
            profit_factor: profit_factor(&pls),
            max_drawdown: max_drawdown(&trade_equity(&pls)),
            max_consecutive_losses: max_consecutive_losses(&pls),
            avg_bars_held: mean_f64(
                &trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>(),
            ),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades that were winners.
pub fn win_rate(pls: &[f64]) -> f64 {
    if pls.is_empty() {
        return 0.0;
    }
    pls.iter().filter(|&&p| p > 0.0).count() as f64 / pls.len() as f64
}

/// ∏(1 + pl/100) − 1.
pub fn compounded_return(pls: &[f64]) -> f64 {
    pls.iter().fold(1.0, |acc, p| acc * (1.0 + p / 100.0)) - 1.0
}

pub fn avg_win(pls: &[f64]) -> f64 {
    mean_f64(&pls.iter().copied().filter(|&p| p > 0.0).collect::<Vec<_>>())
}

pub fn avg_loss(pls: &[f64]) -> f64 {
    mean_f64(&pls.iter().copied().filter(|&p| p < 0.0).collect::<Vec<_>>())
}

pub fn win_loss_ratio(avg_win_pct: f64, avg_loss_pct: f64) -> f64 {
    if avg_loss_pct.abs() < 1e-12 {
        return 0.0;
    }
    avg_win_pct.abs() / avg_loss_pct.abs()
}

/// Gross winning % over gross losing %.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(pls: &[f64]) -> f64 {
    let gross_profit: f64 = pls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Compounded equity after each trade, starting at 1.0.
pub fn trade_equity(pls: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(pls.len() + 1);
    let mut equity = 1.0;
    curve.push(equity);
    for p in pls {
        equity *= 1.0 + p / 100.0;
        curve.push(equity);
    }
    curve
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Longest run of trades with P/L < 0.
pub fn max_consecutive_losses(pls: &[f64]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for &p in pls {
        if p < 0.0 {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sarscan_core::domain::ExitReason;

    fn make_trade(pl_pct: f64) -> TradeRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let exit_price = 100.0 + pl_pct;
        TradeRecord {
            symbol: "2330.TW".into(),
            entry_date: date,
            entry_price: 100.0,
            exit_date: date,
            exit_price,
            exit_stop: exit_price + 0.5,
            bars_held: 4,
            reason: ExitReason::for_stop_breach(100.0, exit_price),
        }
    }

    #[test]
    fn three_trade_scenario() {
        let trades: Vec<_> = [10.0, -5.0, 3.0].into_iter().map(make_trade).collect();
        let stats = TradeStats::compute(&trades);
        assert_eq!(stats.trade_count, 3);
        assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_win_pct - 6.5).abs() < 1e-9);
        assert!((stats.avg_loss_pct - -5.0).abs() < 1e-9);
        assert!((stats.win_loss_ratio - 1.3).abs() < 1e-9);
        assert!((stats.total_return - (1.10 * 0.95 * 1.03 - 1.0)).abs() < 1e-9);
        assert!((stats.max_drawdown - -0.05).abs() < 1e-9);
        assert_eq!(stats.max_consecutive_losses, 1);
        assert!((stats.profit_factor - 13.0 / 5.0).abs() < 1e-9);
        assert_eq!(stats.avg_bars_held, 4.0);
    }

    #[test]
    fn no_trades_is_all_zero() {
        let stats = TradeStats::compute(&[]);
        assert_eq!(stats.trade_count, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.total_return, 0.0);
        assert_eq!(stats.win_loss_ratio, 0.0);
        assert_eq!(stats.max_drawdown, 0.0);
    }

    #[test]
    fn no_losers_means_zero_ratio() {
        let pls = [4.0, 2.0];
        assert_eq!(win_loss_ratio(avg_win(&pls), avg_loss(&pls)), 0.0);
        assert_eq!(profit_factor(&pls), 100.0);
    }

    #[test]
    fn breakeven_is_neither_win_nor_loss() {
        let pls = [0.0, -1.0, 0.0, -2.0];
        assert_eq!(win_rate(&pls), 0.0);
        assert!((avg_loss(&pls) - -1.5).abs() < 1e-12);
        assert_eq!(max_consecutive_losses(&pls), 1);
    }

    #[test]
    fn losing_streak() {
        let pls = [1.0, -1.0, -2.0, -3.0, 5.0, -1.0];
        assert_eq!(max_consecutive_losses(&pls), 3);
    }

    #[test]
    fn drawdown_spans_several_trades() {
        // 1.0 → 1.2 → 1.08 → 0.972 → 1.0206
        let curve = trade_equity(&[20.0, -10.0, -10.0, 5.0]);
        assert_eq!(curve.len(), 5);
        assert!((max_drawdown(&curve) - (0.972 / 1.2 - 1.0)).abs() < 1e-12);
    }
}
