//! Property tests for evaluator invariants.
//!
//! Uses proptest to verify:
//! 1. Ratchet monotonicity — the stop of an open position never decreases
//! 2. Stop floor — the stop is never below entry × (1 − max_loss_fraction); the
//!    entry bar uses the initial ATR multiple, later bars the Chandelier level
//! 3. Stop composition — every stop exit happens at max(previous, dynamic, floor)
//! 4. No flip, no trade — a SAR that never crosses from above yields zero trades

use proptest::prelude::*;
use sarscan_core::domain::{Bar, ExitReason};
use sarscan_core::indicators::{compute_frame, IndicatorConfig, IndicatorFrame, IndicatorRow};
use sarscan_core::strategy::{Evaluator, StopRule, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn bars_from_returns(returns: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut price = 100.0_f64;
    returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let open = price;
            let close = price * (1.0 + r);
            price = close;
            Bar {
                symbol: "PROP".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * 1.005,
                low: open.min(close) * 0.995,
                close,
                volume: 10_000,
                adj_close: close,
            }
        })
        .collect()
}

fn plain_strategy(max_loss_fraction: f64) -> StrategyConfig {
    StrategyConfig {
        indicators: IndicatorConfig {
            ma_long: None,
            adx_period: None,
            min_bars: 30,
            ..Default::default()
        },
        filters: vec![],
        stop: StopRule::Chandelier { max_loss_fraction },
    }
}

fn row(day: i64, close: f64, sar: f64) -> IndicatorRow {
    let date = chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + chrono::Duration::days(day);
    IndicatorRow {
        bar: Bar {
            symbol: "PROP".into(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
            adj_close: close,
        },
        sar,
        ma_short: close * 0.9,
        ma_long: None,
        atr: 1.0,
        dynamic_stop: close * 0.95,
        adx: None,
        plus_di: None,
        minus_di: None,
        rsi: None,
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04..0.04_f64, 60..250)
}

fn arb_fraction() -> impl Strategy<Value = f64> {
    0.02..0.2_f64
}

// ── 1–3. Stop invariants ─────────────────────────────────────────────

proptest! {
    #[test]
    fn stop_never_decreases_while_long(returns in arb_returns(), f in arb_fraction()) {
        let config = plain_strategy(f);
        let bars = bars_from_returns(&returns);
        let frame = compute_frame(&bars, &config.indicators).unwrap();
        let evaluator = Evaluator::new(config).unwrap();

        let path = evaluator.stop_path(&frame);
        prop_assert_eq!(path.len(), frame.len());
        for pair in path.windows(2) {
            if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                if a.entry_index == b.entry_index {
                    prop_assert!(b.level >= a.level, "stop fell from {} to {}", a.level, b.level);
                }
            }
        }
    }

    #[test]
    fn stop_respects_floor_and_dynamic(returns in arb_returns(), f in arb_fraction()) {
        let config = plain_strategy(f);
        let bars = bars_from_returns(&returns);
        let frame = compute_frame(&bars, &config.indicators).unwrap();
        let evaluator = Evaluator::new(config.clone()).unwrap();

        let k = config.indicators.initial_atr_multiplier;
        let rows = frame.rows();
        for (i, point) in evaluator.stop_path(&frame).into_iter().enumerate() {
            let Some(point) = point else { continue };
            prop_assert!(point.level >= point.floor);
            if i == point.entry_index {
                let expected = (rows[i].close() - k * rows[i].atr).max(point.floor);
                prop_assert!((point.level - expected).abs() < 1e-9);
            } else {
                prop_assert!(point.level >= point.dynamic);
            }
        }
    }

    #[test]
    fn stop_exits_use_composed_stop(returns in arb_returns(), f in arb_fraction()) {
        let config = plain_strategy(f);
        let bars = bars_from_returns(&returns);
        let frame = compute_frame(&bars, &config.indicators).unwrap();
        let evaluator = Evaluator::new(config.clone()).unwrap();

        let run = evaluator.run(&frame);
        let rows = frame.rows();
        for trade in run.trades.iter().filter(|t| t.reason != ExitReason::EndOfPeriod) {
            let exit_index = rows.iter().position(|r| r.date() == trade.exit_date).unwrap();
            let previous = run.stops[exit_index - 1].map(|p| p.level).unwrap();
            let floor = config.stop.floor(trade.entry_price);
            let expected = previous.max(rows[exit_index].dynamic_stop).max(floor);
            prop_assert!((trade.exit_stop - expected).abs() < 1e-9);
            prop_assert!(trade.exit_price < trade.exit_stop);
            prop_assert!(trade.exit_stop >= floor);
        }
    }

    #[test]
    fn exit_reason_matches_pl(returns in arb_returns()) {
        let config = plain_strategy(0.08);
        let bars = bars_from_returns(&returns);
        let frame = compute_frame(&bars, &config.indicators).unwrap();
        let trades = Evaluator::new(config).unwrap().backtest(&frame);

        for t in &trades {
            match t.reason {
                ExitReason::StopLoss => prop_assert!(t.pl_pct() < 0.0),
                ExitReason::TrailingStop => prop_assert!(t.pl_pct() >= 0.0),
                ExitReason::EndOfPeriod => {}
            }
        }
        // at most the final trade is left open
        let eop = trades.iter().filter(|t| t.reason == ExitReason::EndOfPeriod).count();
        prop_assert!(eop <= 1);
        if eop == 1 {
            prop_assert_eq!(trades.last().unwrap().reason, ExitReason::EndOfPeriod);
        }
    }
}

// ── 4. No flip, no trade ─────────────────────────────────────────────

proptest! {
    #[test]
    fn sar_always_above_close_never_trades(
        closes in prop::collection::vec(10.0..200.0_f64, 2..120),
        gap in 0.01..20.0_f64,
    ) {
        let rows: Vec<IndicatorRow> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| row(i as i64, c, c + gap))
            .collect();
        let frame = IndicatorFrame::from_rows("PROP", rows);
        let evaluator = Evaluator::new(plain_strategy(0.08)).unwrap();
        prop_assert!(evaluator.backtest(&frame).is_empty());
        prop_assert!(evaluator.latest_signal(&frame).is_none());
    }

    #[test]
    fn sar_always_below_close_never_trades(
        closes in prop::collection::vec(10.0..200.0_f64, 2..120),
        gap in 0.01..5.0_f64,
    ) {
        let rows: Vec<IndicatorRow> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| row(i as i64, c, c - gap))
            .collect();
        let frame = IndicatorFrame::from_rows("PROP", rows);
        let evaluator = Evaluator::new(plain_strategy(0.08)).unwrap();
        prop_assert!(evaluator.backtest(&frame).is_empty());
    }
}
