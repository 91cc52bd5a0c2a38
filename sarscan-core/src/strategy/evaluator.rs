//! Signal evaluator — the FLAT/LONG state machine.
//!
//! Rows are processed in date order. While long, the stop is ratcheted and checked
//! first; entry is checked afterwards, so a bar that stops a position out may also
//! open a new one.

use thiserror::Error;
use tracing::trace;

use super::config::{EntryFilter, StrategyConfig};
use crate::domain::{ExitReason, OpenPosition, OpenPositionSnapshot, Position, Signal, TradeRecord};
use crate::indicators::{IndicatorError, IndicatorFrame, IndicatorRow};

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error(transparent)]
    Indicators(#[from] IndicatorError),

    #[error("max_loss_fraction {0} is outside (0, 1)")]
    MaxLossOutOfRange(f64),

    #[error("filter '{filter}' needs the {series} series, which is disabled")]
    MissingSeries {
        filter: &'static str,
        series: &'static str,
    },
}

impl StrategyError {
    /// Config field the error points at.
    pub fn field(&self) -> &'static str {
        match self {
            StrategyError::Indicators(IndicatorError::InvalidConfig { field, .. }) => *field,
            StrategyError::Indicators(_) => "indicators",
            StrategyError::MaxLossOutOfRange(_) => "max_loss_fraction",
            StrategyError::MissingSeries { .. } => "filters",
        }
    }

    /// Message without the field name, for callers that report `field()` alongside.
    pub fn reason(&self) -> String {
        match self {
            StrategyError::Indicators(IndicatorError::InvalidConfig { reason, .. }) => reason.clone(),
            StrategyError::MaxLossOutOfRange(f) => format!("{f} is outside (0, 1)"),
            other => other.to_string(),
        }
    }
}

/// Stop in force on a row, for an open position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopPoint {
    /// Frame row where the owning position was opened.
    pub entry_index: usize,
    pub level: f64,
    pub floor: f64,
    pub dynamic: f64,
}

/// Full-history walk.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    /// Closed trades, including a final `EndOfPeriod` trade if still long.
    pub trades: Vec<TradeRecord>,
    /// Position still open on the last row, before the forced close.
    pub open_at_end: Option<OpenPositionSnapshot>,
    /// Per-row stop of the open position, `None` while flat.
    pub stops: Vec<Option<StopPoint>>,
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    config: StrategyConfig,
}

impl Evaluator {
    pub fn new(config: StrategyConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn filter_passes(filter: &EntryFilter, row: &IndicatorRow) -> bool {
        match *filter {
            EntryFilter::LongMa => row.ma_long.is_some_and(|ma| row.close() > ma),
            EntryFilter::TrendStrength { min_adx } => {
                match (row.adx, row.plus_di, row.minus_di) {
                    (Some(adx), Some(plus), Some(minus)) => adx > min_adx && plus > minus,
                    _ => false,
                }
            }
            EntryFilter::Momentum { min_rsi } => row.rsi.is_some_and(|rsi| rsi > min_rsi),
        }
    }

    /// SAR flips from above close to below close, close is above the short MA, and
    /// every active filter passes on the current row.
    pub fn entry_triggered(&self, prev: &IndicatorRow, cur: &IndicatorRow) -> bool {
        prev.sar_above_close()
            && cur.sar_below_close()
            && cur.close() > cur.ma_short
            && self
                .config
                .filters
                .iter()
                .all(|f| Self::filter_passes(f, cur))
    }

    /// Stop set on the entry bar: close less `initial_atr_multiplier` ATRs, never
    /// below the floor. The Chandelier level takes over from the next bar.
    pub fn initial_stop(&self, row: &IndicatorRow) -> f64 {
        let k = self.config.indicators.initial_atr_multiplier;
        self.config.stop.candidate(row.close(), row.close() - k * row.atr)
    }

    /// Advance `position` by one row. Returns the trade closed on this row, if any.
    pub fn step(
        &self,
        symbol: &str,
        position: &mut Position,
        index: usize,
        prev: Option<&IndicatorRow>,
        cur: &IndicatorRow,
    ) -> Option<TradeRecord> {
        let mut closed = None;

        if let Position::Long(open) = position {
            let candidate = self.config.stop.candidate(open.entry_price, cur.dynamic_stop);
            let stop = open.stop.apply(candidate);
            if cur.close() < stop {
                let trade = TradeRecord {
                    symbol: symbol.to_string(),
                    entry_date: open.entry_date,
                    entry_price: open.entry_price,
                    exit_date: cur.date(),
                    exit_price: cur.close(),
                    exit_stop: stop,
                    bars_held: index - open.entry_index,
                    reason: ExitReason::for_stop_breach(open.entry_price, cur.close()),
                };
                trace!(symbol, date = %cur.date(), stop, close = cur.close(), "stop breached");
                *position = Position::Flat;
                closed = Some(trade);
            }
        }

        if position.is_flat() {
            if let Some(prev) = prev {
                if self.entry_triggered(prev, cur) {
                    let stop = self.initial_stop(cur);
                    trace!(symbol, date = %cur.date(), price = cur.close(), stop, "entry");
                    *position = Position::Long(OpenPosition::new(cur.close(), cur.date(), index, stop));
                }
            }
        }

        closed
    }

    /// Walk the whole frame.
    pub fn run(&self, frame: &IndicatorFrame) -> BacktestRun {
        let rows = frame.rows();
        let mut position = Position::Flat;
        let mut trades = Vec::new();
        let mut stops = Vec::with_capacity(rows.len());

        for (i, cur) in rows.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| &rows[p]);
            if let Some(trade) = self.step(&frame.symbol, &mut position, i, prev, cur) {
                trades.push(trade);
            }
            stops.push(position.open().map(|open| StopPoint {
                entry_index: open.entry_index,
                level: open.stop_price(),
                floor: self.config.stop.floor(open.entry_price),
                dynamic: cur.dynamic_stop,
            }));
        }

        let open_at_end = position.open().map(OpenPositionSnapshot::from);
        if let (Position::Long(open), Some(last)) = (&position, rows.last()) {
            trades.push(TradeRecord {
                symbol: frame.symbol.clone(),
                entry_date: open.entry_date,
                entry_price: open.entry_price,
                exit_date: last.date(),
                exit_price: last.close(),
                exit_stop: open.stop_price(),
                bars_held: rows.len() - 1 - open.entry_index,
                reason: ExitReason::EndOfPeriod,
            });
        }

        BacktestRun {
            trades,
            open_at_end,
            stops,
        }
    }

    /// Closed trades over the full history.
    pub fn backtest(&self, frame: &IndicatorFrame) -> Vec<TradeRecord> {
        self.run(frame).trades
    }

    /// Per-row stop of the open position.
    pub fn stop_path(&self, frame: &IndicatorFrame) -> Vec<Option<StopPoint>> {
        self.run(frame).stops
    }

    /// Entry signal on the most recent bar only.
    pub fn latest_signal(&self, frame: &IndicatorFrame) -> Option<Signal> {
        let (prev, cur) = frame.last_pair()?;
        if !self.entry_triggered(prev, cur) {
            return None;
        }
        Some(Signal {
            symbol: frame.symbol.clone(),
            date: cur.date(),
            price: cur.close(),
            stop: self.initial_stop(cur),
        })
    }
}
