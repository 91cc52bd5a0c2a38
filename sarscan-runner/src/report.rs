//! Plain-text report blocks for the console and the push message.
//!
//! Every function here is infallible: formatting never aborts a run.

use chrono::NaiveDate;

use sarscan_core::data::DataSource;
use sarscan_core::domain::{Signal, TradeRecord};
use sarscan_core::risk::StopQuote;

use crate::runner::{BacktestOutcome, ScanOutcome, Skipped, TickerBacktest};

/// Shown when a scan finds nothing.
pub const NO_SIGNAL: &str = "No entry signals today.";

const RULE: &str = "----------";

fn synthetic_tag(source: DataSource) -> &'static str {
    if source == DataSource::Synthetic {
        " [synthetic]"
    } else {
        ""
    }
}

/// One live entry signal.
pub fn signal_block(signal: &Signal) -> String {
    let mut out = String::with_capacity(128);
    out.push_str(&format!("📈 {} ({})\n", signal.symbol, signal.date));
    out.push_str(&format!("Price: {:.2}\n", signal.price));
    out.push_str(&format!("Stop: {:.2}\n", signal.stop));
    out.push_str(&format!("Risk: {:.2}%\n", signal.risk_pct()));
    out
}

fn trade_line(trade: &TradeRecord) -> String {
    format!(
        "{} → {}  {:.2} → {:.2}  {:+.2}% ({})\n",
        trade.entry_date,
        trade.exit_date,
        trade.entry_price,
        trade.exit_price,
        trade.pl_pct(),
        trade.reason
    )
}

/// Statistics and the `recent` most recent trades of one ticker.
pub fn backtest_block(result: &TickerBacktest, recent: usize) -> String {
    let s = &result.stats;
    let mut out = String::with_capacity(512);

    out.push_str(&format!(
        "📊 {}{} ({} to {})\n",
        result.symbol,
        synthetic_tag(result.source),
        result.first_date,
        result.last_date
    ));
    if s.trade_count == 0 {
        out.push_str("No trades.\n");
    } else {
        out.push_str(&format!("Trades: {}\n", s.trade_count));
        out.push_str(&format!("Win rate: {:.1}%\n", s.win_rate * 100.0));
        out.push_str(&format!("Return: {:+.2}%\n", s.total_return * 100.0));
        out.push_str(&format!(
            "Avg win / loss: {:+.2}% / {:+.2}%\n",
            s.avg_win_pct, s.avg_loss_pct
        ));
        out.push_str(&format!("Win/loss ratio: {:.2}\n", s.win_loss_ratio));
        out.push_str(&format!(
            "Max drawdown: {:.2}%  Losing streak: {}\n",
            s.max_drawdown * 100.0,
            s.max_consecutive_losses
        ));

        let skip = result.trades.len().saturating_sub(recent);
        if recent > 0 {
            out.push_str("Recent:\n");
            for trade in &result.trades[skip..] {
                out.push_str(&trade_line(trade));
            }
        }
    }

    if let Some(open) = &result.open_at_end {
        out.push_str(&format!(
            "Open since {} at {:.2}, stop {:.2}\n",
            open.entry_date, open.entry_price, open.stop
        ));
    }
    out
}

/// Stop calculator output.
pub fn stop_quote_block(quote: &StopQuote) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(&format!("🛑 {} stop ({})\n", quote.ticker, quote.latest_date));
    out.push_str(&format!("Entry: {:.2}\n", quote.entry_price));
    out.push_str(&format!(
        "Close: {:.2} ({:+.2}%)\n",
        quote.latest_close,
        quote.open_pl_pct()
    ));
    out.push_str(&format!("Hard floor: {:.2}\n", quote.floor));
    out.push_str(&format!("Chandelier: {:.2}\n", quote.dynamic));
    out.push_str(&format!("Stop: {:.2}\n", quote.effective));
    if quote.breached {
        out.push_str("⚠️ Close is already below the stop. Exit.\n");
    } else {
        out.push_str(&format!("Distance: {:.2}%\n", quote.distance_pct));
    }
    out
}

fn skipped_section(skipped: &[Skipped]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let mut out = String::from("Skipped:\n");
    for s in skipped {
        out.push_str(&format!("- {}: {}\n", s.symbol, s.reason));
    }
    out
}

fn join_blocks(header: String, blocks: Vec<String>, skipped: &[Skipped]) -> String {
    let mut out = header;
    for block in blocks {
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&block);
    }
    let skipped = skipped_section(skipped);
    if !skipped.is_empty() {
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&skipped);
    }
    out
}

/// Full scan report: header, one block per signal, then skipped tickers.
pub fn scan_report(date: NaiveDate, outcome: &ScanOutcome) -> String {
    let header = format!("SAR scan {date}\n");
    let mut blocks: Vec<String> = outcome
        .results
        .iter()
        .filter_map(|r| {
            r.signal.as_ref().map(|sig| {
                let mut block = signal_block(sig);
                if r.source == DataSource::Synthetic {
                    block.push_str("[synthetic data]\n");
                }
                block
            })
        })
        .collect();
    if blocks.is_empty() {
        blocks.push(format!("{NO_SIGNAL}\n"));
    }
    join_blocks(header, blocks, &outcome.skipped)
}

/// Full backtest report: header, one block per ticker, then skipped tickers.
pub fn backtest_report(date: NaiveDate, outcome: &BacktestOutcome, recent: usize) -> String {
    let header = format!("SAR backtest {date}\n");
    let mut blocks: Vec<String> = outcome
        .results
        .iter()
        .map(|r| backtest_block(r, recent))
        .collect();
    if blocks.is_empty() {
        blocks.push("No tickers could be tested.\n".to_string());
    }
    join_blocks(header, blocks, &outcome.skipped)
}
