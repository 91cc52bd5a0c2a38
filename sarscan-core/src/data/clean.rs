//! Canonicalize raw provider bars: sort, dedupe, validate.

use tracing::debug;

use super::provider::RawBar;
use crate::domain::Bar;

/// Sort by date, keep the first bar of each date, drop void or insane bars.
pub fn clean_bars(symbol: &str, raw: Vec<RawBar>) -> Vec<Bar> {
    let total = raw.len();
    let mut raw = raw;
    // stable: the provider's first bar for a date wins
    raw.sort_by_key(|b| b.date);
    raw.dedup_by_key(|b| b.date);
    let unique = raw.len();

    let bars: Vec<Bar> = raw
        .into_iter()
        .map(|r| Bar {
            symbol: symbol.to_string(),
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            adj_close: r.adj_close,
        })
        .filter(Bar::is_sane)
        .collect();

    if bars.len() < total {
        debug!(
            symbol,
            duplicates = total - unique,
            rejected = unique - bars.len(),
            kept = bars.len(),
            "cleaned bars"
        );
    }
    bars
}
