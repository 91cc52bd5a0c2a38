//! Position — per-ticker state of the signal evaluator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::strategy::ratchet::RatchetStop;

/// Flat or long. There is never more than one open position per ticker.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            Position::Flat => None,
            Position::Long(open) => Some(open),
        }
    }
}

/// An open long position.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    /// Row index in the indicator frame where the position was opened.
    pub entry_index: usize,
    pub stop: RatchetStop,
}

impl OpenPosition {
    pub fn new(entry_price: f64, entry_date: NaiveDate, entry_index: usize, stop: f64) -> Self {
        Self {
            entry_price,
            entry_date,
            entry_index,
            stop: RatchetStop::new(stop),
        }
    }

    /// Current stop level.
    pub fn stop_price(&self) -> f64 {
        self.stop.level()
    }
}

/// Serializable snapshot of an open position, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPositionSnapshot {
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub stop: f64,
}

impl From<&OpenPosition> for OpenPositionSnapshot {
    fn from(open: &OpenPosition) -> Self {
        Self {
            entry_price: open.entry_price,
            entry_date: open.entry_date,
            stop: open.stop_price(),
        }
    }
}
