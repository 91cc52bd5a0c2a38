//! Domain types for sarscan

pub mod bar;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use position::{OpenPosition, OpenPositionSnapshot, Position};
pub use signal::Signal;
pub use trade::{ExitReason, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
