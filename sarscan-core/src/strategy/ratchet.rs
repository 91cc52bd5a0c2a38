//! Ratchet stop for long positions.
//!
//! The stop may rise, never fall, even when ATR expands.

/// Stop level that only moves up.
#[derive(Debug, Clone, PartialEq)]
pub struct RatchetStop {
    level: f64,
}

impl RatchetStop {
    pub fn new(initial: f64) -> Self {
        Self { level: initial }
    }

    /// Offer a new level; returns the level in force afterwards.
    ///
    /// ```
    /// use sarscan_core::strategy::RatchetStop;
    ///
    /// let mut stop = RatchetStop::new(95.0);
    /// assert_eq!(stop.apply(100.0), 100.0);
    /// assert_eq!(stop.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if proposed > self.level {
            self.level = proposed;
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tightening_allowed() {
        let mut stop = RatchetStop::new(95.0);
        assert_eq!(stop.apply(100.0), 100.0);
        assert_eq!(stop.level(), 100.0);
    }

    #[test]
    fn loosening_blocked() {
        let mut stop = RatchetStop::new(100.0);
        assert_eq!(stop.apply(90.0), 100.0);
        assert_eq!(stop.level(), 100.0);
    }

    #[test]
    fn nan_proposal_is_ignored() {
        let mut stop = RatchetStop::new(100.0);
        assert_eq!(stop.apply(f64::NAN), 100.0);
    }

    #[test]
    fn volatility_expansion_does_not_loosen() {
        // price at 110, ATR expands 5 → 10: proposed 110 - 2*10 = 90
        let mut stop = RatchetStop::new(95.0);
        assert_eq!(stop.apply(90.0), 95.0);
    }
}
