//! Per-cycle intent arbitration

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Collects intents published during a cycle and resolves the highest
/// priority one.
///
/// Priority is the intent's `Ord`, so later enum variants win.
#[derive(Debug, Clone)]
pub struct IntentArbiter<T> {
    pending: Vec<T>,
    last: Option<T>,
}

/// Operator facing status intents, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StatusIntent {
    Idle,
    Driving,
    Intaking,
    Calibrating,
    Brownout,
    Safe,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: Ord + Copy + std::fmt::Debug> IntentArbiter<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            last: None,
        }
    }

    pub fn publish(&mut self, intent: T) {
        self.pending.push(intent);
    }

    /// Pick the highest priority intent published since the last call and
    /// clear the pending set.
    pub fn resolve(&mut self) -> Option<T> {
        let winner = self.pending.iter().copied().max();
        self.pending.clear();

        if winner != self.last {
            trace!("Intent changed: {:?} -> {:?}", self.last, winner);
        }
        self.last = winner;

        winner
    }

    /// Result of the last `resolve`.
    pub fn last(&self) -> Option<T> {
        self.last
    }
}

impl<T: Ord + Copy + std::fmt::Debug> Default for IntentArbiter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_highest_priority_wins() {
        let mut arb = IntentArbiter::new();

        arb.publish(StatusIntent::Driving);
        arb.publish(StatusIntent::Brownout);
        arb.publish(StatusIntent::Intaking);
        assert_eq!(arb.resolve(), Some(StatusIntent::Brownout));

        // Cleared after resolving
        assert_eq!(arb.resolve(), None);
        assert_eq!(arb.last(), None);

        arb.publish(StatusIntent::Idle);
        assert_eq!(arb.resolve(), Some(StatusIntent::Idle));
    }
}
