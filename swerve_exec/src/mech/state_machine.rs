//! Generic table driven state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use std::fmt::Debug;

use super::MechError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A mechanism state.
pub trait MechState: Copy + Eq + Debug + 'static {
    /// Name of the mechanism, used in logs and errors.
    const MACHINE: &'static str;

    /// Allowed `(from, to)` transitions.
    fn transitions() -> &'static [(Self, Self)];
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A state machine over the states `S`.
#[derive(Debug, Clone)]
pub struct StateMachine<S: MechState> {
    current: S,

    /// Number of transitions made since creation
    num_transitions: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: MechState> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            num_transitions: 0,
        }
    }

    pub fn current_state(&self) -> S {
        self.current
    }

    pub fn num_transitions(&self) -> u64 {
        self.num_transitions
    }

    /// True if `to` can be reached from the current state in one step.
    pub fn can_transition(&self, to: S) -> bool {
        to == self.current || S::transitions().contains(&(self.current, to))
    }

    /// Move to `to` if the transition table allows it.
    ///
    /// Requesting the current state is accepted and does nothing.
    pub fn request_transition(&mut self, to: S) -> Result<(), MechError> {
        if to == self.current {
            debug!("{} already in {:?}", S::MACHINE, to);
            return Ok(());
        }

        if !self.can_transition(to) {
            return Err(MechError::InvalidTransition {
                machine: S::MACHINE,
                from: format!("{:?}", self.current),
                to: format!("{:?}", to),
            });
        }

        info!("{}: {:?} -> {:?}", S::MACHINE, self.current, to);
        self.current = to;
        self.num_transitions += 1;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Open,
        Closed,
        Locked,
    }

    impl MechState for Door {
        const MACHINE: &'static str = "Door";

        fn transitions() -> &'static [(Self, Self)] {
            &[
                (Door::Open, Door::Closed),
                (Door::Closed, Door::Open),
                (Door::Closed, Door::Locked),
                (Door::Locked, Door::Closed),
            ]
        }
    }

    #[test]
    fn test_transition_table() {
        let mut sm = StateMachine::new(Door::Open);

        assert!(sm.request_transition(Door::Locked).is_err());
        assert_eq!(sm.current_state(), Door::Open);

        sm.request_transition(Door::Closed).unwrap();
        sm.request_transition(Door::Locked).unwrap();
        assert_eq!(sm.current_state(), Door::Locked);
        assert_eq!(sm.num_transitions(), 2);

        // Same state is a no-op
        sm.request_transition(Door::Locked).unwrap();
        assert_eq!(sm.num_transitions(), 2);
    }
}
