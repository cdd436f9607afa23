//! Intake mechanism states

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{MechState, StateMachine};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Intake roller state. Reversing the rollers must pass through `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeState {
    Off,
    In,
    Out,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MechState for IntakeState {
    const MACHINE: &'static str = "Intake";

    fn transitions() -> &'static [(Self, Self)] {
        &[
            (IntakeState::Off, IntakeState::In),
            (IntakeState::Off, IntakeState::Out),
            (IntakeState::In, IntakeState::Off),
            (IntakeState::Out, IntakeState::Off),
        ]
    }
}

impl IntakeState {
    /// Roller power fraction for this state.
    pub fn power(&self) -> f64 {
        match self {
            IntakeState::Off => 0.0,
            IntakeState::In => 1.0,
            IntakeState::Out => -1.0,
        }
    }
}

/// The intake's state machine, starting `Off`.
pub fn intake() -> StateMachine<IntakeState> {
    StateMachine::new(IntakeState::Off)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mech::MechError;

    #[test]
    fn test_intake_passes_through_off() {
        let mut sm = intake();

        sm.request_transition(IntakeState::In).unwrap();

        match sm.request_transition(IntakeState::Out) {
            Err(MechError::InvalidTransition { from, to, .. }) => {
                assert_eq!(from, "In");
                assert_eq!(to, "Out");
            }
            r => panic!("Expected InvalidTransition, got {:?}", r),
        }
        assert_eq!(sm.current_state(), IntakeState::In);

        sm.request_transition(IntakeState::Off).unwrap();
        sm.request_transition(IntakeState::Out).unwrap();
        assert_eq!(sm.current_state().power(), -1.0);
    }
}
