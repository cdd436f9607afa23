//! # Mechanism state machines
//!
//! Mechanisms outside the drivetrain are driven as simple state machines.
//! Each mechanism's states form an enum with a fixed table of allowed
//! transitions, checked by [`StateMachine::request_transition`].
//!
//! Mechanisms which want to show something to the operator publish an
//! intent to an [`IntentArbiter`] each cycle, and the highest priority
//! intent wins.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod intake;
mod intent;
mod state_machine;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use intake::*;
pub use intent::*;
pub use state_machine::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MechError {
    #[error("{machine} cannot transition from {from} to {to}")]
    InvalidTransition {
        machine: &'static str,
        from: String,
        to: String,
    },
}
