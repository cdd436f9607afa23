//! Cyclic module interface
//!
//! Every control module in `swerve_exec` which runs once per control cycle
//! implements [`State`]. Initialisation is split from construction so that a
//! module can be built from parameters in tests without a running session.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Data required during initialisation, usually a parameter file path.
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;

    /// Data required for one control cycle.
    type InputData;
    /// Data produced by one control cycle.
    type OutputData;
    /// A report on the health of the cycle, logged and archived by the
    /// executable.
    type StatusReport;
    /// An error which can occur during a cycle.
    type ProcError;

    /// Initialise the module.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one control cycle.
    ///
    /// On error the module must not have produced any actuation for this
    /// cycle, the caller decides whether to command a safe output.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
