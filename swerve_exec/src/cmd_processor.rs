//! # Command processor module
//!
//! Executes commands coming from the script.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};

use swerve_lib::{
    data_store::{DataStore, SafeModeCause},
    exec_cmd::ExecCmd,
    sim::SimDrive,
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a command.
///
/// Mutates the datastore to send commands to different modules. Rejected
/// commands are logged and otherwise ignored.
pub(crate) fn exec(ds: &mut DataStore, sim: &mut SimDrive, cmd: &ExecCmd) {
    debug!("Executing {:?}", cmd);

    match cmd {
        ExecCmd::MakeSafe => ds.make_safe(SafeModeCause::MakeSafeCmd),
        ExecCmd::MakeUnsafe => {
            ds.make_unsafe(SafeModeCause::MakeSafeCmd);
        }
        ExecCmd::Drive(d) => {
            if let Err(e) = ds.drive_ctrl.exec_cmd(d) {
                warn!("Could not execute {} command: {}", d.name(), e);
            }
        }
        ExecCmd::Intake(s) => {
            if ds.safe {
                warn!("Cannot change the intake state while safe");
            } else if let Err(e) = ds.intake.request_transition(*s) {
                warn!("{}", e);
            }
        }
        ExecCmd::SimFaults(f) => sim.set_faults(*f),
    }
}
