//! # Swerve module controller
//!
//! Closed loop control of a single swerve module: a drive motor running a
//! velocity loop and a steer motor running a continuous position loop.
//!
//! The steer angle comes from a fast incremental encoder which is seeded from
//! a slow absolute encoder. Control is delegated to a [`ControlMode`], either
//! the normal controller or a calibration routine.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calib;
mod control;
mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use calib::*;
pub use control::*;
pub use controllers::*;
pub use params::*;
pub use state::*;

use crate::kinematics::ModuleId;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur when commanding a module.
#[derive(Debug, thiserror::Error)]
pub enum SwerveModuleError {
    #[error("Module {0} is already calibrating")]
    AlreadyCalibrating(ModuleId),

    #[error("Module {0} is idle and cannot start a calibration")]
    ModuleIdle(ModuleId),
}
