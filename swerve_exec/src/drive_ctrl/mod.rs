//! # Drivetrain coordinator
//!
//! Runs the drivetrain once per control cycle: reads sensors into the
//! modules, updates the pose estimate, turns the active command into chassis
//! speeds, shapes them with the acceleration limiter, solves the kinematics
//! and runs each module's control loop. Brownout and aggregate current
//! interlocks are applied to the final demands.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod accel_limit;
mod auto;
mod cmd;
mod io;
mod params;
mod safety;
mod state;
mod telemetry;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use accel_limit::*;
pub use auto::*;
pub use cmd::*;
pub use io::*;
pub use params::*;
pub use safety::*;
pub use state::*;
pub use telemetry::*;

use std::f64::consts::FRAC_PI_4;

use crate::{
    kinematics::{KinematicsError, ModuleId, NUM_MODULES},
    swerve_module::SwerveModuleError,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Wheel angles when parked, forming an X so the robot resists being pushed.
pub const PARK_ANGLES_RAD: [f64; NUM_MODULES] = [FRAC_PI_4, -FRAC_PI_4, -FRAC_PI_4, FRAC_PI_4];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drivetrain geometry: {0}")]
    Kinematics(#[from] KinematicsError),

    #[error("Module command rejected: {0}")]
    Module(#[from] SwerveModuleError),

    #[error("Cannot calibrate module {requested} while module {active} is calibrating")]
    CalibrationBusy {
        requested: ModuleId,
        active: ModuleId,
    },

    #[error("The drivetrain is in safe mode, cannot execute {0}")]
    SafeModeActive(&'static str),
}
