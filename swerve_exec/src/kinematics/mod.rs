//! # Kinematics Engine
//!
//! Pure wheel geometry transforms for a four module swerve drive.
//!
//! Frame convention is +x forward, +y left, positive rotation
//! counter-clockwise. Module arrays are always ordered front-left,
//! front-right, back-left, back-right, see [`ModuleId`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod engine;
mod types;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use engine::*;
pub use types::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the drivetrain.
pub const NUM_MODULES: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur when building the kinematics.
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error(
        "The wheel geometry cannot be inverted, are all modules on the \
        rotation centre? (offsets: {0:?})"
    )]
    DegenerateGeometry([[f64; 2]; NUM_MODULES]),
}
