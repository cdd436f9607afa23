//! # Swerve library.
//!
//! This library allows other crates in the workspace, the benches and the
//! integration tests to access items defined inside the swerve crate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Kinematics - wheel geometry transforms between chassis speeds and module states
pub mod kinematics;

/// Swerve module - per wheel closed loop steer and drive control
pub mod swerve_module;

/// Localisation - fuses wheel odometry, heading and vision into a field pose
pub mod loc;

/// Teleop - shapes joystick input into chassis speeds
pub mod teleop;

/// Drivetrain control - runs the whole drivetrain once per cycle
pub mod drive_ctrl;

/// Mechanisms - state machines for the mechanisms outside the drivetrain
pub mod mech;

/// Simulation - plant model standing in for the hardware
pub mod sim;

/// Executive commands read from scripts
pub mod exec_cmd;

/// Data store for the executable
pub mod data_store;

/// Executable parameters
pub mod params;
