//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the software checkout.
///
/// Parameter files are found in `$SWERVE_SW_ROOT/params` and sessions are
/// created in `$SWERVE_SW_ROOT/sessions`.
pub const SW_ROOT_ENV_VAR: &str = "SWERVE_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Name of the host operating system and architecture, for the session
/// banner.
pub fn get_platform() -> String {
    format!("{} ({})", env::consts::OS, env::consts::ARCH)
}
