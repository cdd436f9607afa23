//! Parameters for the pose estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocParams {
    /// Length of pose history kept for fusing delayed measurements.
    ///
    /// Units: seconds
    pub history_s: f64,

    /// Standard deviations of the odometry estimate in x, y and heading.
    pub state_std_devs: [f64; 3],

    /// Default standard deviations of a vision measurement.
    pub vision_std_devs: [f64; 3],

    /// Heading set by `zero_heading`, for a robot which starts facing away
    /// from the field +x axis.
    ///
    /// Units: radians
    pub starting_heading_offset_rad: f64,
}

impl Default for LocParams {
    fn default() -> Self {
        Self {
            history_s: 1.5,
            state_std_devs: [0.1, 0.1, 0.1],
            vision_std_devs: [0.9, 0.9, 0.9],
            starting_heading_offset_rad: 0.0,
        }
    }
}
