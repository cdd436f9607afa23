//! Electrical safety interlocks

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use crate::swerve_module::ModuleDemand;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Watches the bus voltage for a brownout.
#[derive(Debug, Clone)]
pub struct BrownoutMonitor {
    min_voltage_v: f64,
    latch: bool,
    latched: bool,
    in_brownout: bool,
    last_voltage_v: Option<f64>,
}

/// Result of a brownout check.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BrownoutStatus {
    /// Outputs must be zeroed this cycle
    pub brownout: bool,

    /// The brownout is being held by the latch
    pub latched: bool,

    /// The voltage reading was missing this cycle
    pub voltage_fault: bool,

    /// Units: volts
    pub voltage_v: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BrownoutMonitor {
    pub fn new(min_voltage_v: f64, latch: bool) -> Self {
        Self {
            min_voltage_v,
            latch,
            latched: false,
            in_brownout: false,
            last_voltage_v: None,
        }
    }

    /// Check this cycle's bus voltage reading.
    ///
    /// A missing reading uses the last known good voltage.
    pub fn update(&mut self, voltage_v: Option<f64>) -> BrownoutStatus {
        let voltage_fault = voltage_v.is_none();
        if voltage_v.is_some() {
            self.last_voltage_v = voltage_v;
        }

        let low = match self.last_voltage_v {
            Some(v) => v < self.min_voltage_v,
            None => false,
        };

        if low && self.latch && !self.latched {
            warn!("Brownout latched, make unsafe to clear");
            self.latched = true;
        }

        let brownout = low || self.latched;
        if brownout != self.in_brownout {
            if brownout {
                warn!("Brownout: bus voltage {:?} V, zeroing outputs", self.last_voltage_v);
            } else {
                info!("Brownout cleared");
            }
            self.in_brownout = brownout;
        }

        BrownoutStatus {
            brownout,
            latched: self.latched,
            voltage_fault,
            voltage_v: self.last_voltage_v,
        }
    }

    /// Clear a latched brownout.
    pub fn clear_latch(&mut self) {
        self.latched = false;
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale factor to bring `total_a` down to `limit_a`, or `None` if it's
/// within the limit.
pub fn aggregate_backoff(total_a: f64, limit_a: f64) -> Option<f64> {
    if total_a > limit_a && total_a > 0.0 {
        Some(limit_a / total_a)
    } else {
        None
    }
}

/// Apply a backoff factor to every demand.
pub fn apply_backoff(demands: &mut [ModuleDemand], factor: f64) {
    for d in demands.iter_mut() {
        d.scale_volts(factor);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_brownout_auto_recovers() {
        let mut mon = BrownoutMonitor::new(7.0, false);

        assert!(!mon.update(Some(12.0)).brownout);
        assert!(mon.update(Some(6.5)).brownout);

        // Missing reading holds the low value
        let s = mon.update(None);
        assert!(s.brownout);
        assert!(s.voltage_fault);

        assert!(!mon.update(Some(11.0)).brownout);
    }

    #[test]
    fn test_brownout_latch() {
        let mut mon = BrownoutMonitor::new(7.0, true);

        assert!(mon.update(Some(6.0)).brownout);
        let s = mon.update(Some(12.0));
        assert!(s.brownout);
        assert!(s.latched);

        mon.clear_latch();
        assert!(!mon.update(Some(12.0)).brownout);
    }

    #[test]
    fn test_aggregate_backoff() {
        assert_eq!(aggregate_backoff(250.0, 300.0), None);
        assert_abs_diff_eq!(aggregate_backoff(400.0, 300.0).unwrap(), 0.75);

        let mut d = [ModuleDemand {
            drive_velocity_ms: 1.0,
            steer_angle_rad: 0.2,
            drive_volts: 8.0,
            steer_volts: -4.0,
        }; 2];
        apply_backoff(&mut d, 0.75);
        assert_abs_diff_eq!(d[1].drive_volts, 6.0);
        assert_abs_diff_eq!(d[1].steer_volts, -3.0);
        assert_eq!(d[0].drive_velocity_ms, 1.0);
    }
}
