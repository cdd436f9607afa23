//! Pose estimator state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use util::maths::ang_dist;

use super::{LocParams, Pose, VisionMeasurement, VisionSender};
use crate::kinematics::{ModulePosition, SwerveKinematics, NUM_MODULES};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fuses wheel odometry, the heading sensor and vision into a continuous
/// field pose.
pub struct PoseEstimator {
    params: LocParams,
    kinematics: SwerveKinematics,

    /// Current estimate, heading unwrapped
    pose: Pose,

    /// Estimates over the last `history_s`, oldest first
    history: VecDeque<(f64, Pose)>,

    prev_positions: Option<[ModulePosition; NUM_MODULES]>,

    /// Added to the gyro reading to get the field heading
    heading_offset_rad: f64,

    last_gyro_rad: Option<f64>,
    gyro_faulted: bool,

    vision_tx: Sender<VisionMeasurement>,
    vision_rx: Receiver<VisionMeasurement>,

    report: LocReport,
}

/// A correction applied from a vision measurement.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Correction {
    pub capture_time_s: f64,

    /// Measurement minus the estimate at the capture time
    pub error: [f64; 3],

    /// Shift applied to the current estimate
    pub applied: [f64; 3],
}

/// Status of the estimator after an update.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LocReport {
    /// True if the heading sensor reading was missing this cycle
    pub gyro_fault: bool,

    /// Number of vision measurements fused this cycle
    pub vision_applied: usize,

    /// Total number of vision measurements dropped for being older than the
    /// history window
    pub vision_dropped_total: u64,

    pub last_correction: Option<Correction>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEstimator {
    /// Create a new estimator at the origin.
    pub fn new(params: LocParams, kinematics: SwerveKinematics) -> Self {
        let (vision_tx, vision_rx) = channel();

        Self {
            params,
            kinematics,
            pose: Pose::default(),
            history: VecDeque::new(),
            prev_positions: None,
            heading_offset_rad: 0.0,
            last_gyro_rad: None,
            gyro_faulted: false,
            vision_tx,
            vision_rx,
            report: LocReport::default(),
        }
    }

    /// Get a handle for submitting vision measurements from another thread.
    pub fn vision_sender(&self) -> VisionSender {
        VisionSender::new(self.vision_tx.clone())
    }

    /// Submit a vision measurement from the control thread.
    pub fn add_vision_measurement(&self, pose: Pose, capture_time_s: f64, trust: Option<[f64; 3]>) {
        self.vision_sender()
            .add_vision_measurement(pose, capture_time_s, trust)
    }

    /// Advance the estimate by one cycle.
    ///
    /// `gyro_rad` is the heading sensor's reading, `None` if it could not be
    /// read. Any vision measurements received since the last update are
    /// fused afterwards.
    pub fn update(
        &mut self,
        time_s: f64,
        gyro_rad: Option<f64>,
        positions: &[ModulePosition; NUM_MODULES],
    ) -> Pose {
        self.report.gyro_fault = false;
        self.report.vision_applied = 0;

        // Heading from the gyro, or held on a fault
        let heading_rad = match gyro_rad {
            Some(g) => {
                if self.gyro_faulted {
                    // Re-anchor so the heading carries on from the held value
                    info!("Heading sensor recovered");
                    self.heading_offset_rad = self.pose.heading_rad - g;
                    self.gyro_faulted = false;
                }
                self.last_gyro_rad = Some(g);
                g + self.heading_offset_rad
            }
            None => {
                if !self.gyro_faulted {
                    warn!("Heading sensor fault, holding heading");
                    self.gyro_faulted = true;
                }
                self.report.gyro_fault = true;
                self.pose.heading_rad
            }
        };

        // Wheel odometry
        let mut twist = match self.prev_positions {
            Some(prev) => {
                let mut deltas = [ModulePosition::default(); NUM_MODULES];
                for ((d, p), c) in deltas.iter_mut().zip(prev.iter()).zip(positions.iter()) {
                    d.distance_m = c.distance_m - p.distance_m;
                    d.angle_rad = c.angle_rad;
                }
                self.kinematics.to_twist(&deltas)
            }
            None => Default::default(),
        };
        self.prev_positions = Some(*positions);

        // Rotation always comes from the heading
        twist.dtheta_rad = heading_rad - self.pose.heading_rad;
        self.pose = self.pose.exp(&twist);

        self.history.push_back((time_s, self.pose));
        while let Some((t, _)) = self.history.front() {
            if *t < time_s - self.params.history_s {
                self.history.pop_front();
            } else {
                break;
            }
        }

        while let Ok(m) = self.vision_rx.try_recv() {
            self.fuse_vision(&m, time_s);
        }

        self.pose
    }

    /// Fuse a vision measurement against the history at its capture time.
    fn fuse_vision(&mut self, m: &VisionMeasurement, now_s: f64) {
        if m.capture_time_s < now_s - self.params.history_s {
            self.report.vision_dropped_total += 1;
            warn!(
                "Vision measurement captured at {:.3} s is older than the {:.2} s history, dropped",
                m.capture_time_s, self.params.history_s
            );
            return;
        }

        let estimate = match self.estimate_at(m.capture_time_s) {
            Some(e) => e,
            None => {
                self.report.vision_dropped_total += 1;
                warn!("No pose history to fuse a vision measurement against, dropped");
                return;
            }
        };

        let error = [
            m.pose.position_m_fm[0] - estimate.position_m_fm[0],
            m.pose.position_m_fm[1] - estimate.position_m_fm[1],
            ang_dist(estimate.heading_rad, m.pose.heading_rad),
        ];

        let r = m.std_devs.unwrap_or(self.params.vision_std_devs);
        let mut applied = [0f64; 3];
        for i in 0..3 {
            let q2 = self.params.state_std_devs[i].powi(2);
            let r2 = r[i].powi(2);
            let gain = if q2 + r2 > 0.0 { q2 / (q2 + r2) } else { 0.0 };
            applied[i] = gain * error[i];
        }

        // Shift the current estimate and the history so later measurements
        // see the corrected trajectory
        let shift = Vector2::new(applied[0], applied[1]);
        self.pose.position_m_fm += shift;
        self.pose.heading_rad += applied[2];
        for (_, p) in self.history.iter_mut() {
            p.position_m_fm += shift;
            p.heading_rad += applied[2];
        }
        self.heading_offset_rad += applied[2];

        debug!(
            "Vision correction from {:.3} s: error {:?}, applied {:?}",
            m.capture_time_s, error, applied
        );

        self.report.vision_applied += 1;
        self.report.last_correction = Some(Correction {
            capture_time_s: m.capture_time_s,
            error,
            applied,
        });
    }

    /// Interpolate the estimate at the given time from the history.
    ///
    /// Times outside the buffered range use the nearest entry.
    fn estimate_at(&self, time_s: f64) -> Option<Pose> {
        let (first_t, first) = *self.history.front()?;
        if time_s <= first_t {
            return Some(first);
        }

        let mut prev = (first_t, first);
        for &(t, p) in self.history.iter().skip(1) {
            if time_s <= t {
                let span = t - prev.0;
                let frac = if span > 0.0 { (time_s - prev.0) / span } else { 1.0 };
                return Some(prev.1.interpolate(&p, frac));
            }
            prev = (t, p);
        }

        Some(prev.1)
    }

    /// Overwrite the pose and clear the history.
    pub fn reset_pose(&mut self, pose: Pose) {
        info!("Pose reset to {:?}", pose);
        self.heading_offset_rad = match self.last_gyro_rad {
            Some(g) => pose.heading_rad - g,
            None => pose.heading_rad,
        };
        self.pose = pose;
        self.history.clear();
    }

    /// Set the heading to the starting offset, keeping the position.
    pub fn zero_heading(&mut self) {
        let mut pose = self.pose;
        pose.heading_rad = self.params.starting_heading_offset_rad;
        self.reset_pose(pose);
    }

    /// The current estimate with the heading wrapped into (-pi, pi].
    pub fn get_pose(&self) -> Pose {
        self.pose.wrapped()
    }

    /// The current estimate with a continuous heading.
    pub fn get_continuous_pose(&self) -> Pose {
        self.pose
    }

    pub fn report(&self) -> LocReport {
        self.report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::WheelGeometry;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const DT: f64 = 0.02;

    fn estimator() -> PoseEstimator {
        let k = SwerveKinematics::new(&WheelGeometry::rectangular(0.6, 0.6)).unwrap();
        PoseEstimator::new(LocParams::default(), k)
    }

    fn forward(distance_m: f64) -> [ModulePosition; NUM_MODULES] {
        [ModulePosition {
            distance_m,
            angle_rad: 0.0,
        }; NUM_MODULES]
    }

    #[test]
    fn test_odometry() {
        let mut est = estimator();

        for i in 0..=50 {
            est.update(i as f64 * DT, Some(0.0), &forward(i as f64 * 0.01));
        }

        let p = est.get_pose();
        assert_abs_diff_eq!(p.position_m_fm[0], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(p.position_m_fm[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_from_gyro_and_zero() {
        let mut est = estimator();
        est.update(0.0, Some(1.0), &forward(0.0));
        assert_abs_diff_eq!(est.get_pose().heading_rad, 1.0);

        est.zero_heading();
        est.update(DT, Some(1.0), &forward(0.0));
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.0, epsilon = 1e-12);

        est.update(2.0 * DT, Some(1.0 + FRAC_PI_2), &forward(0.0));
        assert_abs_diff_eq!(est.get_pose().heading_rad, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_gyro_fault_holds_heading() {
        let mut est = estimator();
        est.update(0.0, Some(0.5), &forward(0.0));
        est.update(DT, None, &forward(0.0));
        assert!(est.report().gyro_fault);
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.5);

        // Recovery carries on from the held heading
        est.update(2.0 * DT, Some(0.9), &forward(0.0));
        assert!(!est.report().gyro_fault);
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.5, epsilon = 1e-12);
        est.update(3.0 * DT, Some(1.0), &forward(0.0));
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_vision_correction_bounded() {
        let mut est = estimator();
        let mut t = 0.0;
        for i in 0..25 {
            t = i as f64 * DT;
            est.update(t, Some(0.0), &forward(i as f64 * 0.02));
        }

        // Measurement from 0.2 s ago claiming the robot was 1 m further left
        let capture_s = t - 0.2;
        let before = est.get_continuous_pose();
        let sender = est.vision_sender();
        sender.add_vision_measurement(Pose::new(0.2, 1.0, 0.0), capture_s, None);

        t += DT;
        est.update(t, Some(0.0), &forward(25.0 * 0.02));
        let after = est.get_continuous_pose();

        let c = est.report().last_correction.unwrap();
        assert_eq!(est.report().vision_applied, 1);

        // Gain 0.01 / (0.01 + 0.81)
        let gain = 0.01 / 0.82;
        assert_abs_diff_eq!(c.applied[1], gain * c.error[1], epsilon = 1e-12);
        assert_abs_diff_eq!(c.error[1], 1.0, epsilon = 1e-9);

        // The pose moves by the odometry step plus the correction, never more
        let jump = after.position_m_fm - before.position_m_fm;
        assert_abs_diff_eq!(jump[1], c.applied[1], epsilon = 1e-9);
        assert!(jump[1].abs() <= c.error[1].abs());
    }

    #[test]
    fn test_stale_vision_dropped() {
        let mut est = estimator();
        for i in 0..100 {
            est.update(i as f64 * DT, Some(0.0), &forward(0.0));
        }

        est.add_vision_measurement(Pose::new(5.0, 5.0, 0.0), 0.0, None);
        est.update(100.0 * DT, Some(0.0), &forward(0.0));

        assert_eq!(est.report().vision_applied, 0);
        assert_eq!(est.report().vision_dropped_total, 1);
        assert_abs_diff_eq!(est.get_pose().position_m_fm[0], 0.0);
    }

    #[test]
    fn test_out_of_order_vision_fused() {
        let mut est = estimator();
        for i in 0..50 {
            est.update(i as f64 * DT, Some(0.0), &forward(0.0));
        }

        est.add_vision_measurement(Pose::new(0.1, 0.0, 0.0), 0.9, Some([0.1, 0.1, 0.1]));
        est.add_vision_measurement(Pose::new(0.1, 0.0, 0.0), 0.5, Some([0.1, 0.1, 0.1]));
        est.update(50.0 * DT, Some(0.0), &forward(0.0));

        assert_eq!(est.report().vision_applied, 2);
        assert_eq!(est.report().vision_dropped_total, 0);
    }

    #[test]
    fn test_reset_pose() {
        let mut est = estimator();
        est.update(0.0, Some(0.3), &forward(0.0));
        est.reset_pose(Pose::new(1.0, 2.0, -1.0));

        est.update(DT, Some(0.3), &forward(0.0));
        let p = est.get_pose();
        assert_abs_diff_eq!(p.position_m_fm[0], 1.0);
        assert_abs_diff_eq!(p.position_m_fm[1], 2.0);
        assert_abs_diff_eq!(p.heading_rad, -1.0, epsilon = 1e-12);
    }
}
