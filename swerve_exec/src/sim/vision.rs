//! Simulated vision source
//!
//! Runs on its own thread. The control loop hands it the true pose every
//! cycle with [`VisionSource::observe`]. Every `period_s` a sample is passed
//! to the thread, which waits out the latency, perturbs the pose and submits
//! it to the estimator with its capture time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, trace, warn};
use std::{
    sync::mpsc::{channel, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use super::VisionParams;
use crate::loc::{Pose, VisionSender};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct VisionSource {
    params: VisionParams,
    tx: Option<Sender<(f64, Pose)>>,
    handle: Option<JoinHandle<()>>,
    last_capture_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionSource {
    /// Start the vision thread, submitting measurements through `sender`.
    pub fn spawn(params: VisionParams, sender: VisionSender) -> Self {
        let (tx, rx) = channel::<(f64, Pose)>();

        let handle = thread::spawn(move || {
            info!("Vision thread started");

            // Ends when the source is dropped
            while let Ok((capture_time_s, pose)) = rx.recv() {
                thread::sleep(Duration::from_secs_f64(params.latency_s.max(0.0)));

                let measured = perturb(&pose, capture_time_s, &params);
                trace!("Vision measurement at {:.3} s: {:?}", capture_time_s, measured);

                sender.add_vision_measurement(measured, capture_time_s, Some(params.std_devs));
            }

            info!("Vision thread stopped");
        });

        Self {
            params,
            tx: Some(tx),
            handle: Some(handle),
            last_capture_s: None,
        }
    }

    /// Offer the true pose at `time_s`, captured if a measurement is due.
    pub fn observe(&mut self, time_s: f64, true_pose: Pose) {
        let due = match self.last_capture_s {
            Some(t) => time_s - t >= self.params.period_s,
            None => true,
        };
        if !due {
            return;
        }

        if let Some(ref tx) = self.tx {
            if tx.send((time_s, true_pose)).is_err() {
                warn!("Vision thread has stopped, no more measurements");
                self.tx = None;
            }
        }
        self.last_capture_s = Some(time_s);
    }

    /// Stop the thread and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.tx = None;
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                warn!("Vision thread panicked");
            }
        }
    }
}

impl Drop for VisionSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Deterministic bounded error, so runs are repeatable.
fn perturb(pose: &Pose, time_s: f64, params: &VisionParams) -> Pose {
    Pose::new(
        pose.position_m_fm[0] + params.noise_m * (time_s * 7.1).sin(),
        pose.position_m_fm[1] + params.noise_m * (time_s * 5.3).cos(),
        pose.heading_rad + params.noise_rad * (time_s * 3.7).sin(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        kinematics::{ModulePosition, SwerveKinematics, WheelGeometry, NUM_MODULES},
        loc::{LocParams, PoseEstimator},
    };

    #[test]
    fn test_measurements_reach_estimator() {
        let kin = SwerveKinematics::new(&WheelGeometry::rectangular(0.6, 0.6)).unwrap();
        let mut est = PoseEstimator::new(LocParams::default(), kin);

        let params = VisionParams {
            enabled: true,
            period_s: 0.1,
            latency_s: 0.0,
            noise_m: 0.0,
            noise_rad: 0.0,
            std_devs: [0.1, 0.1, 0.1],
        };
        let mut source = VisionSource::spawn(params, est.vision_sender());

        let positions = [ModulePosition::default(); NUM_MODULES];
        est.update(0.0, Some(0.0), &positions);

        source.observe(0.0, Pose::new(1.0, 0.0, 0.0));
        // Not due yet
        source.observe(0.05, Pose::new(5.0, 0.0, 0.0));
        source.stop();

        est.update(0.1, Some(0.0), &positions);
        let report = est.report();
        assert_eq!(report.vision_applied, 1);

        // Equal trust moves the estimate half way
        approx::assert_abs_diff_eq!(est.get_pose().position_m_fm[0], 0.5, epsilon = 1e-9);
    }
}
