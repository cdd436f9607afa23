//! # Drive Cycle Benchmark
//!
//! Time for one full DriveCtrl cycle with vision corrections arriving.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use swerve_lib::{
    drive_ctrl::{DriveCtrl, DriveIo, InputData, Params},
    loc::Pose,
    sim::{SimDrive, SimParams},
};
use util::module::State;

const DT_S: f64 = 0.02;

fn drive_cycle_benchmark(c: &mut Criterion) {
    let params: Params =
        util::params::parse(include_str!("../../params/drive_ctrl.toml")).unwrap();
    let sim_params: SimParams =
        util::params::parse(include_str!("../../params/sim.toml")).unwrap();

    let mut drive_ctrl = DriveCtrl::new(params).unwrap();
    let mut sim = SimDrive::new(sim_params).unwrap();
    let vision = drive_ctrl.vision_sender();

    drive_ctrl.drive_field_relative(1.5, 0.5, 0.8).unwrap();

    let mut time_s = 0.0;
    let mut cycle = 0u64;

    c.bench_function("drive_ctrl_cycle", |b| {
        b.iter(|| {
            let input = InputData {
                time_s,
                sensors: sim.read_sensors(time_s),
            };

            if cycle % 5 == 0 {
                let truth = sim.true_pose();
                vision.add_vision_measurement(
                    Pose::new(truth.position_m_fm[0], truth.position_m_fm[1], truth.heading_rad),
                    time_s - 0.04,
                    None,
                );
            }

            let (out, _) = drive_ctrl.proc(black_box(&input)).unwrap();
            sim.write_demands(&out.demands, DT_S);

            time_s += DT_S;
            cycle += 1;
        })
    });
}

criterion_group!(benches, drive_cycle_benchmark);
criterion_main!(benches);
