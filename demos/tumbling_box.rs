//! Headless render-loop driver: a tumbling box over a static floor
//!
//! Demonstrates the scheduler:
//! - Irregular frame times mapped onto fixed 60 Hz physics steps
//! - A simulated stall absorbed by the substep cap
//! - Off-centre impulses and torque injected between frames (as input
//!   handling would)
//! - Draw output handed to a "renderer" callback every frame
//!
//! Run with: cargo run --example tumbling_box

use embedded_3dphys::{BodyId, DrawState, Quat, RigidBody, Solver, SolverConfig, Vec3};
use std::time::{Duration, Instant};

struct Renderer {
    frame: u32,
}

impl Renderer {
    fn draw(&mut self, id: BodyId, state: DrawState) {
        if self.frame % 30 == 0 {
            let p = state.position;
            let q = state.orientation;
            println!(
                "frame {:4} body {}: pos ({:7.3}, {:7.3}, {:7.3}) rot ({:6.3}, {:6.3}, {:6.3}, {:6.3})",
                self.frame,
                id.index(),
                p.x,
                p.y,
                p.z,
                q.w,
                q.x,
                q.y,
                q.z
            );
        }
    }
}

fn main() {
    let config = SolverConfig::default().with_max_substeps(3);
    let mut solver = Solver::<4>::new(config).expect("default config is valid");

    let floor = RigidBody::new_static(Vec3::new(20.0, 0.5, 20.0))
        .expect("floor size is valid")
        .with_position(Vec3::new(0.0, -0.25, 0.0));
    solver.add_body(floor).expect("solver has room");

    let plank = RigidBody::new(Vec3::new(2.0, 0.25, 0.5), 600.0)
        .expect("plank size is valid")
        .with_position(Vec3::new(0.0, 8.0, 0.0))
        .with_orientation(Quat::from_axis_angle(Vec3::X, 0.3))
        .with_angular_velocity(Vec3::new(0.0, 1.5, 0.0));
    let plank = solver.add_body(plank).expect("solver has room");

    let mut renderer = Renderer { frame: 0 };
    let frame_times = [0.016, 0.017, 0.015, 0.033, 0.016];
    let start = Instant::now();

    for frame in 0..240u32 {
        renderer.frame = frame;

        // Input between frames.
        if frame == 60 {
            let tip = solver
                .body(plank)
                .map(|b| b.local_to_world(Vec3::new(1.0, 0.0, 0.0)))
                .unwrap_or(Vec3::ZERO);
            solver
                .apply_impulse(plank, tip, Vec3::new(0.0, 600.0, 0.0))
                .expect("plank is live");
        }
        if (120..150).contains(&frame) {
            solver
                .add_torque(plank, Vec3::new(50.0, 0.0, 0.0))
                .expect("plank is live");
        }

        // A 0.25 s hitch: the cap turns it into slow motion, not a jump.
        let real_dt = if frame == 180 {
            0.25
        } else {
            frame_times[frame as usize % frame_times.len()]
        };

        let report = solver.update(real_dt, |id, state| renderer.draw(id, state));
        if report.starved {
            println!(
                "frame {:4}: substep cap hit, {:.3}s pending",
                frame,
                solver.accumulator()
            );
        }
    }

    let elapsed: Duration = start.elapsed();
    println!("{}", solver.stats().summary());
    if let Some(body) = solver.body(plank) {
        println!(
            "plank: speed {:.3} m/s, kinetic {:.2} J, rotational {:.2} J",
            body.speed(),
            body.kinetic_energy(),
            body.angular_kinetic_energy()
        );
    }
    println!("simulated 240 frames in {:?}", elapsed);
}
