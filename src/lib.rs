//! Rigid-body dynamics for box bodies on a fixed-timestep schedule.
//!
//! The crate is split in two layers:
//! - [`body`]: one box's mass, inertia, momentum, position and orientation,
//!   plus impulse/torque input and orientation integration
//! - [`solver`]: the body arena, gravity, and the accumulator that turns
//!   irregular frame times into a deterministic sequence of fixed steps
//!
//! Rendering stays outside. A render loop calls [`Solver::update`] once per
//! frame with the elapsed time and receives each body's [`DrawState`] in a
//! callback.
//!
//! `no_std` and allocation-free: bodies live in a `heapless` arena whose
//! capacity is a const generic.
//!
//! # Features
//! - `serde`: `Serialize`/`Deserialize` for the math types and
//!   [`SolverConfig`]
//! - `nalgebra`: `From` conversions between [`Vec3`]/[`Quat`]/[`Mat3`] and
//!   nalgebra types

#![no_std]

pub mod body;
pub mod config;
pub mod error;
pub mod math;
pub mod solver;
pub mod stats;

pub use body::{DrawState, RigidBody, HISTORY_LEN};
pub use config::SolverConfig;
pub use error::{Error, Result};
pub use math::{Mat3, Quat, Vec3};
pub use solver::{BodyId, Solver};
pub use stats::{FrameReport, SolverStats};
