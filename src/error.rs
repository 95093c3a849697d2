//! Error type for body construction and solver configuration.
//!
//! The numerical core itself never fails: degenerate mass and inertia are
//! modelled states, and timestep spikes are absorbed by the substep cap.
//! Errors only surface when invalid input is handed to a constructor or
//! setter, before any stepping happens.

use crate::solver::BodyId;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    /// Fixed timestep must be positive and finite.
    #[error("fixed timestep must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    /// A solver must run at least one substep per update.
    #[error("max substeps must be at least 1, got {0}")]
    InvalidSubsteps(u32),
    #[error("gravity must be finite on every axis")]
    InvalidGravity,
    /// Box dimensions must be finite and non-negative on every axis.
    #[error("box size must be finite and non-negative, got ({x}, {y}, {z})")]
    InvalidSize { x: f32, y: f32, z: f32 },
    #[error("density must be finite, got {0}")]
    InvalidDensity(f32),
    #[error("solver is full ({capacity} bodies)")]
    CapacityExceeded { capacity: usize },
    /// The handle refers to a removed body or was never issued by this solver.
    #[error("no live body for {0:?}")]
    UnknownBody(BodyId),
}

pub type Result<T> = core::result::Result<T, Error>;
