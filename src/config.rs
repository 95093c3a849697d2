//! Global simulation parameters.

use crate::error::{Error, Result};
use crate::math::Vec3;

/// Gravity, fixed timestep and substep cap for a [`Solver`](crate::Solver).
///
/// Validated when handed to [`Solver::new`](crate::Solver::new) or one of the
/// solver's setters, so a running solver never sees a bad value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Constant acceleration applied to every movable body (m/s²).
    pub gravity: Vec3,
    /// Size of one physics step in seconds.
    pub fixed_dt: f32,
    /// Upper bound on physics steps per `update` call.
    pub max_substeps: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_dt: 1.0 / 60.0,
            max_substeps: 2,
        }
    }
}

impl SolverConfig {
    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set the fixed timestep (seconds).
    pub fn with_fixed_dt(mut self, fixed_dt: f32) -> Self {
        self.fixed_dt = fixed_dt;
        self
    }

    /// Builder: set the substep cap.
    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_gravity(self.gravity)?;
        validate_fixed_dt(self.fixed_dt)?;
        validate_max_substeps(self.max_substeps)
    }
}

pub(crate) fn validate_gravity(gravity: Vec3) -> Result<()> {
    if gravity.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidGravity)
    }
}

pub(crate) fn validate_fixed_dt(fixed_dt: f32) -> Result<()> {
    if fixed_dt > 0.0 && fixed_dt.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidTimestep(fixed_dt))
    }
}

pub(crate) fn validate_max_substeps(max_substeps: u32) -> Result<()> {
    if max_substeps >= 1 {
        Ok(())
    } else {
        Err(Error::InvalidSubsteps(max_substeps))
    }
}
