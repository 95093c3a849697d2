//! Rigid box bodies with momentum-based dynamics.
//!
//! Linear and angular momentum are the integrated state; velocity and angular
//! velocity are derived from them through mass and the world-space inverse
//! inertia tensor. Two invariants hold after every public mutation:
//! - `orientation` has unit norm
//! - `inv_inertia_world` matches the current `orientation`
//!
//! A body whose mass is not positive is immovable. That classification is
//! fixed at construction, and every dynamic operation on such a body is a
//! no-op.
//!
//! # Example
//! ```
//! use embedded_3dphys::{RigidBody, Vec3};
//!
//! let mut cube = RigidBody::new(Vec3::splat(1.0), 1.0)
//!     .unwrap()
//!     .with_position(Vec3::new(0.0, 2.0, 0.0));
//!
//! // Push the top-right edge sideways: the cube slides and starts to spin.
//! cube.apply_impulse(Vec3::new(0.5, 2.5, 0.0), Vec3::new(-1.0, 0.0, 0.0));
//! assert_eq!(cube.velocity(), Vec3::new(-1.0, 0.0, 0.0));
//! assert!(cube.angular_momentum().z > 0.0);
//! ```

use heapless::HistoryBuffer;

use crate::error::{Error, Result};
use crate::math::{Mat3, Quat, Vec3};

/// Number of previous velocities kept per body.
pub const HISTORY_LEN: usize = 10;

/// What a renderer needs to draw one body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawState {
    pub position: Vec3,
    pub orientation: Quat,
    pub size: Vec3,
}

/// A solid box with uniform density.
#[derive(Debug, Clone)]
pub struct RigidBody {
    // -- Shape & material (fixed at construction) --
    size: Vec3,
    density: f32,
    mass: f32,
    /// Half the box diagonal; a bounding-sphere radius for broad-phase use.
    radius: f32,
    /// Friction coefficient. Stored for collision response, not used here.
    friction: f32,

    // -- Linear state --
    position: Vec3,
    linear_momentum: Vec3,
    velocity: Vec3,

    // -- Angular state --
    orientation: Quat,
    angular_momentum: Vec3,
    angular_velocity: Vec3,
    /// Diagonal inertia tensor in body space. Zero for immovable bodies.
    inertia_local: Mat3,
    /// `R * I⁻¹_local * Rᵀ` for the current orientation.
    inv_inertia_world: Mat3,

    /// Torque applied since the last step. Cleared by every step.
    torque_accumulator: Vec3,

    velocity_history: HistoryBuffer<Vec3, HISTORY_LEN>,
    angular_velocity_history: HistoryBuffer<Vec3, HISTORY_LEN>,
}

/// Reciprocal that maps zero to zero.
#[inline]
fn recip_or_zero(v: f32) -> f32 {
    if v != 0.0 {
        1.0 / v
    } else {
        0.0
    }
}

impl RigidBody {
    /// Create a box of full dimensions `size` and the given `density`.
    ///
    /// Mass is `density * volume`. A non-positive mass makes the body
    /// immovable, see [`RigidBody::new_static`].
    ///
    /// The local inertia is the solid-box tensor with `k = mass / 12`:
    /// - `Ixx = k * (y² + z²)`
    /// - `Iyy = k * (x² + z²)`
    /// - `Izz = k * (x² + y²)`
    ///
    /// # Errors
    /// [`Error::InvalidSize`] if any size component is negative or not
    /// finite, or if the derived mass or inertia is not representable as a
    /// finite `f32`. [`Error::InvalidDensity`] if `density` is not finite.
    pub fn new(size: Vec3, density: f32) -> Result<Self> {
        let size_error = Error::InvalidSize {
            x: size.x,
            y: size.y,
            z: size.z,
        };
        if !size.is_finite() || size.x < 0.0 || size.y < 0.0 || size.z < 0.0 {
            return Err(size_error);
        }
        if !density.is_finite() {
            return Err(Error::InvalidDensity(density));
        }

        let mass = density * size.x * size.y * size.z;
        let inertia_local = if mass > 0.0 {
            let sq = size.component_mul(size);
            let k = mass / 12.0;
            Mat3::from_diagonal(Vec3::new(k * (sq.y + sq.z), k * (sq.x + sq.z), k * (sq.x + sq.y)))
        } else {
            Mat3::ZERO
        };
        // Finite inputs can still overflow once squared or multiplied.
        if !mass.is_finite() || !inertia_local.is_finite() {
            return Err(size_error);
        }

        let mut body = Self {
            size,
            density,
            mass,
            radius: 0.5 * size.length(),
            friction: 0.5,
            position: Vec3::ZERO,
            linear_momentum: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            angular_momentum: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inertia_local,
            inv_inertia_world: Mat3::ZERO,
            torque_accumulator: Vec3::ZERO,
            velocity_history: HistoryBuffer::new(),
            angular_velocity_history: HistoryBuffer::new(),
        };
        body.refresh_inertia_caches(true);
        if !body.inv_inertia_world.is_finite() {
            return Err(size_error);
        }
        Ok(body)
    }

    /// Create an immovable box (zero density), e.g. a floor or a wall.
    pub fn new_static(size: Vec3) -> Result<Self> {
        Self::new(size, 0.0)
    }

    /// Builder: set initial position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder: set initial velocity. Ignored for immovable bodies.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.set_velocity(velocity);
        self
    }

    /// Builder: set initial angular velocity (radians per second, world
    /// space). Ignored for immovable bodies.
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.set_angular_velocity(angular_velocity);
        self
    }

    /// Builder: set initial orientation. Angular momentum is re-derived so
    /// the current angular velocity is preserved.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.set_rotation(orientation, true);
        self
    }

    /// Builder: set friction coefficient (0.0..=1.0).
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.clamp(0.0, 1.0);
        self
    }

    /// `true` iff the body has non-positive mass.
    #[inline]
    pub fn is_immovable(&self) -> bool {
        self.mass <= 0.0
    }

    /// Recompute `inv_inertia_world` from the current orientation.
    ///
    /// With `sync_angular_momentum` the angular momentum is re-derived as
    /// `I_world * ω`, for callers that just assigned orientation or angular
    /// velocity. Without it, momentum is kept and angular velocity is
    /// re-derived as `I⁻¹_world * L`.
    ///
    /// Zero diagonal entries of the local tensor give zero inverse entries,
    /// so a degenerate axis never rotates instead of dividing by zero.
    pub fn refresh_inertia_caches(&mut self, sync_angular_momentum: bool) {
        if self.is_immovable() {
            self.inertia_local = Mat3::ZERO;
            self.inv_inertia_world = Mat3::ZERO;
            return;
        }

        let r = self.orientation.to_rotation_matrix();
        let rt = r.transpose();
        let d = self.inertia_local.diagonal();
        let inv_local = Mat3::from_diagonal(Vec3::new(
            recip_or_zero(d.x),
            recip_or_zero(d.y),
            recip_or_zero(d.z),
        ));
        self.inv_inertia_world = r * inv_local * rt;

        if sync_angular_momentum {
            let inertia_world = r * self.inertia_local * rt;
            self.angular_momentum = inertia_world * self.angular_velocity;
        } else {
            self.angular_velocity = self.inv_inertia_world * self.angular_momentum;
        }
    }

    /// Replace the orientation with a normalized copy of `q` and refresh the
    /// inertia caches.
    ///
    /// Allowed on immovable bodies (placing a tilted ramp, say).
    pub fn set_rotation(&mut self, q: Quat, sync_angular_momentum: bool) {
        self.orientation = q.normalize();
        self.refresh_inertia_caches(sync_angular_momentum);
    }

    /// Teleport the body. Allowed on immovable bodies.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Overwrite velocity; linear momentum follows.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        if self.is_immovable() {
            return;
        }
        self.linear_momentum = velocity * self.mass;
        self.velocity = self.linear_momentum / self.mass;
    }

    /// Overwrite angular velocity; angular momentum follows.
    pub fn set_angular_velocity(&mut self, angular_velocity: Vec3) {
        if self.is_immovable() {
            return;
        }
        self.angular_velocity = angular_velocity;
        self.refresh_inertia_caches(true);
    }

    /// Apply an instantaneous impulse at a world-space point.
    ///
    /// `Δp = J`, `ΔL = (point - position) × J`. An impulse through the centre
    /// of mass changes only the linear state.
    pub fn apply_impulse(&mut self, point: Vec3, impulse: Vec3) {
        if self.is_immovable() {
            return;
        }

        self.linear_momentum += impulse;
        self.velocity = self.linear_momentum / self.mass;

        let delta_l = (point - self.position).cross(impulse);
        if !delta_l.is_zero() {
            self.angular_momentum += delta_l;
            self.angular_velocity = self.inv_inertia_world * self.angular_momentum;
        }
    }

    /// Add a world-space torque (N·m). Torques accumulate until the next step.
    #[inline]
    pub fn add_torque(&mut self, torque: Vec3) {
        if self.is_immovable() {
            return;
        }
        self.torque_accumulator += torque;
    }

    /// Accumulate the torque `(point - position) × force` of a force applied
    /// at a world-space point.
    ///
    /// Only the torque is kept. There is no linear force accumulator: gravity
    /// and impulses are the only things that move a body linearly.
    pub fn add_torque_at_point(&mut self, point: Vec3, force: Vec3) {
        self.add_torque((point - self.position).cross(force));
    }

    #[inline]
    pub fn clear_accumulators(&mut self) {
        self.torque_accumulator = Vec3::ZERO;
    }

    /// Advance the orientation by `dt` with the current angular velocity.
    ///
    /// One explicit Euler step of `q̇ = ½ (0, ω) ⊗ q` followed by
    /// renormalization. A body with exactly zero angular velocity is left
    /// untouched.
    pub fn integrate_orientation(&mut self, dt: f32) {
        let w = self.angular_velocity;
        if self.is_immovable() || w.length_squared() == 0.0 {
            return;
        }

        let q = self.orientation;
        let v = q.vector();
        let dv = 0.5 * (q.w * w + w.cross(v));
        let dw = -0.5 * w.dot(v);
        let stepped = Quat::new(
            q.w + dw * dt,
            v.x + dv.x * dt,
            v.y + dv.y * dt,
            v.z + dv.z * dt,
        );
        self.orientation = stepped.normalize();
        self.refresh_inertia_caches(false);
    }

    /// One fixed step: gravity, torque, then orientation. Semi-implicit, so
    /// position uses the velocity of the end of the step.
    pub(crate) fn integrate(&mut self, dt: f32, gravity: Vec3) {
        if self.is_immovable() {
            return;
        }

        self.velocity_history.write(self.velocity);
        self.angular_velocity_history.write(self.angular_velocity);

        // --- Linear ---
        self.linear_momentum += gravity * self.mass * dt;
        self.velocity = self.linear_momentum / self.mass;
        self.position += self.velocity * dt;

        // --- Angular ---
        if !self.torque_accumulator.is_zero() {
            self.angular_momentum += self.torque_accumulator * dt;
        }
        self.angular_velocity = self.inv_inertia_world * self.angular_momentum;
        self.integrate_orientation(dt);

        self.clear_accumulators();
    }

    /// Convert a body-local point to world space.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation.rotate(local)
    }

    pub fn draw_state(&self) -> DrawState {
        DrawState {
            position: self.position,
            orientation: self.orientation,
            size: self.size,
        }
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.size
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn linear_momentum(&self) -> Vec3 {
        self.linear_momentum
    }

    #[inline]
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    #[inline]
    pub fn angular_momentum(&self) -> Vec3 {
        self.angular_momentum
    }

    #[inline]
    pub fn inertia_local(&self) -> Mat3 {
        self.inertia_local
    }

    #[inline]
    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    #[inline]
    pub fn torque_accumulator(&self) -> Vec3 {
        self.torque_accumulator
    }

    /// Velocities recorded at the start of each step, most recent last.
    pub fn velocity_history(&self) -> &HistoryBuffer<Vec3, HISTORY_LEN> {
        &self.velocity_history
    }

    /// Angular velocities recorded at the start of each step, most recent
    /// last. Each entry is `I⁻¹_world * L` as left by the previous step's
    /// orientation update, i.e. evaluated at the orientation the step starts
    /// from.
    pub fn angular_velocity_history(&self) -> &HistoryBuffer<Vec3, HISTORY_LEN> {
        &self.angular_velocity_history
    }

    /// Returns the current speed (magnitude of velocity).
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Translational kinetic energy `½ m v²`. Zero for immovable bodies.
    pub fn kinetic_energy(&self) -> f32 {
        if self.is_immovable() {
            return 0.0;
        }
        0.5 * self.mass * self.velocity.length_squared()
    }

    /// Rotational kinetic energy `½ ω·L`.
    pub fn angular_kinetic_energy(&self) -> f32 {
        0.5 * self.angular_velocity.dot(self.angular_momentum)
    }
}
