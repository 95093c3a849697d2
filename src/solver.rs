//! Fixed-timestep scheduler that owns the bodies.
//!
//! Real frame time is fed in through [`Solver::update`] and accumulated;
//! whole multiples of the fixed timestep are then consumed as physics steps,
//! at most `max_substeps` per call. Anything beyond that stays in the
//! accumulator, so a stalled frame slows the simulation down instead of
//! triggering an unbounded catch-up.
//!
//! Bodies live in a fixed-capacity arena. Removing a body tombstones its slot
//! and bumps the slot generation, so handles held by other code stay valid
//! for the remaining bodies and stale handles never resolve to a newcomer.
//!
//! # Example
//! ```
//! use embedded_3dphys::{RigidBody, Solver, SolverConfig, Vec3};
//!
//! let mut solver = Solver::<8>::new(SolverConfig::default()).unwrap();
//! let cube = RigidBody::new(Vec3::splat(1.0), 1.0)
//!     .unwrap()
//!     .with_position(Vec3::new(0.0, 5.0, 0.0));
//! let id = solver.add_body(cube).unwrap();
//!
//! // Called once per rendered frame with the elapsed wall-clock time.
//! let report = solver.update(0.02, |_id, state| {
//!     let _ = (state.position, state.orientation, state.size);
//! });
//! assert_eq!(report.substeps, 1);
//! assert!(solver.body(id).unwrap().position().y < 5.0);
//! ```

use heapless::Vec;

use crate::body::{DrawState, RigidBody};
use crate::config::{validate_fixed_dt, validate_gravity, validate_max_substeps, SolverConfig};
use crate::error::{Error, Result};
use crate::math::Vec3;
use crate::stats::{FrameReport, SolverStats};

/// Handle to a body inside a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId {
    index: usize,
    generation: u32,
}

impl BodyId {
    /// Arena slot of the body.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Generation of a slot that may not be reused.
const RETIRED: u32 = u32::MAX;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<RigidBody>,
}

/// The simulation: bodies, global parameters and the time accumulator.
///
/// # Type Parameters
/// * `N` - Maximum number of bodies (compile-time capacity).
#[derive(Debug, Clone)]
pub struct Solver<const N: usize> {
    slots: Vec<Slot, N>,
    live: usize,
    config: SolverConfig,
    /// Real time not yet consumed by fixed steps.
    accumulator: f32,
    stats: SolverStats,
}

impl<const N: usize> Default for Solver<N> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            config: SolverConfig::default(),
            accumulator: 0.0,
            stats: SolverStats::new(),
        }
    }
}

impl<const N: usize> Solver<N> {
    /// Create an empty solver.
    ///
    /// # Errors
    /// Returns the first configuration error found by
    /// [`SolverConfig::validate`].
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    // -- Body management --

    /// Add a body. Freed slots are reused before the arena grows.
    ///
    /// A slot whose generation reaches `u32::MAX` is retired and never handed
    /// out again, so no stale [`BodyId`] can alias a later body. Retired slots
    /// still count against `N`.
    ///
    /// # Errors
    /// [`Error::CapacityExceeded`] if no slot is free.
    pub fn add_body(&mut self, body: RigidBody) -> Result<BodyId> {
        let id = if let Some(index) = self
            .slots
            .iter()
            .position(|s| s.body.is_none() && s.generation != RETIRED)
        {
            let slot = &mut self.slots[index];
            slot.body = Some(body);
            BodyId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len();
            self.slots
                .push(Slot {
                    generation: 0,
                    body: Some(body),
                })
                .map_err(|_| Error::CapacityExceeded { capacity: N })?;
            BodyId {
                index,
                generation: 0,
            }
        };
        self.live += 1;
        log::debug!("added body {:?} ({}/{} slots live)", id, self.live, N);
        Ok(id)
    }

    /// Remove a body and hand it back. Returns `None` for a stale or foreign
    /// handle.
    pub fn remove_body(&mut self, id: BodyId) -> Option<RigidBody> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.saturating_add(1);
        self.live -= 1;
        if slot.generation == RETIRED {
            log::debug!("removed body {:?}, slot retired", id);
        } else {
            log::debug!("removed body {:?}", id);
        }
        Some(body)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.body.as_ref())
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.body.as_mut())
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Iterate over live bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let id = BodyId {
                index,
                generation: slot.generation,
            };
            slot.body.as_ref().map(|body| (id, body))
        })
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut RigidBody)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let id = BodyId {
                index,
                generation: slot.generation,
            };
            slot.body.as_mut().map(|body| (id, body))
        })
    }

    // -- External input --

    /// Apply an impulse at a world-space point to the body behind `id`.
    pub fn apply_impulse(&mut self, id: BodyId, point: Vec3, impulse: Vec3) -> Result<()> {
        self.body_mut(id)
            .ok_or(Error::UnknownBody(id))?
            .apply_impulse(point, impulse);
        Ok(())
    }

    /// Add a torque to the body behind `id`, consumed by the next step.
    pub fn add_torque(&mut self, id: BodyId, torque: Vec3) -> Result<()> {
        self.body_mut(id).ok_or(Error::UnknownBody(id))?.add_torque(torque);
        Ok(())
    }

    // -- Configuration --

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        validate_gravity(gravity)?;
        self.config.gravity = gravity;
        Ok(())
    }

    pub fn fixed_dt(&self) -> f32 {
        self.config.fixed_dt
    }

    /// Change the fixed timestep. Time already in the accumulator is kept and
    /// consumed in steps of the new size.
    pub fn set_fixed_dt(&mut self, fixed_dt: f32) -> Result<()> {
        validate_fixed_dt(fixed_dt)?;
        self.config.fixed_dt = fixed_dt;
        Ok(())
    }

    pub fn max_substeps(&self) -> u32 {
        self.config.max_substeps
    }

    pub fn set_max_substeps(&mut self, max_substeps: u32) -> Result<()> {
        validate_max_substeps(max_substeps)?;
        self.config.max_substeps = max_substeps;
        Ok(())
    }

    // -- Scheduling --

    /// Real time carried over to the next `update`.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// `accumulator / fixed_dt`: how far the wall clock is into the next fixed
    /// step. Exceeds 1.0 after a starved frame.
    pub fn interpolation_alpha(&self) -> f32 {
        self.accumulator / self.config.fixed_dt
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Advance the simulation by `real_dt` seconds of wall-clock time, then
    /// hand every body's transform to `draw`.
    ///
    /// Runs zero or more fixed steps, never more than `max_substeps`. `draw`
    /// is called for every live body even when no step ran. A negative or
    /// non-finite `real_dt` counts as zero.
    pub fn update<F>(&mut self, real_dt: f32, draw: F) -> FrameReport
    where
        F: FnMut(BodyId, DrawState),
    {
        let real_dt = if real_dt.is_finite() && real_dt >= 0.0 {
            real_dt
        } else {
            log::warn!("ignoring invalid frame time {}", real_dt);
            0.0
        };
        self.accumulator += real_dt;

        let fixed_dt = self.config.fixed_dt;
        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < self.config.max_substeps {
            self.integrate_bodies(fixed_dt);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }

        let starved = self.accumulator >= fixed_dt;
        if starved {
            log::debug!(
                "substep cap of {} reached, {}s of simulation time pending",
                self.config.max_substeps,
                self.accumulator
            );
        }

        let report = FrameReport { substeps, starved };
        self.stats.record(report);
        self.present(draw);
        report
    }

    /// One fixed step of `dt` seconds for every movable body, bypassing the
    /// accumulator.
    ///
    /// # Errors
    /// [`Error::InvalidTimestep`] if `dt` is not finite and positive. No body
    /// is touched in that case.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        validate_fixed_dt(dt)?;
        self.integrate_bodies(dt);
        Ok(())
    }

    // Bodies do not interact, so the visiting order does not matter.
    fn integrate_bodies(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for body in self.slots.iter_mut().filter_map(|s| s.body.as_mut()) {
            body.integrate(dt, gravity);
        }
        log::trace!("stepped {} bodies by {}s", self.live, dt);
    }

    /// Call `draw` with the current transform of every live body.
    pub fn present<F>(&self, mut draw: F)
    where
        F: FnMut(BodyId, DrawState),
    {
        for (id, body) in self.bodies() {
            draw(id, body.draw_state());
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    #[allow(unused_imports)]
    use num_traits::Float;
    use crate::math::Quat;
    use std::vec::Vec as StdVec;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn unit_cube() -> RigidBody {
        RigidBody::new(Vec3::splat(1.0), 1.0).unwrap()
    }

    fn no_draw(_: BodyId, _: DrawState) {}

    // -- Construction & configuration --

    #[test]
    fn test_solver_creation() {
        let solver = Solver::<8>::new(SolverConfig::default()).unwrap();
        assert_eq!(solver.body_count(), 0);
        assert_eq!(solver.capacity(), 8);
        assert_eq!(solver.gravity(), Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(solver.fixed_dt(), 1.0 / 60.0);
        assert_eq!(solver.max_substeps(), 2);
        assert_eq!(solver.accumulator(), 0.0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SolverConfig::default().with_fixed_dt(0.0);
        assert!(matches!(
            Solver::<4>::new(config),
            Err(Error::InvalidTimestep(_))
        ));
    }

    #[test]
    fn test_setters_validate() {
        let mut solver = Solver::<4>::default();
        assert_eq!(solver.set_max_substeps(0), Err(Error::InvalidSubsteps(0)));
        assert!(solver.set_fixed_dt(-1.0).is_err());
        assert_eq!(
            solver.set_gravity(Vec3::splat(f32::NAN)),
            Err(Error::InvalidGravity)
        );
        assert_eq!(solver.config(), &SolverConfig::default());

        solver.set_max_substeps(5).unwrap();
        solver.set_fixed_dt(0.01).unwrap();
        solver.set_gravity(Vec3::ZERO).unwrap();
        assert_eq!(solver.max_substeps(), 5);
        assert_eq!(solver.fixed_dt(), 0.01);
        assert_eq!(solver.gravity(), Vec3::ZERO);
    }

    // -- Body management --

    #[test]
    fn test_add_and_get_body() {
        let mut solver = Solver::<4>::default();
        let id = solver
            .add_body(unit_cube().with_position(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        assert_eq!(solver.body_count(), 1);
        assert_eq!(solver.body(id).unwrap().position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_add_body_at_capacity() {
        let mut solver = Solver::<2>::default();
        assert!(solver.add_body(unit_cube()).is_ok());
        assert!(solver.add_body(unit_cube()).is_ok());
        assert_eq!(
            solver.add_body(unit_cube()).unwrap_err(),
            Error::CapacityExceeded { capacity: 2 }
        );
    }

    #[test]
    fn test_remove_body() {
        let mut solver = Solver::<4>::default();
        let a = solver.add_body(unit_cube()).unwrap();
        let b = solver
            .add_body(unit_cube().with_position(Vec3::X))
            .unwrap();

        assert!(solver.remove_body(a).is_some());
        assert_eq!(solver.body_count(), 1);
        assert!(solver.body(a).is_none());
        assert!(solver.remove_body(a).is_none());
        // Other handles are unaffected.
        assert_eq!(solver.body(b).unwrap().position(), Vec3::X);
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut solver = Solver::<2>::default();
        let old = solver.add_body(unit_cube()).unwrap();
        solver.remove_body(old).unwrap();

        let new = solver
            .add_body(unit_cube().with_position(Vec3::Y))
            .unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(solver.body(old).is_none());
        assert!(solver.remove_body(old).is_none());
        assert_eq!(solver.body(new).unwrap().position(), Vec3::Y);
    }

    #[test]
    fn test_bodies_iterator_skips_removed() {
        let mut solver = Solver::<4>::default();
        solver.add_body(unit_cube().with_position(Vec3::new(1.0, 0.0, 0.0))).unwrap();
        let mid = solver.add_body(unit_cube().with_position(Vec3::new(2.0, 0.0, 0.0))).unwrap();
        solver.add_body(unit_cube().with_position(Vec3::new(3.0, 0.0, 0.0))).unwrap();
        solver.remove_body(mid);

        let xs: StdVec<f32> = solver.bodies().map(|(_, b)| b.position().x).collect();
        assert_eq!(xs, std::vec![1.0, 3.0]);
    }

    #[test]
    fn test_bodies_mut() {
        let mut solver = Solver::<4>::default();
        solver.add_body(unit_cube()).unwrap();
        solver.add_body(unit_cube()).unwrap();
        for (_, body) in solver.bodies_mut() {
            body.set_position(Vec3::splat(7.0));
        }
        assert!(solver.bodies().all(|(_, b)| b.position() == Vec3::splat(7.0)));
    }

    #[test]
    fn test_input_through_handles() {
        let mut solver = Solver::<4>::default();
        let id = solver.add_body(unit_cube()).unwrap();

        solver
            .apply_impulse(id, Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0))
            .unwrap();
        solver.add_torque(id, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let body = solver.body(id).unwrap();
        assert_eq!(body.velocity(), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(body.torque_accumulator(), Vec3::new(1.0, 0.0, 0.0));

        solver.remove_body(id);
        assert_eq!(
            solver.add_torque(id, Vec3::X),
            Err(Error::UnknownBody(id))
        );
        assert_eq!(
            solver.apply_impulse(id, Vec3::ZERO, Vec3::X),
            Err(Error::UnknownBody(id))
        );
    }

    // -- Stepping --

    #[test]
    fn test_single_step_freefall() {
        let mut solver = Solver::<4>::default();
        let id = solver.add_body(unit_cube()).unwrap();
        solver.step(solver.fixed_dt()).unwrap();

        let body = solver.body(id).unwrap();
        assert!(approx_eq(body.linear_momentum().y, -0.1635));
        assert_eq!(body.velocity(), body.linear_momentum() / body.mass());
        assert!(approx_eq(body.position().y, -0.002725));
    }

    #[test]
    fn test_static_body_not_affected() {
        let mut solver = Solver::<4>::default();
        let floor = RigidBody::new_static(Vec3::new(10.0, 0.5, 10.0))
            .unwrap()
            .with_position(Vec3::new(0.0, -1.0, 0.0))
            .with_orientation(Quat::from_axis_angle(Vec3::Z, 0.1));
        let id = solver.add_body(floor).unwrap();
        let (position, orientation) = {
            let b = solver.body(id).unwrap();
            (b.position(), b.orientation())
        };

        for _ in 0..100 {
            solver.update(5.0, no_draw);
        }

        let b = solver.body(id).unwrap();
        assert_eq!(b.position(), position);
        assert_eq!(b.orientation(), orientation);
    }

    #[test]
    fn test_torque_cleared_after_step() {
        let mut solver = Solver::<4>::new(SolverConfig::default().with_gravity(Vec3::ZERO)).unwrap();
        let id = solver.add_body(unit_cube()).unwrap();
        solver.add_torque(id, Vec3::new(0.0, 0.0, 1.0)).unwrap();
        solver.step(0.1).unwrap();
        let spin = solver.body(id).unwrap().angular_momentum();
        assert_eq!(solver.body(id).unwrap().torque_accumulator(), Vec3::ZERO);

        solver.step(0.1).unwrap();
        assert_eq!(solver.body(id).unwrap().angular_momentum(), spin);
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut solver = Solver::<2>::default();
        let first = solver.add_body(unit_cube()).unwrap();
        solver.remove_body(first).unwrap();
        solver.slots[first.index()].generation = RETIRED - 1;

        let last = solver.add_body(unit_cube()).unwrap();
        assert_eq!(last.index(), first.index());
        assert_eq!(last.generation(), RETIRED - 1);
        solver.remove_body(last).unwrap();

        // The retired slot is skipped; the arena grows instead.
        let next = solver.add_body(unit_cube()).unwrap();
        assert_ne!(next.index(), first.index());
        assert!(solver.body(last).is_none());
        assert!(solver.body(first).is_none());
        assert_eq!(solver.body_count(), 1);

        // With the only other slot taken, the retired one does not count as free.
        assert_eq!(
            solver.add_body(unit_cube()),
            Err(Error::CapacityExceeded { capacity: 2 })
        );
    }

    #[test]
    fn test_step_rejects_invalid_dt() {
        let mut solver = Solver::<4>::default();
        let id = solver
            .add_body(unit_cube().with_velocity(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let before = solver.body(id).unwrap().draw_state();

        for dt in [0.0, -0.1, f32::NAN, f32::INFINITY] {
            assert!(matches!(solver.step(dt), Err(Error::InvalidTimestep(_))));
        }

        let body = solver.body(id).unwrap();
        assert_eq!(body.draw_state(), before);
        assert_eq!(body.velocity_history().len(), 0);
    }

    // -- Scheduling --

    #[test]
    fn test_small_frames_accumulate_before_stepping() {
        let mut solver = Solver::<4>::default();
        let id = solver.add_body(unit_cube()).unwrap();

        for _ in 0..166 {
            let report = solver.update(0.0001, no_draw);
            assert_eq!(report.substeps, 0);
        }
        assert_eq!(solver.body(id).unwrap().position(), Vec3::ZERO);
        assert_eq!(solver.stats().steps(), 0);

        let report = solver.update(0.0001, no_draw);
        assert_eq!(report.substeps, 1);
        assert!(solver.body(id).unwrap().position().y < 0.0);
        assert!(solver.accumulator() < solver.fixed_dt());
    }

    #[test]
    fn test_long_frame_capped_by_substeps() {
        let mut solver = Solver::<4>::default();
        solver.add_body(unit_cube()).unwrap();

        let report = solver.update(1.0, no_draw);
        assert_eq!(report.substeps, 2);
        assert!(report.starved);
        assert!(approx_eq(solver.accumulator(), 1.0 - 2.0 / 60.0));
        assert!(solver.interpolation_alpha() > 1.0);
    }

    #[test]
    fn test_regular_frames_keep_accumulator_below_fixed_dt() {
        let mut solver = Solver::<4>::default();
        for _ in 0..50 {
            let report = solver.update(0.021, no_draw);
            assert!(!report.starved);
            assert!(solver.accumulator() >= 0.0);
            assert!(solver.accumulator() < solver.fixed_dt());
        }
    }

    #[test]
    fn test_invalid_frame_time_counts_as_zero() {
        let mut solver = Solver::<4>::default();
        solver.update(-1.0, no_draw);
        solver.update(f32::NAN, no_draw);
        assert_eq!(solver.accumulator(), 0.0);
        assert_eq!(solver.stats().frames(), 2);
    }

    #[test]
    fn test_draw_called_every_frame() {
        let mut solver = Solver::<4>::default();
        let a = solver.add_body(unit_cube()).unwrap();
        let b = solver
            .add_body(RigidBody::new(Vec3::new(1.0, 2.0, 3.0), 1.0).unwrap())
            .unwrap();

        let mut drawn = StdVec::new();
        let report = solver.update(0.0, |id, state| drawn.push((id, state)));
        assert_eq!(report.substeps, 0);
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn[0].0, a);
        assert_eq!(drawn[1].0, b);
        assert_eq!(drawn[1].1.size, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_draw_sees_post_step_state() {
        let mut solver = Solver::<4>::default();
        let id = solver.add_body(unit_cube()).unwrap();

        let mut seen = None;
        solver.update(1.0 / 30.0 + 1e-4, |_, state| seen = Some(state.position));
        assert_eq!(seen, Some(solver.body(id).unwrap().position()));
        assert!(seen.unwrap().y < 0.0);
    }

    #[test]
    fn test_stats_track_frames() {
        let mut solver = Solver::<4>::default();
        solver.update(1.0, no_draw);
        solver.update(0.0, no_draw);
        let stats = solver.stats();
        assert_eq!(stats.frames(), 2);
        // The second frame drains two more steps from the backlog.
        assert_eq!(stats.steps(), 4);
        assert_eq!(stats.starved_frames(), 2);
    }
}
