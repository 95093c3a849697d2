//! Small value types for rigid-body math.
//!
//! [`Vec3`], [`Quat`] and [`Mat3`] cover exactly what the dynamics core
//! needs: cross/dot products, quaternion products and rotation matrices.
//! Everything is `f32` and `Copy`.
//!
//! Enable the `nalgebra` feature for `From` conversions into nalgebra types,
//! e.g. to hand draw output to a renderer built on nalgebra.

use core::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub, SubAssign};

// Float provides sqrt()/sin()/cos() for f32 in no_std via libm
#[allow(unused_imports)]
use num_traits::Float;

/// A 3-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    #[inline]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or [`Vec3::ZERO`] if the length is
    /// zero or not finite.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            self / len
        } else {
            Self::ZERO
        }
    }

    /// Exact comparison against the zero vector.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Element-wise product.
    #[inline]
    pub fn component_mul(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        rhs * self
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f32> for Vec3 {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

/// A quaternion `w + xi + yj + zk`.
///
/// Orientations are unit quaternions. Operations that produce an orientation
/// ([`Quat::normalize`], [`Quat::from_axis_angle`]) always return unit norm;
/// raw arithmetic does not.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians about `axis`. A zero axis gives identity.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize_or_zero();
        if axis.is_zero() {
            return Self::IDENTITY;
        }
        let half = 0.5 * angle;
        let s = half.sin();
        Self::new(half.cos(), axis.x * s, axis.y * s, axis.z * s).normalize()
    }

    /// The vector (imaginary) part.
    #[inline]
    pub fn vector(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn norm_squared(self) -> f32 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn norm(self) -> f32 {
        self.norm_squared().sqrt()
    }

    /// Unit-norm copy. Degenerate input (zero or non-finite norm) maps to
    /// [`Quat::IDENTITY`].
    pub fn normalize(self) -> Self {
        let n = self.norm();
        if n > 0.0 && n.is_finite() {
            let inv = 1.0 / n;
            Self::new(self.w * inv, self.x * inv, self.y * inv, self.z * inv)
        } else {
            Self::IDENTITY
        }
    }

    #[inline]
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate `v` by this (unit) quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = self.vector();
        let t = 2.0 * u.cross(v);
        v + self.w * t + u.cross(t)
    }

    /// Rotation matrix of this (unit) quaternion.
    pub fn to_rotation_matrix(self) -> Mat3 {
        let Self { w, x, y, z } = self;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        Mat3::from_rows(
            [1.0 - 2.0 * (yy + zz), 2.0 * (xy - wz), 2.0 * (xz + wy)],
            [2.0 * (xy + wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - wx)],
            [2.0 * (xz - wy), 2.0 * (yz + wx), 1.0 - 2.0 * (xx + yy)],
        )
    }
}

/// Hamilton product.
impl Mul for Quat {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let a = self.vector();
        let b = rhs.vector();
        let w = self.w * rhs.w - a.dot(b);
        let v = rhs.w * a + self.w * b + a.cross(b);
        Self::new(w, v.x, v.y, v.z)
    }
}

/// A row-major 3×3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mat3 {
    rows: [[f32; 3]; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Mat3 {
    pub const ZERO: Self = Self::from_rows([0.0; 3], [0.0; 3], [0.0; 3]);
    pub const IDENTITY: Self = Self::from_rows([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);

    #[inline]
    pub const fn from_rows(r0: [f32; 3], r1: [f32; 3], r2: [f32; 3]) -> Self {
        Self { rows: [r0, r1, r2] }
    }

    #[inline]
    pub const fn from_diagonal(d: Vec3) -> Self {
        Self::from_rows([d.x, 0.0, 0.0], [0.0, d.y, 0.0], [0.0, 0.0, d.z])
    }

    pub fn is_finite(&self) -> bool {
        self.rows.iter().flatten().all(|v| v.is_finite())
    }

    #[inline]
    pub fn diagonal(&self) -> Vec3 {
        Vec3::new(self.rows[0][0], self.rows[1][1], self.rows[2][2])
    }

    #[inline]
    pub fn row(&self, i: usize) -> Vec3 {
        let r = self.rows[i];
        Vec3::new(r[0], r[1], r[2])
    }

    pub fn transpose(&self) -> Self {
        let m = &self.rows;
        Self::from_rows(
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        )
    }
}

impl Index<(usize, usize)> for Mat3 {
    type Output = f32;
    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        &self.rows[row][col]
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        Vec3::new(self.row(0).dot(v), self.row(1).dot(v), self.row(2).dot(v))
    }
}

impl Mul for Mat3 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Self { rows: out }
    }
}

#[cfg(feature = "nalgebra")]
mod nalgebra_interop {
    use super::{Mat3, Quat, Vec3};

    impl From<Vec3> for nalgebra::Vector3<f32> {
        fn from(v: Vec3) -> Self {
            nalgebra::Vector3::new(v.x, v.y, v.z)
        }
    }

    impl From<nalgebra::Vector3<f32>> for Vec3 {
        fn from(v: nalgebra::Vector3<f32>) -> Self {
            Vec3::new(v.x, v.y, v.z)
        }
    }

    impl From<Quat> for nalgebra::Quaternion<f32> {
        fn from(q: Quat) -> Self {
            nalgebra::Quaternion::new(q.w, q.x, q.y, q.z)
        }
    }

    impl From<nalgebra::Quaternion<f32>> for Quat {
        fn from(q: nalgebra::Quaternion<f32>) -> Self {
            Quat::new(q.w, q.i, q.j, q.k)
        }
    }

    impl From<Quat> for nalgebra::UnitQuaternion<f32> {
        fn from(q: Quat) -> Self {
            nalgebra::UnitQuaternion::new_normalize(q.into())
        }
    }

    impl From<nalgebra::UnitQuaternion<f32>> for Quat {
        fn from(q: nalgebra::UnitQuaternion<f32>) -> Self {
            q.into_inner().into()
        }
    }

    impl From<Mat3> for nalgebra::Matrix3<f32> {
        fn from(m: Mat3) -> Self {
            nalgebra::Matrix3::from_fn(|r, c| m[(r, c)])
        }
    }

    impl From<nalgebra::Matrix3<f32>> for Mat3 {
        fn from(m: nalgebra::Matrix3<f32>) -> Self {
            Mat3::from_rows(
                [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
            )
        }
    }
}
