//! Minimal 3D vector used for entity positions and velocities.
//!
//! The dungeon floor is the x/z plane and `y` is height. Gameplay distances
//! (pickup, melee, hit tests) are measured on the floor plane, so most helpers
//! here have a `planar` flavour that ignores `y`.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 3D vector with `f64` components.
///
/// Serialized as a `[x, y, z]` triple so template files stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    /// East/west axis.
    pub x: f64,
    /// Height.
    pub y: f64,
    /// North/south axis.
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Construct from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Copy with the height component zeroed.
    pub fn planar(self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }

    /// Distance between two points on the floor plane.
    pub fn planar_distance(self, other: Self) -> f64 {
        (other - self).planar().length()
    }

    /// Unit vector in the same direction, or zero for a (near) zero vector.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > f64::EPSILON {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    /// Whether every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Step from `self` toward `target` on the floor plane by at most
    /// `max_step`, keeping the current height. Never overshoots.
    pub fn step_towards_planar(self, target: Self, max_step: f64) -> Self {
        let delta = (target - self).planar();
        let dist = delta.length();
        if dist <= max_step || dist <= f64::EPSILON {
            return Self::new(target.x, self.y, target.z);
        }
        self + delta * (max_step / dist)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.1, 0.0);
        let b = Vec3::new(3.0, 5.0, 4.0);
        assert!((a.planar_distance(b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
        let n = Vec3::new(0.0, 0.0, -2.0).normalize_or_zero();
        assert_eq!(n, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn step_towards_does_not_overshoot() {
        let from = Vec3::new(0.0, 0.5, 0.0);
        let to = Vec3::new(1.0, 0.1, 0.0);
        let stepped = from.step_towards_planar(to, 10.0);
        assert_eq!(stepped, Vec3::new(1.0, 0.5, 0.0));

        let partial = from.step_towards_planar(to, 0.25);
        assert!((partial.x - 0.25).abs() < 1e-12);
        assert_eq!(partial.y, 0.5);
    }

    #[test]
    fn serializes_as_triple() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json, serde_json::json!([1.0, 2.0, 3.0]));
        let back: Vec3 = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }
}
