//! Rigid transform (position + rotation)

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid transform: position and rotation, no scale.
///
/// Composition follows matrix convention: `(a * b).apply(p)` equals
/// `a.apply(b.apply(p))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in parent space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create from position and rotation.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Create a transform with just a position.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Create a transform with just a rotation.
    #[must_use]
    pub const fn from_rotation(rotation: Quat) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation,
        }
    }

    /// Transform a point.
    #[must_use]
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.position
    }

    /// The inverse transform, such that `t.inverse() * t` is identity.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: -(rotation * self.position),
            rotation,
        }
    }

    /// Get the equivalent transformation matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            position: self.apply(rhs.position),
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 0.001, "{a:?} != {b:?}");
    }

    #[test]
    fn test_apply_translation() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert_vec3_eq(t.apply(Vec3::ONE), Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_compose_order() {
        let rotate = Transform::from_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let translate = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));

        // translate * rotate applies the rotation first
        let p = (translate * rotate).apply(Vec3::new(1.0, 0.0, 0.0));
        assert_vec3_eq(p, Vec3::new(10.0, 0.0, -1.0));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = Transform::new(
            Vec3::new(3.0, -2.0, 5.0),
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7),
        );
        let identity = t.inverse() * t;
        assert_vec3_eq(identity.position, Vec3::ZERO);

        let p = Vec3::new(-4.0, 2.5, 9.0);
        assert_vec3_eq(t.inverse().apply(t.apply(p)), p);
    }

    #[test]
    fn test_matrix_matches_apply() {
        let t = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.5),
        );
        let p = Vec3::new(0.5, -1.0, 2.0);
        assert_vec3_eq(t.matrix().transform_point3(p), t.apply(p));
    }
}
