//! Local transform of a scene node.

use glam::{Mat4, Quat, Vec3};

use crate::math::look_rotation;

/// Position, orientation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local matrix: translation × rotation × scale.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// Decompose a matrix into a transform. Shear is lost.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, orientation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            orientation,
            scale,
        }
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotate by `rotation`, applied after the current orientation.
    pub fn rotate(&mut self, rotation: Quat) {
        self.orientation = (rotation * self.orientation).normalize();
    }

    /// Orient so that the local -Z axis points at `target`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.orientation = look_rotation(self.position, target, up);
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_trs_order() {
        let t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0))
            .with_scale(Vec3::splat(2.0))
            .with_orientation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let p = t.matrix().transform_point3(Vec3::X);
        // scale to (2,0,0), rotate to (0,2,0), translate to (1,2,0)
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_from_matrix_round_trip() {
        let t = Transform::from_position(Vec3::new(3.0, -1.0, 2.0))
            .with_scale(Vec3::new(1.0, 2.0, 3.0))
            .with_orientation(Quat::from_rotation_x(0.3));
        let back = Transform::from_matrix(&t.matrix());
        assert!(back.position.abs_diff_eq(t.position, 1e-5));
        assert!(back.scale.abs_diff_eq(t.scale, 1e-5));
    }

    #[test]
    fn test_look_at() {
        let mut t = Transform::from_position(Vec3::new(0.0, 0.0, 10.0));
        t.look_at(Vec3::ZERO, Vec3::Y);
        assert!(t.forward().abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }
}
