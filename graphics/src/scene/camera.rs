//! Cameras.

use glam::{Mat4, Quat, Vec3};
use lumen_core::math::{orthographic_rh, perspective_rh};
use lumen_core::Transform;

/// Projection of a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees.
        fov_y: f32,
        aspect: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
}

/// A viewpoint with a projection.
///
/// Cameras are free-standing: their transform is already in world space.
/// The view matrix is the inverse of [`world_matrix`](Self::world_matrix).
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    label: String,
    transform: Transform,
    projection: Projection,
    near: f32,
    far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(45.0, 0.01, 100.0)
    }
}

impl Camera {
    pub fn perspective(fov_y: f32, near: f32, far: f32) -> Self {
        Self {
            label: "Perspective Camera".to_string(),
            transform: Transform::IDENTITY,
            projection: Projection::Perspective { fov_y, aspect: 1.0 },
            near,
            far,
        }
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self {
            label: "Orthographic Camera".to_string(),
            transform: Transform::IDENTITY,
            projection: Projection::Orthographic {
                left,
                right,
                bottom,
                top,
            },
            near,
            far,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.transform.orientation = orientation;
    }

    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.transform.look_at(target, up);
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Per-frame update: perspective cameras follow the output aspect ratio.
    pub fn update(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = &mut self.projection {
            *a = aspect;
        }
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y, aspect } => {
                perspective_rh(fov_y.to_radians(), aspect, self.near, self.far)
            }
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
            } => orthographic_rh(left, right, bottom, top, self.near, self.far),
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn world_position(&self) -> Vec3 {
        self.transform.position
    }

    /// Unit vector the camera looks along.
    pub fn view_direction(&self) -> Vec3 {
        self.transform.forward()
    }
}
