//! Math type re-exports and helper functions.
//!
//! All rendering math is f32 and backed by `glam`. Projections use the
//! right-handed convention with a [0, 1] depth range.

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// Round `value` up to the next multiple of `alignment` (a power of two).
#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Integer ceil-division.
#[inline]
pub const fn div_ceil(value: u32, divisor: u32) -> u32 {
    value.div_ceil(divisor)
}

/// Normal matrix of a model matrix: inverse-transpose of its upper 3x3.
///
/// Degenerate matrices (zero scale on an axis) fall back to the plain
/// upper 3x3 so shading stays finite.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(*model);
    if upper.determinant().abs() <= f32::EPSILON {
        return upper;
    }
    upper.inverse().transpose()
}

/// Pad a 3x3 matrix into three 16-byte columns, the GPU uniform layout.
pub fn mat3_to_padded_cols(m: &Mat3) -> [[f32; 4]; 3] {
    [
        m.x_axis.extend(0.0).to_array(),
        m.y_axis.extend(0.0).to_array(),
        m.z_axis.extend(0.0).to_array(),
    ]
}

/// Right-handed perspective projection, `fov_y` in radians.
pub fn perspective_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y, aspect.max(f32::EPSILON), near, far)
}

/// Right-handed orthographic projection.
pub fn orthographic_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_rh(left, right, bottom, top, near, far)
}

/// Orientation that makes -Z point from `eye` towards `target`.
///
/// Returns identity when `eye == target`. Falls back to the Z axis as up
/// when `up` is parallel to the view direction.
pub fn look_rotation(eye: Vec3, target: Vec3, up: Vec3) -> Quat {
    let forward = (target - eye).normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let up = if forward.cross(up).length_squared() <= f32::EPSILON {
        Vec3::Z
    } else {
        up
    };
    let view = Mat4::look_to_rh(Vec3::ZERO, forward, up);
    Quat::from_mat4(&view.inverse()).normalize()
}

/// Approximate matrix equality, for tests and change detection.
pub fn mat4_approx_eq(a: &Mat4, b: &Mat4, epsilon: f32) -> bool {
    a.abs_diff_eq(*b, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(608, 256), 768);
    }

    #[test]
    fn test_div_ceil() {
        assert_eq!(div_ceil(512, 32), 16);
        assert_eq!(div_ceil(513, 32), 17);
        assert_eq!(div_ceil(1, 8), 1);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_rotation() {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.5),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let n = normal_matrix(&model);
        let dir = (n * Vec3::X).normalize();
        let expected = Quat::from_rotation_y(0.5) * Vec3::X;
        assert!(dir.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_normal_matrix_degenerate() {
        let model = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        let n = normal_matrix(&model);
        assert!(n.is_finite());
    }

    #[test]
    fn test_look_rotation_faces_target() {
        let q = look_rotation(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y);
        let forward = q * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn test_padded_cols() {
        let cols = mat3_to_padded_cols(&Mat3::IDENTITY);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(cols[2], [0.0, 0.0, 1.0, 0.0]);
    }
}
