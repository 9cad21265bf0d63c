//! The light facet of a scene node.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use lumen_core::ChangeCounter;

use super::Shadow;

/// Kind of a light and its type-specific settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel rays along the light's -Z axis.
    Directional,
    /// Omnidirectional, fading out at `radius`.
    Point { radius: f32 },
    /// Cone along the light's -Z axis. Angles are half-angles in degrees.
    Spot {
        radius: f32,
        inner_angle: f32,
        outer_angle: f32,
    },
}

impl LightKind {
    /// Tag written into [`LightData::position`]`.w`.
    pub fn type_index(&self) -> u32 {
        match self {
            Self::Directional => 0,
            Self::Point { .. } => 1,
            Self::Spot { .. } => 2,
        }
    }

    pub fn supports_shadows(&self) -> bool {
        !matches!(self, Self::Point { .. })
    }
}

/// Packed per-light record read by lit shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightData {
    /// rgb, intensity
    pub color: Vec4,
    /// world position, type
    pub position: Vec4,
    /// world direction, inverse radius
    pub direction: Vec4,
    /// spot scale, spot offset, cos inner, cos outer
    pub spot_info: Vec4,
}

/// A light attached to a scene node.
///
/// Color, intensity, kind and shadow toggles bump [`Light::changes`];
/// transform changes are tracked by the owning node's revision. The packed
/// [`LightData`] is always derived from the world matrix passed in, never
/// cached.
#[derive(Debug)]
pub struct Light {
    kind: LightKind,
    color: Vec3,
    intensity: f32,
    cast_shadow: bool,
    shadow: Option<Shadow>,
    changes: ChangeCounter,
}

impl Light {
    pub fn new(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self {
            kind,
            color,
            intensity,
            cast_shadow: false,
            shadow: None,
            changes: ChangeCounter::new(),
        }
    }

    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self::new(LightKind::Directional, color, intensity)
    }

    pub fn point(color: Vec3, intensity: f32, radius: f32) -> Self {
        Self::new(LightKind::Point { radius }, color, intensity)
    }

    pub fn spot(color: Vec3, intensity: f32, radius: f32, inner_angle: f32, outer_angle: f32) -> Self {
        Self::new(
            LightKind::Spot {
                radius,
                inner_angle,
                outer_angle,
            },
            color,
            intensity,
        )
    }

    pub fn with_cast_shadow(mut self, cast: bool) -> Self {
        self.set_cast_shadow(cast);
        self
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: LightKind) {
        if self.kind == kind {
            return;
        }
        self.kind = kind;
        if self.cast_shadow {
            self.shadow = None;
            self.ensure_shadow();
        }
        self.changes.bump();
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        if self.color != color {
            self.color = color;
            self.changes.bump();
        }
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        if self.intensity != intensity {
            self.intensity = intensity;
            self.changes.bump();
        }
    }

    /// Whether the light casts shadows. Always false for point lights.
    pub fn cast_shadow(&self) -> bool {
        self.cast_shadow && self.shadow.is_some()
    }

    /// Enable shadow casting. The [`Shadow`] is created the first time.
    pub fn set_cast_shadow(&mut self, cast: bool) {
        self.cast_shadow = cast;
        if cast {
            self.ensure_shadow();
        }
        self.changes.bump();
    }

    pub fn shadow(&self) -> Option<&Shadow> {
        self.shadow.as_ref()
    }

    pub fn shadow_mut(&mut self) -> Option<&mut Shadow> {
        self.shadow.as_mut()
    }

    pub fn changes(&self) -> &ChangeCounter {
        &self.changes
    }

    /// Pack the light for a node at `world`.
    pub fn data(&self, world: &Mat4) -> LightData {
        let position = world.w_axis.truncate();
        let direction = world.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        let (inverse_radius, spot_info) = match self.kind {
            LightKind::Directional => (0.0, Vec4::ZERO),
            LightKind::Point { radius } => (inverse(radius), Vec4::ZERO),
            LightKind::Spot {
                radius,
                inner_angle,
                outer_angle,
            } => {
                let cos_inner = inner_angle.to_radians().cos();
                let cos_outer = outer_angle.to_radians().cos();
                let scale = 1.0 / (cos_inner - cos_outer).max(1e-4);
                let offset = -cos_outer * scale;
                (
                    inverse(radius),
                    Vec4::new(scale, offset, cos_inner, cos_outer),
                )
            }
        };
        LightData {
            color: self.color.extend(self.intensity),
            position: position.extend(self.kind.type_index() as f32),
            direction: direction.extend(inverse_radius),
            spot_info,
        }
    }

    fn ensure_shadow(&mut self) {
        if self.shadow.is_some() {
            return;
        }
        self.shadow = match self.kind {
            LightKind::Directional => Some(Shadow::directional()),
            LightKind::Spot {
                radius,
                outer_angle,
                ..
            } => Some(Shadow::spot(outer_angle, radius)),
            LightKind::Point { .. } => {
                log::warn!("Light: point light shadows are not supported");
                None
            }
        };
    }
}

fn inverse(radius: f32) -> f32 {
    if radius > 0.0 {
        1.0 / radius
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use lumen_core::ChangeCursor;

    #[test]
    fn test_data_layout() {
        assert_eq!(std::mem::size_of::<LightData>(), 64);
    }

    #[test]
    fn test_directional_data_follows_world() {
        let light = Light::directional(Vec3::ONE, 2.0);
        let world = Mat4::from_rotation_translation(
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 5.0, 0.0),
        );
        let data = light.data(&world);
        assert_eq!(data.color, Vec4::new(1.0, 1.0, 1.0, 2.0));
        assert_eq!(data.position.w, 0.0);
        assert!((data.direction.truncate() - Vec3::NEG_Y).length() < 1e-5);
        assert_eq!(data.direction.w, 0.0);
    }

    #[test]
    fn test_spot_info() {
        let light = Light::spot(Vec3::ONE, 1.0, 10.0, 20.0, 30.0);
        let data = light.data(&Mat4::IDENTITY);
        assert_eq!(data.position.w, 2.0);
        assert!((data.direction.w - 0.1).abs() < 1e-6);
        let cos_outer = 30f32.to_radians().cos();
        // Full intensity inside the inner cone, zero at the outer edge.
        assert!((cos_outer * data.spot_info.x + data.spot_info.y).abs() < 1e-4);
    }

    #[test]
    fn test_changes_fire_on_color_and_intensity() {
        let mut light = Light::directional(Vec3::ONE, 1.0);
        let mut cursor = ChangeCursor::observing(light.changes());
        light.set_color(Vec3::ONE);
        assert!(!cursor.consume(light.changes()));
        light.set_color(Vec3::X);
        assert!(cursor.consume(light.changes()));
        light.set_intensity(3.0);
        assert!(cursor.consume(light.changes()));
    }

    #[test]
    fn test_shadow_created_lazily() {
        let mut light = Light::directional(Vec3::ONE, 1.0);
        assert!(light.shadow().is_none());
        light.set_cast_shadow(true);
        assert!(light.cast_shadow());
        assert!(light.shadow().is_some());
    }

    #[test]
    fn test_point_light_has_no_shadow() {
        let light = Light::point(Vec3::ONE, 1.0, 5.0).with_cast_shadow(true);
        assert!(!light.cast_shadow());
        assert!(light.shadow().is_none());
    }
}
