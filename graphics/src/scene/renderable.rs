//! The renderable facet of a scene node.

use std::any::Any;

use glam::{Mat4, Vec4};

use crate::encoder::RenderEncoder;
use crate::error::GraphicsError;
use crate::materials::Material;
use crate::renderer::RenderContext;
use crate::scene::Camera;
use crate::types::CullMode;

/// Something a scene node can draw.
///
/// The renderer drives a renderable in two phases each frame: the update
/// phase ([`update`](Self::update), then [`update_uniforms`](Self::update_uniforms)
/// once per view) may allocate and write GPU memory; the encode phase
/// ([`draw`](Self::draw)) only records commands and may run several times
/// per frame (shadow passes, double-sided draws) against the same uniforms.
pub trait Renderable: Any {
    fn label(&self) -> &str;

    /// Sort key used when the renderer sorts objects. Lower draws first.
    fn render_order(&self) -> i32 {
        0
    }

    /// [`CullMode::None`] means double sided.
    fn cull_mode(&self) -> CullMode {
        CullMode::Back
    }

    /// True when no material blends.
    fn opaque(&self) -> bool {
        self.materials().iter().all(|m| m.opaque())
    }

    fn cast_shadow(&self) -> bool {
        false
    }

    fn receive_shadow(&self) -> bool {
        false
    }

    /// Whether the renderable has anything to draw this frame.
    fn drawable(&self) -> bool;

    fn materials(&self) -> Vec<&dyn Material>;

    fn materials_mut(&mut self) -> Vec<&mut (dyn Material + 'static)>;

    /// Allocate or refresh GPU resources for the current world transform.
    fn update(&mut self, context: &RenderContext, world: &Mat4) -> Result<(), GraphicsError>;

    /// Write camera dependent uniforms for one view.
    fn update_uniforms(
        &mut self,
        world: &Mat4,
        camera: &Camera,
        viewport: Vec4,
        amplification_index: u32,
    ) -> Result<(), GraphicsError>;

    /// Record the draw calls. `shadow` selects the depth-only variant.
    fn draw(&self, encoder: &mut RenderEncoder<'_>, cull_mode: CullMode, shadow: bool);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
