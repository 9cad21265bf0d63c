//! Material traits.
//!
//! A material is a [`MaterialCore`] plus whatever capabilities its concrete
//! type composes in:
//! - [`ShaderFactory`] - knows the entry points of its program
//! - [`TextureSlots`] - binds fragment textures

use std::any::Any;
use std::sync::Arc;

use lumen_core::{ParameterGroup, PresetError};

use crate::bindings::FragmentTextureIndex;
use crate::encoder::RenderEncoder;
use crate::error::GraphicsError;
use crate::pipeline::{Blending, ShaderProgram};
use crate::renderer::RenderContext;
use crate::resources::Texture;
use crate::shader::Shader;

use super::MaterialCore;

/// The contract the renderer drives materials through.
pub trait Material: Any {
    fn core(&self) -> &MaterialCore;

    fn core_mut(&mut self) -> &mut MaterialCore;

    fn label(&self) -> &str {
        self.core().label()
    }

    /// Whether the material reads the light buffer.
    fn lighting(&self) -> bool {
        self.core().lighting()
    }

    fn receive_shadow(&self) -> bool {
        self.core().receive_shadow()
    }

    fn cast_shadow(&self) -> bool {
        self.core().cast_shadow()
    }

    fn blending(&self) -> Blending {
        self.core().blending()
    }

    fn opaque(&self) -> bool {
        self.blending() == Blending::Disabled
    }

    fn set_light_count(&mut self, count: usize) {
        self.core_mut().set_light_count(count);
    }

    fn set_shadow_count(&mut self, count: usize) {
        self.core_mut().set_shadow_count(count);
    }

    fn set_instancing(&mut self, instancing: bool) {
        self.core_mut().set_instancing(instancing);
    }

    fn shader(&self) -> &Shader {
        self.core().shader()
    }

    fn parameters(&self) -> &ParameterGroup {
        self.core().parameters()
    }

    fn parameters_mut(&mut self) -> &mut ParameterGroup {
        self.core_mut().parameters_mut()
    }

    /// Prepare pipelines and uniforms for this frame.
    fn update(&mut self, context: &RenderContext) -> Result<(), GraphicsError> {
        self.core_mut().update(context)
    }

    /// Record this material's bindings.
    fn bind(&self, encoder: &mut RenderEncoder<'_>, shadow: bool) {
        self.core().bind(encoder, shadow);
    }

    /// Serialize the parameter values as a RON preset.
    fn save_preset(&self) -> Result<String, PresetError> {
        self.parameters().save_preset()
    }

    /// Apply a RON preset; returns the number of values applied.
    fn load_preset(&mut self, document: &str) -> Result<usize, PresetError> {
        self.parameters_mut().load_preset(document)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A material type that knows how to turn a program into its shader.
pub trait ShaderFactory {
    const VERTEX_ENTRY: &'static str;
    const FRAGMENT_ENTRY: &'static str;
    /// Depth-only entry for shadow passes.
    const SHADOW_ENTRY: Option<&'static str> = Some("shadow_vertex");

    fn create_shader(label: &str, program: Arc<ShaderProgram>) -> Shader {
        let shader = Shader::new(label, program, Self::VERTEX_ENTRY, Self::FRAGMENT_ENTRY);
        match Self::SHADOW_ENTRY {
            Some(entry) => shader.with_shadow_entry(entry),
            None => shader,
        }
    }
}

/// A material with fragment texture slots.
pub trait TextureSlots {
    fn texture_slots(&self) -> &[(FragmentTextureIndex, Option<Arc<Texture>>)];

    fn texture_slots_mut(&mut self) -> &mut [(FragmentTextureIndex, Option<Arc<Texture>>)];

    fn texture(&self, slot: FragmentTextureIndex) -> Option<&Arc<Texture>> {
        self.texture_slots()
            .iter()
            .find(|(index, _)| *index == slot)
            .and_then(|(_, texture)| texture.as_ref())
    }

    /// Assign a texture. Returns false if the material has no such slot.
    fn set_texture(&mut self, slot: FragmentTextureIndex, texture: Option<Arc<Texture>>) -> bool {
        match self
            .texture_slots_mut()
            .iter_mut()
            .find(|(index, _)| *index == slot)
        {
            Some((_, current)) => {
                *current = texture;
                true
            }
            None => false,
        }
    }

    fn bind_textures(&self, encoder: &mut RenderEncoder<'_>) {
        for (slot, texture) in self.texture_slots() {
            if let Some(texture) = texture {
                encoder.set_fragment_texture(texture, (*slot).into());
            }
        }
    }
}
