//! Unlit materials.

use std::any::Any;
use std::sync::Arc;

use glam::Vec4;
use lumen_core::{ControlType, Parameter, ParameterGroup, ParameterValue};

use crate::bindings::FragmentTextureIndex;
use crate::encoder::RenderEncoder;
use crate::pipeline::{Blending, ShaderProgram};
use crate::resources::Texture;

use super::{Material, MaterialCore, ShaderFactory, TextureSlots};

/// Flat color, no lighting.
pub struct BasicColorMaterial {
    core: MaterialCore,
}

impl ShaderFactory for BasicColorMaterial {
    const VERTEX_ENTRY: &'static str = "basic_color_vertex";
    const FRAGMENT_ENTRY: &'static str = "basic_color_fragment";
}

impl BasicColorMaterial {
    pub fn new(program: Arc<ShaderProgram>, color: Vec4) -> Self {
        let parameters = ParameterGroup::new("Basic Color").with(
            Parameter::new("Color", ParameterValue::Float4(color.to_array()))
                .with_control(ControlType::ColorPicker),
        );
        let shader = Self::create_shader("Basic Color", program);
        let mut core = MaterialCore::new("Basic Color", shader, parameters);
        if color.w < 1.0 {
            core.set_blending(Blending::Alpha);
        }
        Self { core }
    }

    pub fn color(&self) -> Vec4 {
        match self.core.parameters().get("Color") {
            Some(ParameterValue::Float4(color)) => Vec4::from_array(*color),
            _ => Vec4::ONE,
        }
    }

    pub fn set_color(&mut self, color: Vec4) {
        // Declared in `new` with the same type.
        let _ = self
            .core
            .set("Color", ParameterValue::Float4(color.to_array()));
    }

    pub fn set_blending(&mut self, blending: Blending) {
        self.core.set_blending(blending);
    }

    pub fn set_cast_shadow(&mut self, cast: bool) {
        self.core.set_cast_shadow(cast);
    }
}

impl Material for BasicColorMaterial {
    fn core(&self) -> &MaterialCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MaterialCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A 2D texture tinted by a color, no lighting.
pub struct BasicTextureMaterial {
    core: MaterialCore,
    textures: [(FragmentTextureIndex, Option<Arc<Texture>>); 1],
}

impl ShaderFactory for BasicTextureMaterial {
    const VERTEX_ENTRY: &'static str = "basic_texture_vertex";
    const FRAGMENT_ENTRY: &'static str = "basic_texture_fragment";
}

impl BasicTextureMaterial {
    pub fn new(program: Arc<ShaderProgram>, texture: Option<Arc<Texture>>) -> Self {
        if let Some(texture) = &texture {
            if texture.descriptor().is_3d() {
                log::warn!(
                    "BasicTextureMaterial: texture '{}' is not 2D and will not be bound",
                    texture.label().unwrap_or_default()
                );
            }
        }
        let texture = texture.filter(|t| !t.descriptor().is_3d());
        let parameters = ParameterGroup::new("Basic Texture")
            .with(
                Parameter::new("Color", ParameterValue::Float4([1.0; 4]))
                    .with_control(ControlType::ColorPicker),
            )
            .with(Parameter::new("Flipped", ParameterValue::Bool(false)));
        let shader = Self::create_shader("Basic Texture", program);
        Self {
            core: MaterialCore::new("Basic Texture", shader, parameters),
            textures: [(FragmentTextureIndex::BaseColor, texture)],
        }
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        let _ = self.core.set("Flipped", ParameterValue::Bool(flipped));
    }

    pub fn flipped(&self) -> bool {
        matches!(
            self.core.parameters().get("Flipped"),
            Some(ParameterValue::Bool(true))
        )
    }
}

impl TextureSlots for BasicTextureMaterial {
    fn texture_slots(&self) -> &[(FragmentTextureIndex, Option<Arc<Texture>>)] {
        &self.textures
    }

    fn texture_slots_mut(&mut self) -> &mut [(FragmentTextureIndex, Option<Arc<Texture>>)] {
        &mut self.textures
    }
}

impl Material for BasicTextureMaterial {
    fn core(&self) -> &MaterialCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut MaterialCore {
        &mut self.core
    }

    fn bind(&self, encoder: &mut RenderEncoder<'_>, shadow: bool) {
        if !shadow {
            self.bind_textures(encoder);
        }
        self.core.bind(encoder, shadow);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
