//! Lit physically based material.

use std::any::Any;
use std::sync::Arc;

use glam::Vec4;
use lumen_core::{ControlType, Parameter, ParameterGroup, ParameterValue};

use crate::bindings::FragmentTextureIndex;
use crate::encoder::RenderEncoder;
use crate::pipeline::{Blending, ShaderProgram};
use crate::resources::Texture;

use super::{Material, MaterialCore, ShaderFactory, TextureSlots};

/// Metallic/roughness material lit by the scene lights, optionally
/// receiving shadows.
pub struct StandardMaterial {
    core: MaterialCore,
    textures: [(FragmentTextureIndex, Option<Arc<Texture>>); 5],
}

impl ShaderFactory for StandardMaterial {
    const VERTEX_ENTRY: &'static str = "standard_vertex";
    const FRAGMENT_ENTRY: &'static str = "standard_fragment";
}

fn unit(label: &str, value: f32) -> Parameter {
    Parameter::new(label, ParameterValue::Float(value))
        .with_range(ParameterValue::Float(0.0), ParameterValue::Float(1.0))
        .with_control(ControlType::Slider)
}

impl StandardMaterial {
    pub fn new(program: Arc<ShaderProgram>) -> Self {
        let parameters = ParameterGroup::new("Standard")
            .with(
                Parameter::new("Base Color", ParameterValue::Float4([1.0; 4]))
                    .with_control(ControlType::ColorPicker),
            )
            .with(
                Parameter::new("Emissive Color", ParameterValue::Float4([0.0; 4]))
                    .with_control(ControlType::ColorPicker),
            )
            .with(unit("Metallic", 1.0))
            .with(unit("Roughness", 1.0))
            .with(unit("Specular", 0.5))
            .with(unit("Occlusion", 1.0));

        let shader = Self::create_shader("Standard", program);
        let mut core = MaterialCore::new("Standard", shader, parameters);
        core.set_lighting(true);
        core.set_receive_shadow(true);
        core.set_cast_shadow(true);

        Self {
            core,
            textures: [
                (FragmentTextureIndex::BaseColor, None),
                (FragmentTextureIndex::Normal, None),
                (FragmentTextureIndex::Roughness, None),
                (FragmentTextureIndex::Metallic, None),
                (FragmentTextureIndex::Emissive, None),
            ],
        }
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.set_base_color(color);
        self
    }

    pub fn base_color(&self) -> Vec4 {
        match self.core.parameters().get("Base Color") {
            Some(ParameterValue::Float4(color)) => Vec4::from_array(*color),
            _ => Vec4::ONE,
        }
    }

    pub fn set_base_color(&mut self, color: Vec4) {
        let _ = self
            .core
            .set("Base Color", ParameterValue::Float4(color.to_array()));
    }

    pub fn set_emissive_color(&mut self, color: Vec4) {
        let _ = self
            .core
            .set("Emissive Color", ParameterValue::Float4(color.to_array()));
    }

    pub fn set_metallic(&mut self, value: f32) {
        let _ = self.core.set("Metallic", ParameterValue::Float(value));
    }

    pub fn set_roughness(&mut self, value: f32) {
        let _ = self.core.set("Roughness", ParameterValue::Float(value));
    }

    pub fn roughness(&self) -> f32 {
        match self.core.parameters().get("Roughness") {
            Some(ParameterValue::Float(value)) => *value,
            _ => 1.0,
        }
    }

    pub fn set_receive_shadow(&mut self, receive: bool) {
        self.core.set_receive_shadow(receive);
    }

    pub fn set_cast_shadow(&mut self, cast: bool) {
        self.core.set_cast_shadow(cast);
    }

    pub fn set_blending(&mut self, blending: Blending) {
        self.core.set_blending(blending);
    }
}

impl TextureSlots for StandardMaterial {
    fn texture_slots(&self) -> &[(FragmentTextureIndex, Option<Arc<Texture>>)] {
        &self.textures
    }

    fn texture_slots_mut(&mut self) -> &mut [(FragmentTextureIndex, Option<Arc<Texture>>)] {
        &mut self.textures
    }
}

impl Material for StandardMaterial {
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
