//! State shared by every material.

use lumen_core::{ParameterGroup, ParameterValue, PresetError};

use crate::bindings::{FragmentBufferIndex, VertexBufferIndex};
use crate::encoder::RenderEncoder;
use crate::error::GraphicsError;
use crate::pipeline::Blending;
use crate::renderer::RenderContext;
use crate::resources::UniformRing;
use crate::shader::{
    Shader, DEFINE_HAS_SHADOWS, DEFINE_INSTANCING, DEFINE_LIGHTING, DEFINE_MAX_LIGHTS,
    DEFINE_SHADOW_COUNT,
};
use crate::types::BufferUsage;

/// Shader, parameters, uniform ring and lighting configuration of a
/// material. Concrete materials embed one and expose it through
/// [`Material::core`](super::Material::core).
pub struct MaterialCore {
    label: String,
    shader: Shader,
    parameters: ParameterGroup,
    uniforms: Option<UniformRing>,
    uniform_offset: u64,
    lighting: bool,
    receive_shadow: bool,
    cast_shadow: bool,
    instancing: bool,
    light_count: usize,
    shadow_count: usize,
}

impl MaterialCore {
    pub fn new(label: impl Into<String>, shader: Shader, parameters: ParameterGroup) -> Self {
        Self {
            label: label.into(),
            shader,
            parameters,
            uniforms: None,
            uniform_offset: 0,
            lighting: false,
            receive_shadow: false,
            cast_shadow: false,
            instancing: false,
            light_count: 0,
            shadow_count: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut Shader {
        &mut self.shader
    }

    pub fn parameters(&self) -> &ParameterGroup {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterGroup {
        &mut self.parameters
    }

    /// Set a parameter by label.
    pub fn set(&mut self, label: &str, value: ParameterValue) -> Result<(), PresetError> {
        self.parameters.set(label, value)
    }

    pub fn lighting(&self) -> bool {
        self.lighting
    }

    pub fn set_lighting(&mut self, lighting: bool) {
        self.lighting = lighting;
    }

    pub fn receive_shadow(&self) -> bool {
        self.receive_shadow
    }

    pub fn set_receive_shadow(&mut self, receive: bool) {
        self.receive_shadow = receive;
    }

    pub fn cast_shadow(&self) -> bool {
        self.cast_shadow
    }

    pub fn set_cast_shadow(&mut self, cast: bool) {
        self.cast_shadow = cast;
    }

    pub fn blending(&self) -> Blending {
        self.shader.blending()
    }

    pub fn set_blending(&mut self, blending: Blending) {
        self.shader.set_blending(blending);
    }

    pub fn instancing(&self) -> bool {
        self.instancing
    }

    pub fn set_instancing(&mut self, instancing: bool) {
        self.instancing = instancing;
    }

    pub fn light_count(&self) -> usize {
        self.light_count
    }

    pub fn set_light_count(&mut self, count: usize) {
        self.light_count = count;
    }

    pub fn shadow_count(&self) -> usize {
        self.shadow_count
    }

    pub fn set_shadow_count(&mut self, count: usize) {
        self.shadow_count = count;
    }

    /// Byte offset of this frame's uniforms, if the material has any.
    pub fn uniform_offset(&self) -> Option<u64> {
        self.uniforms.as_ref().map(|_| self.uniform_offset)
    }

    pub fn uniform_ring(&self) -> Option<&UniformRing> {
        self.uniforms.as_ref()
    }

    /// Refresh defines, rebuild the shader if needed and upload this frame's
    /// parameter block.
    pub fn update(&mut self, context: &RenderContext) -> Result<(), GraphicsError> {
        self.apply_defines();
        self.shader.update(context)?;

        let size = self.parameters.uniform_size() as u64;
        if size == 0 {
            self.uniforms = None;
            return Ok(());
        }
        let reallocate = self
            .uniforms
            .as_ref()
            .map_or(true, |ring| ring.stride() < size);
        if reallocate {
            self.uniforms = Some(UniformRing::new(
                &context.device,
                size,
                1,
                BufferUsage::UNIFORM,
                &format!("{} Uniforms", self.label),
            )?);
        }
        if let Some(ring) = self.uniforms.as_mut() {
            ring.advance();
            self.uniform_offset = ring.write(0, &self.parameters.uniform_bytes())?;
        }
        Ok(())
    }

    /// Bind the pipeline and the uniform block.
    ///
    /// With `shadow` the depth-only pipeline is bound; a material without
    /// one binds nothing and the draw uses whatever pipeline is current.
    pub fn bind(&self, encoder: &mut RenderEncoder<'_>, shadow: bool) {
        let pipeline = if shadow {
            self.shader.shadow_pipeline()
        } else {
            self.shader.pipeline()
        };
        match pipeline {
            Some(pipeline) => encoder.set_render_pipeline(pipeline),
            None => log::trace!("MaterialCore '{}': no pipeline to bind", self.label),
        }

        if let Some(ring) = &self.uniforms {
            encoder.set_vertex_buffer(
                ring.buffer(),
                self.uniform_offset,
                VertexBufferIndex::MaterialUniforms.into(),
            );
            if !shadow {
                encoder.set_fragment_buffer(
                    ring.buffer(),
                    self.uniform_offset,
                    FragmentBufferIndex::MaterialUniforms.into(),
                );
            }
        }
    }

    fn apply_defines(&mut self) {
        let lighting = self.lighting;
        let shadows = self.receive_shadow && self.shadow_count > 0;
        let shader = &mut self.shader;

        shader.set_flag(DEFINE_LIGHTING, lighting);
        if lighting {
            shader.set_define(DEFINE_MAX_LIGHTS, self.light_count);
        } else {
            shader.remove_define(DEFINE_MAX_LIGHTS);
        }
        shader.set_flag(DEFINE_HAS_SHADOWS, shadows);
        if shadows {
            shader.set_define(DEFINE_SHADOW_COUNT, self.shadow_count);
        } else {
            shader.remove_define(DEFINE_SHADOW_COUNT);
        }
        shader.set_flag(DEFINE_INSTANCING, self.instancing);
    }
}

impl std::fmt::Debug for MaterialCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialCore")
            .field("label", &self.label)
            .field("shader", &self.shader)
            .field("parameters", &self.parameters.len())
            .field("lighting", &self.lighting)
            .field("receive_shadow", &self.receive_shadow)
            .field("cast_shadow", &self.cast_shadow)
            .field("light_count", &self.light_count)
            .field("shadow_count", &self.shadow_count)
            .finish()
    }
}
