//! Shader specialisation and pipeline caching.
//!
//! A [`Shader`] pairs an opaque [`ShaderProgram`] with a set of
//! preprocessor defines and owns the pipelines built from them:
//! - a color pipeline for the main pass
//! - an optional depth-only pipeline for shadow passes
//!
//! Changing a define or the render context marks the shader for rebuild.
//! A failed rebuild is logged and recorded in [`Shader::last_error`]; the
//! previously built pipelines stay in use.

use std::sync::Arc;

use crate::error::GraphicsError;
use crate::pipeline::{
    Blending, RenderPipeline, RenderPipelineDescriptor, ShaderDefines, ShaderProgram,
};
use crate::renderer::context::PipelineKey;
use crate::renderer::RenderContext;
use crate::types::TextureFormat;

/// Set when the material is lit.
pub const DEFINE_LIGHTING: &str = "LIGHTING";
/// Length of the light array.
pub const DEFINE_MAX_LIGHTS: &str = "MAX_LIGHTS";
/// Set when the material receives shadows.
pub const DEFINE_HAS_SHADOWS: &str = "HAS_SHADOWS";
/// Length of the shadow arrays.
pub const DEFINE_SHADOW_COUNT: &str = "SHADOW_COUNT";
/// Set when per-instance matrices are bound.
pub const DEFINE_INSTANCING: &str = "INSTANCING";
/// Set on the depth-only variant.
pub const DEFINE_SHADOW_PASS: &str = "SHADOW_PASS";

/// Depth format of shadow maps.
pub const SHADOW_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// A specialised shader program and its pipelines.
pub struct Shader {
    label: String,
    program: Arc<ShaderProgram>,
    vertex_entry: String,
    fragment_entry: String,
    shadow_vertex_entry: Option<String>,
    defines: ShaderDefines,
    blending: Blending,
    needs_update: bool,
    built_for: Option<PipelineKey>,
    pipeline: Option<Arc<RenderPipeline>>,
    shadow_pipeline: Option<Arc<RenderPipeline>>,
    last_error: Option<GraphicsError>,
}

impl Shader {
    pub fn new(
        label: impl Into<String>,
        program: Arc<ShaderProgram>,
        vertex_entry: impl Into<String>,
        fragment_entry: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            program,
            vertex_entry: vertex_entry.into(),
            fragment_entry: fragment_entry.into(),
            shadow_vertex_entry: None,
            defines: ShaderDefines::new(),
            blending: Blending::Disabled,
            needs_update: true,
            built_for: None,
            pipeline: None,
            shadow_pipeline: None,
            last_error: None,
        }
    }

    /// Also build a depth-only pipeline from `entry`.
    pub fn with_shadow_entry(mut self, entry: impl Into<String>) -> Self {
        self.shadow_vertex_entry = Some(entry.into());
        self.needs_update = true;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    pub fn set_program(&mut self, program: Arc<ShaderProgram>) {
        self.program = program;
        self.needs_update = true;
    }

    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    pub fn define(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }

    /// Set a define. Marks the shader for rebuild when the value changes.
    pub fn set_define(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        if self.defines.get(name) != Some(&value) {
            self.defines.insert(name.to_string(), value);
            self.needs_update = true;
        }
    }

    pub fn remove_define(&mut self, name: &str) {
        if self.defines.remove(name).is_some() {
            self.needs_update = true;
        }
    }

    /// Set or clear a flag define.
    pub fn set_flag(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.set_define(name, 1);
        } else {
            self.remove_define(name);
        }
    }

    pub fn blending(&self) -> Blending {
        self.blending
    }

    pub fn set_blending(&mut self, blending: Blending) {
        if self.blending != blending {
            self.blending = blending;
            self.needs_update = true;
        }
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn pipeline(&self) -> Option<&Arc<RenderPipeline>> {
        self.pipeline.as_ref()
    }

    pub fn shadow_pipeline(&self) -> Option<&Arc<RenderPipeline>> {
        self.shadow_pipeline.as_ref()
    }

    /// Error of the most recent failed build, cleared by a successful one.
    pub fn last_error(&self) -> Option<&GraphicsError> {
        self.last_error.as_ref()
    }

    /// Rebuild the pipelines if the defines or the context changed.
    ///
    /// Compilation failures are logged and recorded; other device errors
    /// are returned.
    pub fn update(&mut self, context: &RenderContext) -> Result<(), GraphicsError> {
        let key = context.pipeline_key();
        if !self.needs_update && self.built_for == Some(key) {
            return Ok(());
        }
        self.needs_update = false;
        self.built_for = Some(key);

        match self.build(context) {
            Ok((pipeline, shadow_pipeline)) => {
                self.pipeline = Some(pipeline);
                self.shadow_pipeline = shadow_pipeline;
                self.last_error = None;
                Ok(())
            }
            Err(error @ GraphicsError::ShaderCompilationFailed { .. }) => {
                log::error!("Shader '{}': {}", self.label, error);
                self.last_error = Some(error);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn build(
        &self,
        context: &RenderContext,
    ) -> Result<(Arc<RenderPipeline>, Option<Arc<RenderPipeline>>), GraphicsError> {
        let descriptor = RenderPipelineDescriptor {
            label: self.label.clone(),
            program: self.program.clone(),
            vertex_entry: self.vertex_entry.clone(),
            fragment_entry: Some(self.fragment_entry.clone()),
            defines: self.defines.clone(),
            color_format: context.color_format,
            depth_format: context.depth_format,
            stencil_format: context.stencil_format,
            sample_count: context.sample_count,
            vertex_amplification_count: context.vertex_amplification_count,
            blending: self.blending,
        };
        let pipeline = context.device.create_render_pipeline(&descriptor)?;

        let shadow_pipeline = match &self.shadow_vertex_entry {
            Some(entry) => {
                let mut defines = self.defines.clone();
                defines.insert(DEFINE_SHADOW_PASS.to_string(), "1".to_string());
                let shadow = RenderPipelineDescriptor {
                    label: format!("{} Shadow", self.label),
                    vertex_entry: entry.clone(),
                    fragment_entry: None,
                    defines,
                    color_format: None,
                    depth_format: Some(SHADOW_DEPTH_FORMAT),
                    stencil_format: None,
                    sample_count: 1,
                    vertex_amplification_count: 1,
                    blending: Blending::Disabled,
                    ..descriptor
                };
                Some(context.device.create_render_pipeline(&shadow)?)
            }
            None => None,
        };

        log::debug!(
            "Shader '{}': built pipelines with {} defines",
            self.label,
            self.defines.len()
        );
        Ok((pipeline, shadow_pipeline))
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("program", &self.program.label())
            .field("defines", &self.defines)
            .field("needs_update", &self.needs_update)
            .field("last_error", &self.last_error)
            .finish()
    }
}
