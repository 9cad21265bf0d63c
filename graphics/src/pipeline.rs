//! Shader programs and pipeline state objects.
//!
//! Shader code is an opaque, precompiled artifact. The renderer only knows
//! a program's label and the entry points it exports; specialisation
//! happens through preprocessor-style defines passed at pipeline creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::PipelineId;
use crate::types::TextureFormat;

/// A precompiled shader library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    label: String,
    bytes: Arc<[u8]>,
    entry_points: Vec<String>,
}

impl ShaderProgram {
    pub fn new(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
            entry_points: Vec::new(),
        }
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_points.push(name.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entry_points.iter().any(|e| e == name)
    }
}

/// Preprocessor defines used to specialise a program.
pub type ShaderDefines = BTreeMap<String, String>;

/// Color blending applied by a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Blending {
    #[default]
    Disabled,
    Alpha,
    Additive,
    Subtract,
}

/// Descriptor for [`GraphicsDevice::create_render_pipeline`](crate::GraphicsDevice::create_render_pipeline).
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: String,
    pub program: Arc<ShaderProgram>,
    pub vertex_entry: String,
    /// `None` for depth-only pipelines.
    pub fragment_entry: Option<String>,
    pub defines: ShaderDefines,
    pub color_format: Option<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub stencil_format: Option<TextureFormat>,
    pub sample_count: u32,
    pub vertex_amplification_count: u32,
    pub blending: Blending,
}

/// Descriptor for [`GraphicsDevice::create_compute_pipeline`](crate::GraphicsDevice::create_compute_pipeline).
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor {
    pub label: String,
    pub program: Arc<ShaderProgram>,
    pub entry: String,
    pub defines: ShaderDefines,
}

impl ComputePipelineDescriptor {
    pub fn new(label: impl Into<String>, program: Arc<ShaderProgram>, entry: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program,
            entry: entry.into(),
            defines: ShaderDefines::new(),
        }
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.defines.insert(name.into(), value.to_string());
        self
    }
}

/// A compiled render pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipeline {
    id: PipelineId,
    label: String,
}

impl RenderPipeline {
    pub(crate) fn new(id: PipelineId, label: String) -> Self {
        Self { id, label }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A compiled compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipeline {
    id: PipelineId,
    label: String,
    thread_execution_width: u32,
    max_total_threads_per_threadgroup: u32,
}

impl ComputePipeline {
    pub(crate) fn new(
        id: PipelineId,
        label: String,
        thread_execution_width: u32,
        max_total_threads_per_threadgroup: u32,
    ) -> Self {
        Self {
            id,
            label,
            thread_execution_width,
            max_total_threads_per_threadgroup,
        }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn thread_execution_width(&self) -> u32 {
        self.thread_execution_width
    }

    pub fn max_total_threads_per_threadgroup(&self) -> u32 {
        self.max_total_threads_per_threadgroup
    }
}

static_assertions::assert_impl_all!(RenderPipeline: Send, Sync);
static_assertions::assert_impl_all!(ComputePipeline: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_entry_points() {
        let program = ShaderProgram::new("Basic", vec![0u8; 4])
            .with_entry_point("basicVertex")
            .with_entry_point("basicFragment");
        assert!(program.has_entry_point("basicVertex"));
        assert!(!program.has_entry_point("missing"));
        assert_eq!(program.bytes().len(), 4);
    }

    #[test]
    fn test_compute_defines() {
        let program = Arc::new(ShaderProgram::new("Sim", vec![1u8]).with_entry_point("update"));
        let desc = ComputePipelineDescriptor::new("Sim Update", program, "update")
            .with_define("COUNT", 4);
        assert_eq!(desc.defines.get("COUNT").map(String::as_str), Some("4"));
    }
}
