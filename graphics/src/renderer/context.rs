//! Output configuration shared by everything that builds pipelines.

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::TextureFormat;

/// Formats and sample counts of the pass a renderer draws into.
///
/// Pipelines are specialised against a context; changing it (through
/// [`Renderer::set_context`](crate::renderer::Renderer::set_context))
/// rebuilds pipelines and render targets lazily on the next frame.
#[derive(Clone)]
pub struct RenderContext {
    pub device: Arc<GraphicsDevice>,
    pub sample_count: u32,
    pub color_format: Option<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub stencil_format: Option<TextureFormat>,
    pub vertex_amplification_count: u32,
}

impl RenderContext {
    /// Single sampled BGRA color with a 32-bit depth buffer.
    pub fn new(device: Arc<GraphicsDevice>) -> Self {
        Self {
            device,
            sample_count: 1,
            color_format: Some(TextureFormat::Bgra8Unorm),
            depth_format: Some(TextureFormat::Depth32Float),
            stencil_format: None,
            vertex_amplification_count: 1,
        }
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_color_format(mut self, format: Option<TextureFormat>) -> Self {
        self.color_format = format;
        self
    }

    pub fn with_depth_format(mut self, format: Option<TextureFormat>) -> Self {
        self.depth_format = format;
        self
    }

    pub fn with_stencil_format(mut self, format: Option<TextureFormat>) -> Self {
        self.stencil_format = format;
        self
    }

    pub fn with_vertex_amplification_count(mut self, count: u32) -> Self {
        self.vertex_amplification_count = count;
        self
    }

    /// Check the configuration against the device limits.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        let caps = self.device.capabilities();
        if self.sample_count == 0
            || !self.sample_count.is_power_of_two()
            || self.sample_count > caps.max_color_sample_count
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "unsupported sample count {}",
                self.sample_count
            )));
        }
        if self.vertex_amplification_count == 0
            || self.vertex_amplification_count > caps.max_vertex_amplification_count
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "unsupported vertex amplification count {}",
                self.vertex_amplification_count
            )));
        }
        if let Some(format) = self.depth_format {
            if !format.has_depth() {
                return Err(GraphicsError::InvalidParameter(format!(
                    "{format:?} is not a depth format"
                )));
            }
        }
        if let Some(format) = self.stencil_format {
            if !format.has_stencil() {
                return Err(GraphicsError::InvalidParameter(format!(
                    "{format:?} is not a stencil format"
                )));
            }
        }
        Ok(())
    }

    /// Key identifying pipeline compatibility.
    pub(crate) fn pipeline_key(&self) -> PipelineKey {
        PipelineKey {
            sample_count: self.sample_count,
            color_format: self.color_format,
            depth_format: self.depth_format,
            stencil_format: self.stencil_format,
            vertex_amplification_count: self.vertex_amplification_count,
        }
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("device", &self.device.name())
            .field("sample_count", &self.sample_count)
            .field("color_format", &self.color_format)
            .field("depth_format", &self.depth_format)
            .field("stencil_format", &self.stencil_format)
            .field("vertex_amplification_count", &self.vertex_amplification_count)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub sample_count: u32,
    pub color_format: Option<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub stencil_format: Option<TextureFormat>,
    pub vertex_amplification_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let context = RenderContext::new(GraphicsDevice::dummy());
        assert!(context.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sample_count() {
        let context = RenderContext::new(GraphicsDevice::dummy()).with_sample_count(3);
        assert!(matches!(
            context.validate(),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_color_format_as_depth() {
        let context = RenderContext::new(GraphicsDevice::dummy())
            .with_depth_format(Some(TextureFormat::Rgba8Unorm));
        assert!(context.validate().is_err());
    }

    #[test]
    fn test_pipeline_key_tracks_formats() {
        let device = GraphicsDevice::dummy();
        let a = RenderContext::new(device.clone());
        let b = RenderContext::new(device).with_sample_count(4);
        assert_ne!(a.pipeline_key(), b.pipeline_key());
    }
}
