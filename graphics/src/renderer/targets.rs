//! Render targets the renderer allocates when the caller supplies none.

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

/// Lazily allocated color, depth and stencil targets.
///
/// A target is reused while its size, sample count and format still match
/// and reallocated otherwise.
#[derive(Debug, Default)]
pub struct RenderTargets {
    pub(crate) color: Option<Arc<Texture>>,
    pub(crate) color_multisample: Option<Arc<Texture>>,
    pub(crate) depth: Option<Arc<Texture>>,
    pub(crate) depth_multisample: Option<Arc<Texture>>,
    pub(crate) stencil: Option<Arc<Texture>>,
}

/// Size and format a target must have.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TargetSpec<'a> {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub sample_count: u32,
    pub label: &'a str,
}

impl RenderTargets {
    pub fn color(&self) -> Option<&Arc<Texture>> {
        self.color.as_ref()
    }

    pub fn color_multisample(&self) -> Option<&Arc<Texture>> {
        self.color_multisample.as_ref()
    }

    pub fn depth(&self) -> Option<&Arc<Texture>> {
        self.depth.as_ref()
    }

    pub fn depth_multisample(&self) -> Option<&Arc<Texture>> {
        self.depth_multisample.as_ref()
    }

    pub fn stencil(&self) -> Option<&Arc<Texture>> {
        self.stencil.as_ref()
    }

    /// Drop every target so the next frame reallocates.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}

/// Return the texture in `slot`, reallocating it if it does not match
/// `spec`.
pub(crate) fn ensure_target(
    slot: &mut Option<Arc<Texture>>,
    device: &Arc<GraphicsDevice>,
    spec: TargetSpec<'_>,
) -> Result<Arc<Texture>, GraphicsError> {
    if let Some(texture) = slot.as_ref() {
        if texture.matches_target(spec.width, spec.height, spec.sample_count)
            && texture.format() == spec.format
        {
            return Ok(Arc::clone(texture));
        }
    }
    let descriptor = TextureDescriptor::new_2d(
        spec.width,
        spec.height,
        spec.format,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::SHADER_READ,
    )
    .with_sample_count(spec.sample_count)
    .with_label(spec.label);
    let texture = device.create_texture(&descriptor)?;
    log::debug!(
        "RenderTargets: allocated '{}' {}x{} ({} samples)",
        spec.label,
        spec.width,
        spec.height,
        spec.sample_count
    );
    *slot = Some(Arc::clone(&texture));
    Ok(texture)
}
