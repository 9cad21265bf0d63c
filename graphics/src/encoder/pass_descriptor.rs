//! Render pass attachments.

use std::sync::Arc;

use crate::backend::TextureId;
use crate::resources::Texture;
use crate::types::{ClearColor, LoadAction, StoreAction};

/// Color attachment of a render pass.
#[derive(Debug, Clone, Default)]
pub struct ColorAttachment {
    pub texture: Option<Arc<Texture>>,
    /// Single-sampled target the multisampled texture resolves into.
    pub resolve_texture: Option<Arc<Texture>>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_color: ClearColor,
}

/// Depth attachment of a render pass.
#[derive(Debug, Clone)]
pub struct DepthAttachment {
    pub texture: Option<Arc<Texture>>,
    pub resolve_texture: Option<Arc<Texture>>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_depth: f64,
}

impl Default for DepthAttachment {
    fn default() -> Self {
        Self {
            texture: None,
            resolve_texture: None,
            load_action: LoadAction::Clear,
            store_action: StoreAction::DontCare,
            clear_depth: 1.0,
        }
    }
}

/// Stencil attachment of a render pass.
#[derive(Debug, Clone)]
pub struct StencilAttachment {
    pub texture: Option<Arc<Texture>>,
    pub resolve_texture: Option<Arc<Texture>>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_stencil: u32,
}

impl Default for StencilAttachment {
    fn default() -> Self {
        Self {
            texture: None,
            resolve_texture: None,
            load_action: LoadAction::Clear,
            store_action: StoreAction::DontCare,
            clear_stencil: 0,
        }
    }
}

/// Attachments and actions of one render pass.
///
/// Typically supplied by the host view each frame with the drawable's
/// texture as the color attachment.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color: ColorAttachment,
    pub depth: DepthAttachment,
    pub stencil: StencilAttachment,
    pub render_target_width: u32,
    pub render_target_height: u32,
}

impl RenderPassDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor rendering into `texture`, sized to it.
    pub fn with_color_texture(mut self, texture: Arc<Texture>) -> Self {
        self.render_target_width = texture.width();
        self.render_target_height = texture.height();
        self.color.texture = Some(texture);
        self
    }

    pub fn with_depth_texture(mut self, texture: Arc<Texture>) -> Self {
        self.depth.texture = Some(texture);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn has_attachments(&self) -> bool {
        self.color.texture.is_some() || self.depth.texture.is_some() || self.stencil.texture.is_some()
    }
}

/// Attachment state captured when a render pass was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub texture: TextureId,
    pub resolve_texture: Option<TextureId>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub sample_count: u32,
}

impl AttachmentRecord {
    pub(crate) fn capture(
        texture: &Option<Arc<Texture>>,
        resolve: &Option<Arc<Texture>>,
        load_action: LoadAction,
        store_action: StoreAction,
    ) -> Option<Self> {
        texture.as_ref().map(|t| Self {
            texture: t.id(),
            resolve_texture: resolve.as_ref().map(|r| r.id()),
            load_action,
            store_action,
            sample_count: t.sample_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GraphicsDevice;
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    #[test]
    fn test_descriptor_attachments() {
        let device = GraphicsDevice::dummy();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                320,
                200,
                TextureFormat::Bgra8Unorm,
                TextureUsage::RENDER_ATTACHMENT,
            ))
            .unwrap();
        let empty = RenderPassDescriptor::new();
        assert!(!empty.has_attachments());

        let desc = RenderPassDescriptor::new().with_color_texture(texture.clone());
        assert!(desc.has_attachments());
        assert_eq!(desc.render_target_width, 320);

        let record = AttachmentRecord::capture(
            &desc.color.texture,
            &None,
            LoadAction::Clear,
            StoreAction::Store,
        )
        .unwrap();
        assert_eq!(record.texture, texture.id());
        assert_eq!(record.sample_count, 1);
    }
}
