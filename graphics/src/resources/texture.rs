//! GPU texture resource.

use std::sync::Arc;

use crate::backend::{GpuBackend, TextureId};
use crate::types::{Extent3d, TextureDescriptor, TextureFormat};

/// A GPU texture resource.
///
/// Textures are created by [`GraphicsDevice::create_texture`] and are
/// reference-counted.
///
/// [`GraphicsDevice::create_texture`]: crate::GraphicsDevice::create_texture
pub struct Texture {
    backend: Arc<dyn GpuBackend>,
    id: TextureId,
    descriptor: TextureDescriptor,
}

impl Texture {
    pub(crate) fn new(
        backend: Arc<dyn GpuBackend>,
        id: TextureId,
        descriptor: TextureDescriptor,
    ) -> Self {
        Self {
            backend,
            id,
            descriptor,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    pub fn size(&self) -> Extent3d {
        self.descriptor.size
    }

    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    pub fn depth(&self) -> u32 {
        self.descriptor.size.depth
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    pub fn sample_count(&self) -> u32 {
        self.descriptor.sample_count
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Whether this texture can serve as a `width`×`height` target with
    /// `sample_count` samples.
    pub fn matches_target(&self, width: u32, height: u32, sample_count: u32) -> bool {
        self.width() == width && self.height() == height && self.sample_count() == sample_count
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.backend.destroy_texture(self.id);
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("samples", &self.descriptor.sample_count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use crate::device::GraphicsDevice;
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    #[test]
    fn test_texture_accessors() {
        let device = GraphicsDevice::dummy();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    64,
                    32,
                    TextureFormat::Depth32Float,
                    TextureUsage::RENDER_ATTACHMENT,
                )
                .with_sample_count(4)
                .with_label("depth"),
            )
            .unwrap();
        assert_eq!(texture.width(), 64);
        assert_eq!(texture.height(), 32);
        assert_eq!(texture.depth(), 1);
        assert_eq!(texture.label(), Some("depth"));
        assert!(texture.matches_target(64, 32, 4));
        assert!(!texture.matches_target(64, 32, 1));
    }
}
