//! Command buffer recording.

use super::compute::{BlitEncoder, BlitPassRecord, ComputeEncoder, ComputePassRecord};
use super::pass_descriptor::{AttachmentRecord, RenderPassDescriptor};
use super::render::{RenderEncoder, RenderPassRecord};

/// A recorded pass.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedPass {
    Render(RenderPassRecord),
    Compute(ComputePassRecord),
    Blit(BlitPassRecord),
}

impl EncodedPass {
    pub fn as_render(&self) -> Option<&RenderPassRecord> {
        match self {
            Self::Render(pass) => Some(pass),
            _ => None,
        }
    }

    pub fn as_compute(&self) -> Option<&ComputePassRecord> {
        match self {
            Self::Compute(pass) => Some(pass),
            _ => None,
        }
    }

    pub fn as_blit(&self) -> Option<&BlitPassRecord> {
        match self {
            Self::Blit(pass) => Some(pass),
            _ => None,
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    pub fn is_compute(&self) -> bool {
        matches!(self, Self::Compute(_))
    }
}

/// An ordered list of passes, submitted as a unit.
///
/// Passes are appended in the order their encoders end, which is the order
/// the GPU executes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    label: String,
    passes: Vec<EncodedPass>,
    surface_lost: bool,
}

impl CommandBuffer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            passes: Vec::new(),
            surface_lost: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Mark the output surface as unavailable. Render encoders can no
    /// longer be opened on this buffer.
    pub fn mark_surface_lost(&mut self) {
        self.surface_lost = true;
    }

    pub fn is_surface_lost(&self) -> bool {
        self.surface_lost
    }

    /// Open a render pass. Returns `None` when the surface is unavailable or
    /// the descriptor has no attachment to render into.
    pub fn render_encoder(&mut self, descriptor: &RenderPassDescriptor) -> Option<RenderEncoder<'_>> {
        if self.surface_lost || !descriptor.has_attachments() {
            return None;
        }
        let record = RenderPassRecord {
            label: descriptor.label.clone(),
            color: AttachmentRecord::capture(
                &descriptor.color.texture,
                &descriptor.color.resolve_texture,
                descriptor.color.load_action,
                descriptor.color.store_action,
            ),
            depth: AttachmentRecord::capture(
                &descriptor.depth.texture,
                &descriptor.depth.resolve_texture,
                descriptor.depth.load_action,
                descriptor.depth.store_action,
            ),
            stencil: AttachmentRecord::capture(
                &descriptor.stencil.texture,
                &descriptor.stencil.resolve_texture,
                descriptor.stencil.load_action,
                descriptor.stencil.store_action,
            ),
            commands: Vec::new(),
        };
        Some(RenderEncoder::new(&mut self.passes, record))
    }

    pub fn compute_encoder(&mut self, label: impl Into<String>) -> Option<ComputeEncoder<'_>> {
        Some(ComputeEncoder::new(&mut self.passes, Some(label.into())))
    }

    pub fn blit_encoder(&mut self, label: impl Into<String>) -> Option<BlitEncoder<'_>> {
        Some(BlitEncoder::new(&mut self.passes, Some(label.into())))
    }

    pub fn passes(&self) -> &[EncodedPass] {
        &self.passes
    }

    pub fn render_passes(&self) -> impl Iterator<Item = &RenderPassRecord> {
        self.passes.iter().filter_map(EncodedPass::as_render)
    }

    pub fn compute_passes(&self) -> impl Iterator<Item = &ComputePassRecord> {
        self.passes.iter().filter_map(EncodedPass::as_compute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GraphicsDevice;
    use crate::types::{
        BufferDescriptor, CullMode, Extent3d, PrimitiveType, TextureDescriptor, TextureFormat,
        TextureUsage,
    };

    fn descriptor(device: &std::sync::Arc<GraphicsDevice>) -> RenderPassDescriptor {
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                16,
                16,
                TextureFormat::Bgra8Unorm,
                TextureUsage::RENDER_ATTACHMENT,
            ))
            .unwrap();
        RenderPassDescriptor::new().with_color_texture(texture)
    }

    #[test]
    fn test_encoders_append_in_order() {
        let device = GraphicsDevice::dummy();
        let desc = descriptor(&device);
        let mut commands = CommandBuffer::new("frame");

        {
            let encoder = commands.compute_encoder("sim").unwrap();
            encoder.end_encoding();
        }
        {
            let mut encoder = commands.render_encoder(&desc).unwrap();
            encoder.draw_primitives(PrimitiveType::Triangle, 0, 3, 1);
            encoder.end_encoding();
        }

        assert_eq!(commands.passes().len(), 2);
        assert!(commands.passes()[0].is_compute());
        assert!(commands.passes()[1].is_render());
        assert_eq!(commands.render_passes().next().unwrap().draw_count(), 1);
    }

    #[test]
    fn test_surface_lost_has_no_render_encoder() {
        let device = GraphicsDevice::dummy();
        let desc = descriptor(&device);
        let mut commands = CommandBuffer::new("frame");
        commands.mark_surface_lost();
        assert!(commands.render_encoder(&desc).is_none());
        assert!(commands.render_encoder(&RenderPassDescriptor::new()).is_none());
    }

    #[test]
    fn test_draw_calls_split_state() {
        let device = GraphicsDevice::dummy();
        let desc = descriptor(&device);
        let buffer = device.create_buffer(&BufferDescriptor::uniform(256)).unwrap();
        let mut commands = CommandBuffer::new("frame");
        {
            let mut encoder = commands.render_encoder(&desc).unwrap();
            encoder.set_fragment_buffer(&buffer, 0, 4);
            encoder.set_cull_mode(CullMode::Front);
            encoder.draw_primitives(PrimitiveType::Triangle, 0, 3, 1);
            encoder.set_cull_mode(CullMode::Back);
            encoder.draw_primitives(PrimitiveType::Triangle, 0, 3, 2);
        }
        let pass = commands.render_passes().next().unwrap();
        let calls = pass.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].fragment_buffers_at(4), vec![buffer.id()]);
        assert_eq!(calls[0].cull_mode(), Some(CullMode::Front));
        assert!(calls[1].fragment_buffers_at(4).is_empty());
        assert_eq!(calls[1].cull_mode(), Some(CullMode::Back));
        assert_eq!(calls[1].instance_count(), 2);
    }

    #[test]
    fn test_blit_copy_extent() {
        let device = GraphicsDevice::dummy();
        let a = device
            .create_texture(&TextureDescriptor::new_2d(8, 4, TextureFormat::Rgba8Unorm, TextureUsage::COPY_SRC))
            .unwrap();
        let b = device
            .create_texture(&TextureDescriptor::new_2d(4, 8, TextureFormat::Rgba8Unorm, TextureUsage::COPY_DST))
            .unwrap();
        let mut commands = CommandBuffer::new("copy");
        {
            let mut blit = commands.blit_encoder("copy").unwrap();
            blit.copy_texture(&a, &b);
        }
        let copies = &commands.passes()[0].as_blit().unwrap().copies;
        assert_eq!(copies[0].size, Extent3d::new_3d(4, 4, 1));
    }
}
