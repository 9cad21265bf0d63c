//! Per-object camera uniforms.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use lumen_core::math::{mat3_to_padded_cols, normal_matrix};

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, UniformRing};
use crate::scene::Camera;
use crate::types::BufferUsage;

/// Uniform block read by every vertex shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VertexUniforms {
    pub model_matrix: Mat4,
    pub view_matrix: Mat4,
    pub model_view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_projection_matrix: Mat4,
    pub model_view_projection_matrix: Mat4,
    pub inverse_model_view_projection_matrix: Mat4,
    pub inverse_view_matrix: Mat4,
    pub normal_matrix: [[f32; 4]; 3],
    pub viewport: Vec4,
    pub world_camera_position: Vec4,
    pub world_camera_view_direction: Vec4,
}

impl VertexUniforms {
    pub fn new(model: &Mat4, camera: &Camera, viewport: Vec4) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        let model_view = view * *model;
        let model_view_projection = projection * model_view;
        Self {
            model_matrix: *model,
            view_matrix: view,
            model_view_matrix: model_view,
            projection_matrix: projection,
            view_projection_matrix: projection * view,
            model_view_projection_matrix: model_view_projection,
            inverse_model_view_projection_matrix: model_view_projection.inverse(),
            inverse_view_matrix: camera.world_matrix(),
            normal_matrix: mat3_to_padded_cols(&normal_matrix(model)),
            viewport,
            world_camera_position: camera.world_position().extend(1.0),
            world_camera_view_direction: camera.view_direction().extend(0.0),
        }
    }
}

/// Ring-buffered [`VertexUniforms`] of one renderable.
///
/// One slot per view when rendering with vertex amplification.
pub struct VertexUniformBuffer {
    ring: UniformRing,
    amplification_count: u32,
    offset: u64,
}

impl VertexUniformBuffer {
    /// Allocate `aligned(size) × MAX_FRAMES_IN_FLIGHT × amplification_count`
    /// bytes.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        amplification_count: u32,
        label: &str,
    ) -> Result<Self, GraphicsError> {
        let amplification_count = amplification_count.max(1);
        let ring = UniformRing::new(
            device,
            std::mem::size_of::<VertexUniforms>() as u64,
            amplification_count,
            BufferUsage::UNIFORM,
            &format!("{label} Vertex Uniforms"),
        )?;
        Ok(Self {
            ring,
            amplification_count,
            offset: 0,
        })
    }

    /// Compute and upload the uniforms for `model` seen from `camera`.
    ///
    /// View 0 starts a new frame region; further views of the same frame
    /// write into their slots of that region. Returns the byte offset of the
    /// slot written, also available from [`offset`](Self::offset) until the
    /// next call.
    pub fn update(
        &mut self,
        model: &Mat4,
        camera: &Camera,
        viewport: Vec4,
        amplification_index: u32,
    ) -> Result<u64, GraphicsError> {
        assert!(
            amplification_index < self.amplification_count,
            "amplification index {amplification_index} out of range (count {})",
            self.amplification_count
        );
        if amplification_index == 0 || self.ring.advances() == 0 {
            self.ring.advance();
        }
        let uniforms = VertexUniforms::new(model, camera, viewport);
        self.offset = self
            .ring
            .write(amplification_index, bytemuck::bytes_of(&uniforms))?;
        Ok(self.offset)
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        self.ring.buffer()
    }

    /// Offset of the slot most recently written.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Offset of view 0 of the current frame. Amplified draws bind this and
    /// index the views from it.
    pub fn binding_offset(&self) -> u64 {
        self.ring.slot_offset(0)
    }

    /// Aligned size of one slot.
    pub fn stride(&self) -> u64 {
        self.ring.stride()
    }

    pub fn amplification_count(&self) -> u32 {
        self.amplification_count
    }
}

impl std::fmt::Debug for VertexUniformBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexUniformBuffer")
            .field("amplification_count", &self.amplification_count)
            .field("offset", &self.offset)
            .field("ring", &self.ring)
            .finish()
    }
}
