//! Per-instance model and normal matrices for instanced draws.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use lumen_core::math::{mat3_to_padded_cols, normal_matrix};

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, StructBuffer};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceMatrixUniforms {
    pub model_matrix: Mat4,
    pub normal_matrix: [[f32; 4]; 3],
}

impl InstanceMatrixUniforms {
    /// Uniforms for one instance placed at `instance` inside `world`.
    pub fn new(world: &Mat4, instance: &Mat4) -> Self {
        let model = *world * *instance;
        Self {
            model_matrix: model,
            normal_matrix: mat3_to_padded_cols(&normal_matrix(&model)),
        }
    }
}

/// Ring-buffered array of [`InstanceMatrixUniforms`], one per instance.
#[derive(Debug)]
pub struct InstanceMatrixUniformBuffer {
    inner: StructBuffer<InstanceMatrixUniforms>,
    scratch: Vec<InstanceMatrixUniforms>,
}

impl InstanceMatrixUniformBuffer {
    pub fn new(
        device: &Arc<GraphicsDevice>,
        instance_count: usize,
        label: &str,
    ) -> Result<Self, GraphicsError> {
        Ok(Self {
            inner: StructBuffer::new(device, instance_count, format!("{label} Instance Matrices"))?,
            scratch: Vec::with_capacity(instance_count),
        })
    }

    /// Upload `world × instance` for every instance matrix.
    pub fn update(&mut self, world: &Mat4, instances: &[Mat4]) -> Result<(), GraphicsError> {
        self.scratch.clear();
        self.scratch.extend(
            instances
                .iter()
                .map(|instance| InstanceMatrixUniforms::new(world, instance)),
        );
        self.inner.update(&self.scratch)
    }

    pub fn read(&self) -> Result<Vec<InstanceMatrixUniforms>, GraphicsError> {
        self.inner.read()
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        self.inner.buffer()
    }

    pub fn offset(&self) -> u64 {
        self.inner.offset()
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_layout_size() {
        assert_eq!(std::mem::size_of::<InstanceMatrixUniforms>(), 112);
    }

    #[test]
    fn test_world_applied_to_instances() {
        let device = GraphicsDevice::dummy();
        let mut buffer = InstanceMatrixUniformBuffer::new(&device, 2, "grass").unwrap();
        let world = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let instances = [
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        ];
        buffer.update(&world, &instances).unwrap();

        let read = buffer.read().unwrap();
        assert_eq!(read.len(), 2);
        let p = read[1].model_matrix.transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(10.0, 1.0, 0.0), 1e-5));
    }
}
