//! Instanced mesh renderable.

use std::any::Any;

use glam::{Mat4, Vec4};

use crate::bindings::VertexBufferIndex;
use crate::encoder::RenderEncoder;
use crate::error::GraphicsError;
use crate::materials::Material;
use crate::renderer::RenderContext;
use crate::resources::InstanceMatrixUniformBuffer;
use crate::scene::{Camera, Renderable};
use crate::types::CullMode;

use super::{Geometry, Mesh};

/// A mesh drawn once per instance matrix.
///
/// `draw_count` limits how many instances are drawn without touching the
/// matrices. The mesh is not drawable while no instance would be drawn.
pub struct InstancedMesh {
    mesh: Mesh,
    instances: Vec<Mat4>,
    draw_count: Option<u32>,
    world: Mat4,
    instance_uniforms: Option<InstanceMatrixUniformBuffer>,
}

impl InstancedMesh {
    pub fn new(label: impl Into<String>, geometry: Geometry, instance_count: u32) -> Self {
        Self {
            mesh: Mesh::new(label, geometry),
            instances: vec![Mat4::IDENTITY; instance_count as usize],
            draw_count: None,
            world: Mat4::IDENTITY,
            instance_uniforms: None,
        }
    }

    pub fn with_material(mut self, material: impl Material) -> Self {
        self.mesh.set_material(Some(Box::new(material)));
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.mesh.set_cast_shadow(cast);
        self.mesh.set_receive_shadow(receive);
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Resize the instance list; new instances get the identity matrix.
    pub fn set_instance_count(&mut self, count: u32) {
        self.instances.resize(count as usize, Mat4::IDENTITY);
    }

    pub fn draw_count(&self) -> Option<u32> {
        self.draw_count
    }

    /// Limit the drawn instances. A count above the instance count grows
    /// the instance list to match.
    pub fn set_draw_count(&mut self, draw_count: Option<u32>) {
        if let Some(count) = draw_count {
            if count > self.instance_count() {
                self.set_instance_count(count);
            }
        }
        self.draw_count = draw_count;
    }

    /// Number of instances a draw issues.
    pub fn drawn_instance_count(&self) -> u32 {
        let count = self.instance_count();
        self.draw_count.map_or(count, |limit| limit.min(count))
    }

    /// Set the local matrix of one instance. Out-of-range indices are
    /// ignored.
    pub fn set_matrix_at(&mut self, index: usize, matrix: Mat4) {
        match self.instances.get_mut(index) {
            Some(slot) => *slot = matrix,
            None => log::warn!(
                "InstancedMesh '{}': instance {} out of range (count {})",
                self.mesh.label(),
                index,
                self.instances.len()
            ),
        }
    }

    /// Local matrix of one instance.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the instance count.
    pub fn matrix_at(&self, index: usize) -> Mat4 {
        match self.instances.get(index) {
            Some(matrix) => *matrix,
            None => panic!(
                "InstancedMesh '{}': instance {} out of range (count {})",
                self.mesh.label(),
                index,
                self.instances.len()
            ),
        }
    }

    /// World matrix of one instance as of the last update.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the instance count.
    pub fn world_matrix_at(&self, index: usize) -> Mat4 {
        self.world * self.matrix_at(index)
    }

    pub fn instance_uniforms(&self) -> Option<&InstanceMatrixUniformBuffer> {
        self.instance_uniforms.as_ref()
    }
}

impl Renderable for InstancedMesh {
    fn label(&self) -> &str {
        self.mesh.label()
    }

    fn render_order(&self) -> i32 {
        self.mesh.render_order()
    }

    fn cull_mode(&self) -> CullMode {
        self.mesh.cull_mode()
    }

    fn cast_shadow(&self) -> bool {
        self.mesh.cast_shadow()
    }

    fn receive_shadow(&self) -> bool {
        self.mesh.receive_shadow()
    }

    fn drawable(&self) -> bool {
        self.drawn_instance_count() > 0 && self.mesh.drawable()
    }

    fn materials(&self) -> Vec<&dyn Material> {
        self.mesh.materials()
    }

    fn materials_mut(&mut self) -> Vec<&mut (dyn Material + 'static)> {
        self.mesh.materials_mut()
    }

    fn update(&mut self, context: &RenderContext, world: &Mat4) -> Result<(), GraphicsError> {
        for material in self.mesh.materials_mut() {
            material.set_instancing(true);
        }
        self.mesh.update(context, world)?;
        self.world = *world;

        if self.instances.is_empty() {
            self.instance_uniforms = None;
            return Ok(());
        }
        let reallocate = self
            .instance_uniforms
            .as_ref()
            .map_or(true, |u| u.count() != self.instances.len());
        if reallocate {
            log::debug!(
                "InstancedMesh '{}': allocating {} instance slots",
                self.mesh.label(),
                self.instances.len()
            );
            self.instance_uniforms = Some(InstanceMatrixUniformBuffer::new(
                &context.device,
                self.instances.len(),
                self.mesh.label(),
            )?);
        }
        if let Some(uniforms) = self.instance_uniforms.as_mut() {
            uniforms.update(world, &self.instances)?;
        }
        Ok(())
    }

    fn update_uniforms(
        &mut self,
        world: &Mat4,
        camera: &Camera,
        viewport: Vec4,
        amplification_index: u32,
    ) -> Result<(), GraphicsError> {
        self.mesh
            .update_uniforms(world, camera, viewport, amplification_index)
    }

    fn draw(&self, encoder: &mut RenderEncoder<'_>, cull_mode: CullMode, shadow: bool) {
        let Some(uniforms) = &self.instance_uniforms else {
            return;
        };
        encoder.set_vertex_buffer(
            uniforms.buffer(),
            uniforms.offset(),
            VertexBufferIndex::InstanceMatrixUniforms.into(),
        );
        self.mesh
            .encode(encoder, cull_mode, shadow, self.drawn_instance_count());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
