//! Mesh renderable.

use std::any::Any;
use std::ops::Range;

use glam::{Mat4, Vec4};

use crate::bindings::VertexBufferIndex;
use crate::encoder::RenderEncoder;
use crate::error::GraphicsError;
use crate::materials::Material;
use crate::renderer::RenderContext;
use crate::resources::VertexUniformBuffer;
use crate::scene::{Camera, Renderable};
use crate::types::CullMode;

use super::Geometry;

/// A range of a mesh's elements drawn with its own material.
pub struct Submesh {
    label: String,
    range: Range<u32>,
    material: Option<Box<dyn Material>>,
}

impl Submesh {
    pub fn new(label: impl Into<String>, range: Range<u32>) -> Self {
        Self {
            label: label.into(),
            range,
            material: None,
        }
    }

    pub fn with_material(mut self, material: impl Material) -> Self {
        self.material = Some(Box::new(material));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn range(&self) -> Range<u32> {
        self.range.clone()
    }

    pub fn material(&self) -> Option<&dyn Material> {
        self.material.as_deref()
    }
}

/// Geometry drawn with a material.
///
/// A mesh with submeshes draws each submesh range with the submesh's
/// material, falling back to the mesh material.
pub struct Mesh {
    label: String,
    geometry: Geometry,
    material: Option<Box<dyn Material>>,
    submeshes: Vec<Submesh>,
    cull_mode: CullMode,
    render_order: i32,
    cast_shadow: bool,
    receive_shadow: bool,
    vertex_uniforms: Option<VertexUniformBuffer>,
}

impl Mesh {
    pub fn new(label: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            label: label.into(),
            geometry,
            material: None,
            submeshes: Vec::new(),
            cull_mode: CullMode::Back,
            render_order: 0,
            cast_shadow: false,
            receive_shadow: false,
            vertex_uniforms: None,
        }
    }

    pub fn with_material(mut self, material: impl Material) -> Self {
        self.set_material(Some(Box::new(material)));
        self
    }

    pub fn with_submesh(mut self, submesh: Submesh) -> Self {
        self.add_submesh(submesh);
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.set_cast_shadow(cast);
        self.set_receive_shadow(receive);
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    pub fn material(&self) -> Option<&dyn Material> {
        self.material.as_deref()
    }

    /// Downcast the mesh material.
    pub fn material_as_mut<T: Material>(&mut self) -> Option<&mut T> {
        self.material.as_deref_mut()?.as_any_mut().downcast_mut::<T>()
    }

    pub fn set_material(&mut self, material: Option<Box<dyn Material>>) {
        self.material = material;
        self.propagate_receive_shadow();
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    pub fn submesh(&self, index: usize) -> Option<&Submesh> {
        self.submeshes.get(index)
    }

    pub fn add_submesh(&mut self, submesh: Submesh) {
        self.submeshes.push(submesh);
        self.propagate_receive_shadow();
    }

    pub fn set_cull_mode(&mut self, cull_mode: CullMode) {
        self.cull_mode = cull_mode;
    }

    pub fn set_render_order(&mut self, order: i32) {
        self.render_order = order;
    }

    pub fn set_cast_shadow(&mut self, cast: bool) {
        self.cast_shadow = cast;
    }

    /// Also updates every material so they build shadow sampling.
    pub fn set_receive_shadow(&mut self, receive: bool) {
        self.receive_shadow = receive;
        self.propagate_receive_shadow();
    }

    pub fn vertex_uniforms(&self) -> Option<&VertexUniformBuffer> {
        self.vertex_uniforms.as_ref()
    }

    fn propagate_receive_shadow(&mut self) {
        let receive = self.receive_shadow;
        for material in self.materials_mut() {
            material.core_mut().set_receive_shadow(receive);
        }
    }

    /// Bind per-object state and draw every range with `instance_count`
    /// instances.
    pub(crate) fn encode(
        &self,
        encoder: &mut RenderEncoder<'_>,
        cull_mode: CullMode,
        shadow: bool,
        instance_count: u32,
    ) {
        let (Some(vertices), Some(uniforms)) =
            (self.geometry.vertex_buffer(), self.vertex_uniforms.as_ref())
        else {
            return;
        };

        encoder.set_cull_mode(cull_mode);
        encoder.set_vertex_buffer(vertices, 0, VertexBufferIndex::Vertices.into());
        encoder.set_vertex_buffer(
            uniforms.buffer(),
            uniforms.binding_offset(),
            VertexBufferIndex::VertexUniforms.into(),
        );

        if self.submeshes.is_empty() {
            if let Some(material) = &self.material {
                material.bind(encoder, shadow);
            }
            self.geometry
                .draw(encoder, 0..self.geometry.element_count(), instance_count);
            return;
        }

        for submesh in &self.submeshes {
            if let Some(material) = submesh.material.as_deref().or(self.material.as_deref()) {
                material.bind(encoder, shadow);
            }
            self.geometry.draw(encoder, submesh.range(), instance_count);
        }
    }
}

impl Renderable for Mesh {
    fn label(&self) -> &str {
        &self.label
    }

    fn render_order(&self) -> i32 {
        self.render_order
    }

    fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    fn cast_shadow(&self) -> bool {
        self.cast_shadow
    }

    fn receive_shadow(&self) -> bool {
        self.receive_shadow
    }

    fn drawable(&self) -> bool {
        !self.geometry.is_empty() && !self.materials().is_empty()
    }

    fn materials(&self) -> Vec<&dyn Material> {
        self.material
            .as_deref()
            .into_iter()
            .chain(self.submeshes.iter().filter_map(|s| s.material.as_deref()))
            .collect()
    }

    fn materials_mut(&mut self) -> Vec<&mut (dyn Material + 'static)> {
        self.material
            .as_deref_mut()
            .into_iter()
            .chain(
                self.submeshes
                    .iter_mut()
                    .filter_map(|s| s.material.as_deref_mut()),
            )
            .collect()
    }

    fn update(&mut self, context: &RenderContext, _world: &Mat4) -> Result<(), GraphicsError> {
        self.geometry.update(&context.device)?;

        let amplification = context.vertex_amplification_count.max(1);
        let reallocate = self
            .vertex_uniforms
            .as_ref()
            .map_or(true, |u| u.amplification_count() != amplification);
        if reallocate {
            self.vertex_uniforms = Some(VertexUniformBuffer::new(
                &context.device,
                amplification,
                &self.label,
            )?);
        }

        for material in self.materials_mut() {
            material.update(context)?;
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
        match self.vertex_uniforms.as_mut() {
            Some(uniforms) => uniforms
                .update(world, camera, viewport, amplification_index)
                .map(|_| ()),
            None => Ok(()),
        }
    }

    fn draw(&self, encoder: &mut RenderEncoder<'_>, cull_mode: CullMode, shadow: bool) {
        self.encode(encoder, cull_mode, shadow, 1);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("label", &self.label)
            .field("geometry", &self.geometry)
            .field("material", &self.material.as_ref().map(|m| m.label().to_string()))
            .field("submeshes", &self.submeshes.len())
            .field("cull_mode", &self.cull_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GraphicsDevice;
    use crate::encoder::{CommandBuffer, RenderPassDescriptor};
    use crate::materials::{builtin_program, BasicColorMaterial, StandardMaterial};
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};
    use std::sync::Arc;

    fn material() -> BasicColorMaterial {
        BasicColorMaterial::new(Arc::new(builtin_program()), Vec4::ONE)
    }

    #[test]
    fn test_drawable_needs_material_and_geometry() {
        let mesh = Mesh::new("m", Geometry::quad(1.0, 1.0));
        assert!(!mesh.drawable());
        let mesh = mesh.with_material(material());
        assert!(mesh.drawable());
        let empty = Mesh::new("e", Geometry::new(Vec::new(), Vec::new())).with_material(material());
        assert!(!empty.drawable());
    }

    #[test]
    fn test_receive_shadow_propagates() {
        let mut mesh = Mesh::new("m", Geometry::quad(1.0, 1.0))
            .with_material(StandardMaterial::new(Arc::new(builtin_program())));
        mesh.set_receive_shadow(false);
        assert!(!mesh.materials()[0].receive_shadow());
        mesh.set_receive_shadow(true);
        assert!(mesh.materials()[0].receive_shadow());
    }

    #[test]
    fn test_submeshes_draw_their_ranges() {
        let device = GraphicsDevice::dummy();
        let context = RenderContext::new(device.clone());
        let mut mesh = Mesh::new("m", Geometry::quad(1.0, 1.0))
            .with_material(material())
            .with_submesh(Submesh::new("a", 0..3))
            .with_submesh(Submesh::new("b", 3..6).with_material(material()));
        mesh.update(&context, &Mat4::IDENTITY).unwrap();
        mesh.update_uniforms(&Mat4::IDENTITY, &Camera::default(), Vec4::ZERO, 0)
            .unwrap();
        assert_eq!(mesh.materials().len(), 2);

        let target = device
            .create_texture(&TextureDescriptor::new_2d(
                8,
                8,
                TextureFormat::Bgra8Unorm,
                TextureUsage::RENDER_ATTACHMENT,
            ))
            .unwrap();
        let mut commands = CommandBuffer::new("test");
        {
            let mut encoder = commands
                .render_encoder(&RenderPassDescriptor::new().with_color_texture(target))
                .unwrap();
            mesh.draw(&mut encoder, CullMode::Back, false);
        }
        let pass = commands.render_passes().next().unwrap();
        assert_eq!(pass.draw_count(), 2);
    }
}
