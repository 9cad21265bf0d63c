//! CPU geometry with lazily uploaded GPU buffers.
//!
//! Loaders hand over flat [`Vertex`] arrays and `u32` indices; the GPU
//! buffers are (re)created on the first [`Geometry::update`] after a change.

use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use lumen_core::{ChangeCounter, ChangeCursor};

use crate::device::GraphicsDevice;
use crate::encoder::RenderEncoder;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage, PrimitiveType};

/// Interleaved vertex layout read by every built-in shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            normal,
            uv,
        }
    }
}

#[derive(Debug)]
struct GeometryBuffers {
    vertices: Arc<Buffer>,
    indices: Option<Arc<Buffer>>,
}

/// Vertex and index data of a mesh.
pub struct Geometry {
    primitive: PrimitiveType,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    changes: ChangeCounter,
    uploaded: ChangeCursor,
    buffers: Option<GeometryBuffers>,
}

impl Geometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            primitive: PrimitiveType::Triangle,
            vertices,
            indices,
            changes: ChangeCounter::new(),
            uploaded: ChangeCursor::default(),
            buffers: None,
        }
    }

    pub fn with_primitive(mut self, primitive: PrimitiveType) -> Self {
        self.primitive = primitive;
        self
    }

    /// A `width` × `height` quad in the XY plane facing +Z.
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-hw, -hh, 0.0], n, [0.0, 1.0]),
            Vertex::new([hw, -hh, 0.0], n, [1.0, 1.0]),
            Vertex::new([hw, hh, 0.0], n, [1.0, 0.0]),
            Vertex::new([-hw, hh, 0.0], n, [0.0, 0.0]),
        ];
        Self::new(vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// An equilateral triangle in the XY plane with circumradius `size`.
    pub fn triangle(size: f32) -> Self {
        let n = [0.0, 0.0, 1.0];
        let corner = |angle: f32| {
            let (s, c) = angle.sin_cos();
            [c * size, s * size, 0.0]
        };
        let third = std::f32::consts::TAU / 3.0;
        let base = std::f32::consts::FRAC_PI_2;
        let vertices = vec![
            Vertex::new(corner(base), n, [0.5, 0.0]),
            Vertex::new(corner(base + third), n, [0.0, 1.0]),
            Vertex::new(corner(base + 2.0 * third), n, [1.0, 1.0]),
        ];
        Self::new(vertices, Vec::new())
    }

    /// An axis-aligned box centred on the origin.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let start = vertices.len() as u32;
            for (su, sv, uv) in [
                (-1.0, -1.0, [0.0, 1.0]),
                (1.0, -1.0, [1.0, 1.0]),
                (1.0, 1.0, [1.0, 0.0]),
                (-1.0, 1.0, [0.0, 0.0]),
            ] {
                let p = [
                    (normal[0] + su * u[0] + sv * v[0]) * h,
                    (normal[1] + su * u[1] + sv * v[1]) * h,
                    (normal[2] + su * u[2] + sv * v[2]) * h,
                ];
                vertices.push(Vertex::new(p, normal, uv));
            }
            indices.extend([start, start + 1, start + 2, start, start + 2, start + 3]);
        }
        Self::new(vertices, indices)
    }

    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn set_vertices(&mut self, vertices: Vec<Vertex>) {
        self.vertices = vertices;
        self.changes.bump();
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
        self.changes.bump();
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Number of elements a full draw covers.
    pub fn element_count(&self) -> u32 {
        if self.is_indexed() {
            self.index_count()
        } else {
            self.vertex_count()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_buffer(&self) -> Option<&Arc<Buffer>> {
        self.buffers.as_ref().map(|b| &b.vertices)
    }

    pub fn index_buffer(&self) -> Option<&Arc<Buffer>> {
        self.buffers.as_ref().and_then(|b| b.indices.as_ref())
    }

    /// Upload the data if it changed since the last upload.
    pub fn update(&mut self, device: &Arc<GraphicsDevice>) -> Result<(), GraphicsError> {
        if self.buffers.is_some() && !self.uploaded.is_stale(&self.changes) {
            return Ok(());
        }
        self.uploaded.consume(&self.changes);

        if self.vertices.is_empty() {
            self.buffers = None;
            return Ok(());
        }

        let vertices = device.create_buffer_with_data(
            &BufferDescriptor::new(
                std::mem::size_of_val(self.vertices.as_slice()) as u64,
                BufferUsage::VERTEX | BufferUsage::CPU_WRITE,
            )
            .with_label("Vertices".to_string()),
            bytemuck::cast_slice(&self.vertices),
        )?;
        let indices = if self.indices.is_empty() {
            None
        } else {
            Some(device.create_buffer_with_data(
                &BufferDescriptor::new(
                    std::mem::size_of_val(self.indices.as_slice()) as u64,
                    BufferUsage::INDEX | BufferUsage::CPU_WRITE,
                )
                .with_label("Indices".to_string()),
                bytemuck::cast_slice(&self.indices),
            )?)
        };
        log::trace!(
            "Geometry: uploaded {} vertices, {} indices",
            self.vertices.len(),
            self.indices.len()
        );
        self.buffers = Some(GeometryBuffers { vertices, indices });
        Ok(())
    }

    /// Record a draw of `range` (indices if indexed, vertices otherwise).
    /// Does nothing before the first upload.
    pub fn draw(&self, encoder: &mut RenderEncoder<'_>, range: Range<u32>, instance_count: u32) {
        let Some(buffers) = &self.buffers else {
            return;
        };
        let count = range.end.saturating_sub(range.start);
        if count == 0 || instance_count == 0 {
            return;
        }
        match &buffers.indices {
            Some(indices) => encoder.draw_indexed_primitives(
                self.primitive,
                count,
                indices,
                range.start as u64 * std::mem::size_of::<u32>() as u64,
                instance_count,
            ),
            None => encoder.draw_primitives(self.primitive, range.start, count, instance_count),
        }
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("primitive", &self.primitive)
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .field("uploaded", &self.buffers.is_some())
            .finish()
    }
}
