//! GPU backend abstraction layer.
//!
//! The renderer talks to the GPU through the [`GpuBackend`] trait. Resources
//! are referred to by opaque ids; the owning wrappers in
//! [`resources`](crate::resources) release them on drop.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: keeps buffer memory on the CPU and records submitted
//!   command buffers. Used for tests and headless runs.

pub mod dummy;

pub use dummy::DummyBackend;

use crate::device::DeviceCapabilities;
use crate::encoder::CommandBuffer;
use crate::error::GraphicsError;
use crate::pipeline::{ComputePipelineDescriptor, RenderPipelineDescriptor};
use crate::types::{BufferDescriptor, TextureDescriptor};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

resource_id!(
    /// Backend handle of a buffer allocation.
    BufferId
);
resource_id!(
    /// Backend handle of a texture allocation.
    TextureId
);
resource_id!(
    /// Backend handle of a render or compute pipeline state object.
    PipelineId
);

/// Compute pipeline state returned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputePipelineInfo {
    pub id: PipelineId,
    /// SIMD width the pipeline executes with.
    pub thread_execution_width: u32,
    /// Upper bound of threads in one threadgroup for this pipeline.
    pub max_total_threads_per_threadgroup: u32,
}

/// Primitives the renderer needs from a GPU API.
pub trait GpuBackend: Send + Sync + 'static {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Limits and optional features of the adapter.
    fn capabilities(&self) -> DeviceCapabilities;

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, GraphicsError>;

    fn destroy_buffer(&self, id: BufferId);

    /// Write CPU data into a shared-storage buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), GraphicsError>;

    /// Read back buffer contents.
    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, GraphicsError>;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, GraphicsError>;

    fn destroy_texture(&self, id: TextureId);

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<PipelineId, GraphicsError>;

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineInfo, GraphicsError>;

    /// Hand a recorded command buffer to the GPU. Fire and forget.
    fn submit(&self, command_buffer: CommandBuffer) -> Result<(), GraphicsError>;
}
