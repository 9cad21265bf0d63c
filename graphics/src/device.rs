//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources.
//! It validates descriptors against [`DeviceCapabilities`], forwards the
//! allocation to its [`GpuBackend`] and tracks what it handed out.

use std::sync::{Arc, RwLock, Weak};

use crate::backend::{DummyBackend, GpuBackend};
use crate::encoder::CommandBuffer;
use crate::error::GraphicsError;
use crate::pipeline::{
    ComputePipeline, ComputePipelineDescriptor, RenderPipeline, RenderPipelineDescriptor,
};
use crate::resources::{Buffer, Texture};
use crate::types::{BufferDescriptor, TextureDescriptor, TextureDimension};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum width/height of a 2D texture.
    pub max_texture_dimension_2d: u32,
    /// Maximum extent of a 3D texture along any axis.
    pub max_texture_dimension_3d: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
    /// Highest supported color sample count.
    pub max_color_sample_count: u32,
    /// Highest supported vertex amplification count.
    pub max_vertex_amplification_count: u32,
    /// Whether compute can dispatch grids that are not a multiple of the
    /// threadgroup size.
    pub non_uniform_threadgroups: bool,
    /// SIMD width of compute pipelines.
    pub thread_execution_width: u32,
    /// Maximum threads per compute threadgroup.
    pub max_threads_per_threadgroup: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension_2d: 16384,
            max_texture_dimension_3d: 2048,
            max_buffer_size: 1 << 30, // 1 GB
            max_color_sample_count: 8,
            max_vertex_amplification_count: 2,
            non_uniform_threadgroups: true,
            thread_execution_width: 32,
            max_threads_per_threadgroup: 1024,
        }
    }
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be shared across threads.
/// Resource tracking uses interior mutability.
///
/// # Example
///
/// ```ignore
/// let device = GraphicsDevice::dummy();
/// let buffer = device.create_buffer(&BufferDescriptor::uniform(1024))?;
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     TextureFormat::Bgra8Unorm,
///     TextureUsage::RENDER_ATTACHMENT,
/// ))?;
/// ```
pub struct GraphicsDevice {
    name: String,
    backend: Arc<dyn GpuBackend>,
    capabilities: DeviceCapabilities,
    buffers: RwLock<Vec<Weak<Buffer>>>,
    textures: RwLock<Vec<Weak<Texture>>>,
}

impl GraphicsDevice {
    /// Create a device on top of `backend`.
    pub fn new(backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        let capabilities = backend.capabilities();
        let name = format!("{} Device", backend.name());
        log::info!("GraphicsDevice: created '{}'", name);
        Arc::new(Self {
            name,
            backend,
            capabilities,
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
        })
    }

    /// Create a device backed by a fresh [`DummyBackend`].
    pub fn dummy() -> Arc<Self> {
        Self::new(Arc::new(DummyBackend::new()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size is zero, exceeds device limits or
    /// allocation fails.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let id = self.backend.create_buffer(descriptor)?;
        let buffer = Arc::new(Buffer::new(
            Arc::clone(&self.backend),
            id,
            descriptor.clone(),
        ));

        if let Ok(mut buffers) = self.buffers.write() {
            buffers.push(Arc::downgrade(&buffer));
        }

        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a buffer and fill it with `data`.
    pub fn create_buffer_with_data(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<Arc<Buffer>, GraphicsError> {
        let buffer = self.create_buffer(descriptor)?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    /// Create a GPU texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or exceed device limits,
    /// the sample count is unsupported, or allocation fails.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let size = descriptor.size;
        let max_dim = match descriptor.dimension {
            TextureDimension::D2 => self.capabilities.max_texture_dimension_2d,
            TextureDimension::D3 => self.capabilities.max_texture_dimension_3d,
        };
        if size.width > max_dim || size.height > max_dim || size.depth > max_dim {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension exceeds maximum {max_dim}"
            )));
        }

        if size.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        let samples = descriptor.sample_count;
        if samples == 0
            || !samples.is_power_of_two()
            || samples > self.capabilities.max_color_sample_count
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "unsupported sample count {samples}"
            )));
        }

        let id = self.backend.create_texture(descriptor)?;
        let texture = Arc::new(Texture::new(
            Arc::clone(&self.backend),
            id,
            descriptor.clone(),
        ));

        if let Ok(mut textures) = self.textures.write() {
            textures.push(Arc::downgrade(&texture));
        }

        log::trace!(
            "GraphicsDevice: created texture {:?}, size={}x{}x{}",
            descriptor.label,
            size.width,
            size.height,
            size.depth
        );

        Ok(texture)
    }

    /// Build a render pipeline state object.
    pub fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<Arc<RenderPipeline>, GraphicsError> {
        let id = self.backend.create_render_pipeline(descriptor)?;
        log::debug!("GraphicsDevice: created render pipeline '{}'", descriptor.label);
        Ok(Arc::new(RenderPipeline::new(id, descriptor.label.clone())))
    }

    /// Build a compute pipeline state object.
    pub fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<Arc<ComputePipeline>, GraphicsError> {
        let info = self.backend.create_compute_pipeline(descriptor)?;
        log::debug!("GraphicsDevice: created compute pipeline '{}'", descriptor.label);
        Ok(Arc::new(ComputePipeline::new(
            info.id,
            descriptor.label.clone(),
            info.thread_execution_width,
            info.max_total_threads_per_threadgroup,
        )))
    }

    /// Start recording a command buffer.
    pub fn create_command_buffer(&self, label: impl Into<String>) -> CommandBuffer {
        CommandBuffer::new(label)
    }

    /// Submit a recorded command buffer.
    pub fn submit(&self, command_buffer: CommandBuffer) -> Result<(), GraphicsError> {
        self.backend.submit(command_buffer)
    }

    /// Get the number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .map(|b| b.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .map(|t| t.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.retain(|w| w.strong_count() > 0);
        }
        if let Ok(mut textures) = self.textures.write() {
            textures.retain(|w| w.strong_count() > 0);
        }
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);
