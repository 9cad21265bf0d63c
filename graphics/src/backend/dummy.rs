//! Dummy GPU backend for testing and headless runs.
//!
//! Buffer memory lives in CPU vectors so uploads can be read back, and
//! every submitted [`CommandBuffer`] is kept for inspection. Nothing is
//! executed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::device::DeviceCapabilities;
use crate::encoder::CommandBuffer;
use crate::error::GraphicsError;
use crate::pipeline::{ComputePipelineDescriptor, RenderPipelineDescriptor, ShaderProgram};
use crate::types::{BufferDescriptor, TextureDescriptor};

use super::{BufferId, ComputePipelineInfo, GpuBackend, PipelineId, TextureId};

/// Dummy GPU backend.
pub struct DummyBackend {
    capabilities: DeviceCapabilities,
    next_id: AtomicU64,
    buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    textures: Mutex<HashMap<TextureId, TextureDescriptor>>,
    submitted: Mutex<Vec<CommandBuffer>>,
    fail_allocations: AtomicBool,
}

impl DummyBackend {
    /// Create a new dummy backend with default capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::default())
    }

    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            next_id: AtomicU64::new(1),
            buffers: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            fail_allocations: AtomicBool::new(false),
        }
    }

    /// Make every following buffer and texture allocation fail with
    /// [`GraphicsError::OutOfMemory`].
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Relaxed);
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.lock().len()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().len()
    }

    /// Drain the submitted command buffers, oldest first.
    pub fn take_submitted(&self) -> Vec<CommandBuffer> {
        std::mem::take(&mut *self.submitted.lock())
    }

    fn allocate_id(&self) -> Result<u64, GraphicsError> {
        if self.fail_allocations.load(Ordering::Relaxed) {
            return Err(GraphicsError::OutOfMemory);
        }
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check_entry_point(
        program: &ShaderProgram,
        label: &str,
        entry: &str,
    ) -> Result<(), GraphicsError> {
        if program.has_entry_point(entry) {
            Ok(())
        } else {
            Err(GraphicsError::ShaderCompilationFailed {
                label: label.to_string(),
                message: format!(
                    "entry point '{entry}' not found in program '{}'",
                    program.label()
                ),
            })
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyBackend")
            .field("buffers", &self.live_buffer_count())
            .field("textures", &self.live_texture_count())
            .field("submitted", &self.submitted_count())
            .finish()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities.clone()
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, GraphicsError> {
        let id = BufferId(self.allocate_id()?);
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        self.buffers
            .lock()
            .insert(id, vec![0u8; descriptor.size as usize]);
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) {
        self.buffers.lock().remove(&id);
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        let mut buffers = self.buffers.lock();
        let memory = buffers
            .get_mut(&id)
            .ok_or_else(|| GraphicsError::Internal(format!("unknown buffer {id:?}")))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > memory.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                memory.len()
            )));
        }
        memory[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, GraphicsError> {
        let buffers = self.buffers.lock();
        let memory = buffers
            .get(&id)
            .ok_or_else(|| GraphicsError::Internal(format!("unknown buffer {id:?}")))?;
        let start = offset as usize;
        let end = start + size as usize;
        memory
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "read of {size} bytes at offset {offset} exceeds buffer size {}",
                    memory.len()
                ))
            })
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, GraphicsError> {
        let id = TextureId(self.allocate_id()?);
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{}, {} samples)",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth,
            descriptor.sample_count
        );
        self.textures.lock().insert(id, descriptor.clone());
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) {
        self.textures.lock().remove(&id);
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<PipelineId, GraphicsError> {
        Self::check_entry_point(&descriptor.program, &descriptor.label, &descriptor.vertex_entry)?;
        if let Some(fragment) = &descriptor.fragment_entry {
            Self::check_entry_point(&descriptor.program, &descriptor.label, fragment)?;
        }
        let id = PipelineId(self.next_id.fetch_add(1, Ordering::Relaxed));
        log::trace!(
            "DummyBackend: created render pipeline '{}' with {} defines",
            descriptor.label,
            descriptor.defines.len()
        );
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineInfo, GraphicsError> {
        Self::check_entry_point(&descriptor.program, &descriptor.label, &descriptor.entry)?;
        let id = PipelineId(self.next_id.fetch_add(1, Ordering::Relaxed));
        log::trace!("DummyBackend: created compute pipeline '{}'", descriptor.label);
        Ok(ComputePipelineInfo {
            id,
            thread_execution_width: self.capabilities.thread_execution_width,
            max_total_threads_per_threadgroup: self.capabilities.max_threads_per_threadgroup,
        })
    }

    fn submit(&self, command_buffer: CommandBuffer) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: submitted command buffer {:?} with {} passes",
            command_buffer.label(),
            command_buffer.passes().len()
        );
        self.submitted.lock().push(command_buffer);
        Ok(())
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);
