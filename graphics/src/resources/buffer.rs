//! GPU buffer resource.

use std::sync::Arc;

use crate::backend::{BufferId, GpuBackend};
use crate::error::GraphicsError;
use crate::types::BufferDescriptor;

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and are
/// reference-counted. The backend allocation is released when the last
/// reference is dropped.
///
/// [`GraphicsDevice::create_buffer`]: crate::GraphicsDevice::create_buffer
pub struct Buffer {
    backend: Arc<dyn GpuBackend>,
    id: BufferId,
    descriptor: BufferDescriptor,
}

impl Buffer {
    pub(crate) fn new(
        backend: Arc<dyn GpuBackend>,
        id: BufferId,
        descriptor: BufferDescriptor,
    ) -> Self {
        Self {
            backend,
            id,
            descriptor,
        }
    }

    /// Backend handle. Stable for the lifetime of the buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Copy `data` into the buffer at `offset`.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        if offset + data.len() as u64 > self.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} overflows buffer {:?} of size {}",
                data.len(),
                offset,
                self.label(),
                self.size()
            )));
        }
        self.backend.write_buffer(self.id, offset, data)
    }

    /// Read `size` bytes starting at `offset`.
    pub fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>, GraphicsError> {
        self.backend.read_buffer(self.id, offset, size)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.backend.destroy_buffer(self.id);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use crate::device::GraphicsDevice;
    use crate::types::{BufferDescriptor, BufferUsage};

    #[test]
    fn test_buffer_debug() {
        let device = GraphicsDevice::dummy();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
            .unwrap();
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
    }

    #[test]
    fn test_write_read() {
        let device = GraphicsDevice::dummy();
        let buffer = device.create_buffer(&BufferDescriptor::uniform(64)).unwrap();
        buffer.write(8, &[7, 7]).unwrap();
        assert_eq!(buffer.read(8, 2).unwrap(), vec![7, 7]);
    }

    #[test]
    fn test_write_overflow() {
        let device = GraphicsDevice::dummy();
        let buffer = device.create_buffer(&BufferDescriptor::uniform(16)).unwrap();
        assert!(buffer.write(12, &[0; 8]).is_err());
    }
}
