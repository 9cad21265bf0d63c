//! Typed uniform arrays ring-buffered across frames in flight.

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, UniformRing};
use crate::types::BufferUsage;

/// A fixed-length array of `T` uploaded once per frame.
///
/// Each [`update`](Self::update) writes the whole array into the next frame
/// region of an internal [`UniformRing`]; [`offset`](Self::offset) is the
/// region the GPU should read this frame. The element count is fixed for
/// the lifetime of the buffer: owners reallocate when it changes.
pub struct StructBuffer<T: Pod> {
    ring: UniformRing,
    count: usize,
    label: String,
    _marker: PhantomData<T>,
}

impl<T: Pod> StructBuffer<T> {
    pub fn new(
        device: &Arc<GraphicsDevice>,
        count: usize,
        label: impl Into<String>,
    ) -> Result<Self, GraphicsError> {
        let label = label.into();
        if count == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "struct buffer '{label}' cannot hold zero elements"
            )));
        }
        let element_size = (std::mem::size_of::<T>() * count) as u64;
        let ring = UniformRing::new(
            device,
            element_size,
            1,
            BufferUsage::UNIFORM | BufferUsage::STORAGE,
            &label,
        )?;
        Ok(Self {
            ring,
            count,
            label,
            _marker: PhantomData,
        })
    }

    /// Advance to the next frame region and upload `data`.
    pub fn update(&mut self, data: &[T]) -> Result<(), GraphicsError> {
        if data.len() != self.count {
            return Err(GraphicsError::InvalidParameter(format!(
                "struct buffer '{}' holds {} elements, got {}",
                self.label,
                self.count,
                data.len()
            )));
        }
        self.ring.advance();
        self.ring.write(0, bytemuck::cast_slice(data))?;
        Ok(())
    }

    /// Read back the elements of the current frame region.
    pub fn read(&self) -> Result<Vec<T>, GraphicsError> {
        let size = (std::mem::size_of::<T>() * self.count) as u64;
        let bytes = self.ring.buffer().read(self.offset(), size)?;
        Ok(bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        self.ring.buffer()
    }

    /// Offset of the most recently written region.
    pub fn offset(&self) -> u64 {
        self.ring.slot_offset(0)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T: Pod> std::fmt::Debug for StructBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructBuffer")
            .field("label", &self.label)
            .field("count", &self.count)
            .field("offset", &self.offset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_read() {
        let device = GraphicsDevice::dummy();
        let mut buffer = StructBuffer::<[f32; 4]>::new(&device, 2, "pairs").unwrap();
        buffer.update(&[[1.0; 4], [2.0; 4]]).unwrap();
        assert_eq!(buffer.offset(), 0);
        assert_eq!(buffer.read().unwrap(), vec![[1.0; 4], [2.0; 4]]);

        buffer.update(&[[3.0; 4], [4.0; 4]]).unwrap();
        assert_eq!(buffer.offset(), 256);
        assert_eq!(buffer.read().unwrap()[1], [4.0; 4]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let device = GraphicsDevice::dummy();
        let mut buffer = StructBuffer::<u32>::new(&device, 3, "ints").unwrap();
        assert!(buffer.update(&[1, 2]).is_err());
    }

    #[test]
    fn test_zero_count_rejected() {
        let device = GraphicsDevice::dummy();
        assert!(StructBuffer::<u32>::new(&device, 0, "empty").is_err());
    }
}
