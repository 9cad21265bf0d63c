//! Fixed-slot uniform ring for frames in flight.
//!
//! A [`UniformRing`] owns one GPU allocation holding
//! [`MAX_FRAMES_IN_FLIGHT`] consecutive frame regions. Each region has one
//! slot per view (vertex amplification), every slot is
//! [`UNIFORM_ALIGNMENT`]-aligned. Advancing moves to the next frame region,
//! so a slot is rewritten only after the other `K - 1` regions were used.
//!
//! ```text
//! | frame 0            | frame 1            | frame 2            |
//! | view 0 | view 1    | view 0 | view 1    | view 0 | view 1    |
//! ```
//!
//! The CPU must not advance past a region the GPU is still reading. The
//! ring does not synchronise; callers pace frames (e.g. wait on the frame
//! `F - K` completion) before encoding frame `F`.

use std::sync::Arc;

use lumen_core::math::align_up;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// Number of frames whose GPU work may be outstanding while the CPU encodes.
pub const MAX_FRAMES_IN_FLIGHT: u32 = 3;

/// Alignment of every uniform slot (minimum constant buffer offset alignment).
pub const UNIFORM_ALIGNMENT: u64 = 256;

pub struct UniformRing {
    buffer: Arc<Buffer>,
    stride: u64,
    slots_per_frame: u32,
    frames: u32,
    frame_index: u32,
    advances: u64,
}

impl UniformRing {
    /// Create a ring for elements of `element_size` bytes with
    /// `slots_per_frame` slots in each of [`MAX_FRAMES_IN_FLIGHT`] regions.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        element_size: u64,
        slots_per_frame: u32,
        usage: BufferUsage,
        label: &str,
    ) -> Result<Self, GraphicsError> {
        Self::with_frames(
            device,
            element_size,
            slots_per_frame,
            MAX_FRAMES_IN_FLIGHT,
            usage,
            label,
        )
    }

    pub fn with_frames(
        device: &Arc<GraphicsDevice>,
        element_size: u64,
        slots_per_frame: u32,
        frames: u32,
        usage: BufferUsage,
        label: &str,
    ) -> Result<Self, GraphicsError> {
        if element_size == 0 || slots_per_frame == 0 || frames == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform ring '{label}' needs non-zero element size, slots and frames"
            )));
        }

        let stride = align_up(element_size, UNIFORM_ALIGNMENT);
        let capacity = stride * slots_per_frame as u64 * frames as u64;
        let descriptor = BufferDescriptor::new(capacity, usage | BufferUsage::CPU_WRITE)
            .with_label(label.to_string());
        let buffer = device.create_buffer(&descriptor)?;

        log::debug!(
            "UniformRing: '{}' allocated {} bytes (stride {}, {} slots x {} frames)",
            label,
            capacity,
            stride,
            slots_per_frame,
            frames
        );

        Ok(Self {
            buffer,
            stride,
            slots_per_frame,
            frames,
            // The first advance lands on region 0.
            frame_index: frames - 1,
            advances: 0,
        })
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Aligned byte size of one slot.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn capacity(&self) -> u64 {
        self.buffer.size()
    }

    pub fn slots_per_frame(&self) -> u32 {
        self.slots_per_frame
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Region currently being written.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Total number of advances since creation.
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Move to the next frame region, wrapping modulo the frame count.
    pub fn advance(&mut self) {
        self.frame_index = (self.frame_index + 1) % self.frames;
        self.advances += 1;
    }

    /// Byte offset of `slot` in the current region.
    pub fn slot_offset(&self, slot: u32) -> u64 {
        debug_assert!(slot < self.slots_per_frame, "slot {slot} out of range");
        self.stride * (self.frame_index as u64 * self.slots_per_frame as u64)
            + self.stride * slot as u64
    }

    /// Write `bytes` into `slot` of the current region and return its offset.
    pub fn write(&self, slot: u32, bytes: &[u8]) -> Result<u64, GraphicsError> {
        if bytes.len() as u64 > self.stride {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} bytes do not fit a {}-byte uniform slot",
                bytes.len(),
                self.stride
            )));
        }
        let offset = self.slot_offset(slot);
        self.buffer.write(offset, bytes)?;
        Ok(offset)
    }
}

impl std::fmt::Debug for UniformRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformRing")
            .field("stride", &self.stride)
            .field("slots_per_frame", &self.slots_per_frame)
            .field("frames", &self.frames)
            .field("frame_index", &self.frame_index)
            .field("buffer", &self.buffer.label())
            .finish()
    }
}
