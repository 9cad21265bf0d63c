//! GPU argument tables.
//!
//! An argument table lets one binding slot reference many resources. Each
//! entry is 16 bytes: the backend resource id followed by a byte offset
//! (zero for textures). Empty entries are all zeros.

use std::sync::Arc;

use crate::backend::TextureId;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, Texture};
use crate::types::{BufferDescriptor, BufferUsage};

/// Size of one encoded entry.
pub const ARGUMENT_ENTRY_SIZE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Buffer,
    Texture,
}

/// One argument of a table layout: `array_length` consecutive entries
/// starting at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    pub index: u32,
    pub kind: ArgumentKind,
    pub array_length: u32,
}

/// Layout of an argument table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentLayout {
    arguments: Vec<ArgumentDescriptor>,
}

impl ArgumentLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(mut self, index: u32) -> Self {
        self.arguments.push(ArgumentDescriptor {
            index,
            kind: ArgumentKind::Buffer,
            array_length: 1,
        });
        self
    }

    pub fn with_textures(mut self, index: u32, array_length: u32) -> Self {
        self.arguments.push(ArgumentDescriptor {
            index,
            kind: ArgumentKind::Texture,
            array_length,
        });
        self
    }

    /// Number of entries in the table.
    pub fn entry_count(&self) -> u32 {
        self.arguments
            .iter()
            .map(|a| a.index + a.array_length)
            .max()
            .unwrap_or(0)
    }

    /// Encoded byte length.
    pub fn encoded_length(&self) -> u64 {
        self.entry_count() as u64 * ARGUMENT_ENTRY_SIZE
    }

    fn kind_of(&self, entry: u32) -> Option<ArgumentKind> {
        self.arguments
            .iter()
            .find(|a| entry >= a.index && entry < a.index + a.array_length)
            .map(|a| a.kind)
    }
}

/// An argument table backed by a GPU buffer.
pub struct ArgumentBuffer {
    layout: ArgumentLayout,
    buffer: Arc<Buffer>,
    textures: Vec<Option<TextureId>>,
}

impl ArgumentBuffer {
    pub fn new(
        device: &Arc<GraphicsDevice>,
        layout: ArgumentLayout,
        label: &str,
    ) -> Result<Self, GraphicsError> {
        let length = layout.encoded_length();
        let buffer = device.create_buffer(
            &BufferDescriptor::new(length, BufferUsage::ARGUMENT | BufferUsage::CPU_WRITE)
                .with_label(label.to_string()),
        )?;
        let textures = vec![None; layout.entry_count() as usize];
        Ok(Self {
            layout,
            buffer,
            textures,
        })
    }

    pub fn layout(&self) -> &ArgumentLayout {
        &self.layout
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Reference `buffer` at `offset` from entry `index`.
    pub fn set_buffer(&mut self, index: u32, buffer: &Buffer, offset: u64) -> Result<(), GraphicsError> {
        self.check_kind(index, ArgumentKind::Buffer)?;
        self.write_entry(index, buffer.id().raw(), offset)
    }

    /// Reference `texture` from entry `index`, or clear the entry.
    pub fn set_texture(&mut self, index: u32, texture: Option<&Texture>) -> Result<(), GraphicsError> {
        self.check_kind(index, ArgumentKind::Texture)?;
        self.textures[index as usize] = texture.map(Texture::id);
        self.write_entry(index, texture.map_or(0, |t| t.id().raw()), 0)
    }

    /// Textures currently referenced, for residency declarations.
    pub fn referenced_textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.iter().flatten().copied()
    }

    /// Decode entry `index` as `(resource id, offset)`.
    pub fn read_entry(&self, index: u32) -> Result<(u64, u64), GraphicsError> {
        let bytes = self
            .buffer
            .read(index as u64 * ARGUMENT_ENTRY_SIZE, ARGUMENT_ENTRY_SIZE)?;
        let id: u64 = bytemuck::pod_read_unaligned(&bytes[0..8]);
        let offset: u64 = bytemuck::pod_read_unaligned(&bytes[8..16]);
        Ok((id, offset))
    }

    fn check_kind(&self, index: u32, kind: ArgumentKind) -> Result<(), GraphicsError> {
        match self.layout.kind_of(index) {
            Some(k) if k == kind => Ok(()),
            other => Err(GraphicsError::InvalidParameter(format!(
                "argument {index} is {other:?}, expected {kind:?}"
            ))),
        }
    }

    fn write_entry(&self, index: u32, id: u64, offset: u64) -> Result<(), GraphicsError> {
        let entry = [id, offset];
        self.buffer.write(
            index as u64 * ARGUMENT_ENTRY_SIZE,
            bytemuck::cast_slice(&entry),
        )
    }
}

impl std::fmt::Debug for ArgumentBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentBuffer")
            .field("entries", &self.layout.entry_count())
            .field("buffer", &self.buffer.label())
            .finish()
    }
}
