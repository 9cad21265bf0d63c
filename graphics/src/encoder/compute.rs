//! Compute and blit command recording.

use crate::backend::{BufferId, PipelineId, TextureId};
use crate::pipeline::ComputePipeline;
use crate::resources::{Buffer, Texture};
use crate::types::Extent3d;

use super::command_buffer::EncodedPass;

/// A command recorded into a compute pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeCommand {
    SetPipeline(PipelineId),
    SetTexture {
        index: u32,
        texture: TextureId,
    },
    SetBuffer {
        index: u32,
        buffer: BufferId,
        offset: u64,
    },
    SetBytes {
        index: u32,
        bytes: Vec<u8>,
    },
    /// One thread per grid element; the backend handles partial groups.
    DispatchThreads {
        threads_per_grid: Extent3d,
        threads_per_threadgroup: Extent3d,
    },
    /// Whole threadgroups; shaders must bounds-check the grid edge.
    DispatchThreadgroups {
        threadgroups_per_grid: Extent3d,
        threads_per_threadgroup: Extent3d,
    },
}

impl ComputeCommand {
    pub fn is_dispatch(&self) -> bool {
        matches!(
            self,
            Self::DispatchThreads { .. } | Self::DispatchThreadgroups { .. }
        )
    }
}

/// A recorded compute pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePassRecord {
    pub label: Option<String>,
    pub commands: Vec<ComputeCommand>,
}

impl ComputePassRecord {
    /// Dispatches paired with the pipeline bound when they were issued.
    pub fn dispatches(&self) -> Vec<(Option<PipelineId>, &ComputeCommand)> {
        let mut pipeline = None;
        let mut out = Vec::new();
        for command in &self.commands {
            match command {
                ComputeCommand::SetPipeline(id) => pipeline = Some(*id),
                c if c.is_dispatch() => out.push((pipeline, c)),
                _ => {}
            }
        }
        out
    }

    /// Number of dispatches issued with `pipeline` bound.
    pub fn dispatch_count(&self, pipeline: PipelineId) -> usize {
        self.dispatches()
            .iter()
            .filter(|(p, _)| *p == Some(pipeline))
            .count()
    }
}

/// Records commands for one compute pass.
pub struct ComputeEncoder<'a> {
    passes: &'a mut Vec<EncodedPass>,
    record: Option<ComputePassRecord>,
}

impl<'a> ComputeEncoder<'a> {
    pub(crate) fn new(passes: &'a mut Vec<EncodedPass>, label: Option<String>) -> Self {
        Self {
            passes,
            record: Some(ComputePassRecord {
                label,
                commands: Vec::new(),
            }),
        }
    }

    fn push(&mut self, command: ComputeCommand) {
        if let Some(record) = self.record.as_mut() {
            record.commands.push(command);
        }
    }

    pub fn set_compute_pipeline(&mut self, pipeline: &ComputePipeline) {
        self.push(ComputeCommand::SetPipeline(pipeline.id()));
    }

    pub fn set_texture(&mut self, texture: &Texture, index: u32) {
        self.push(ComputeCommand::SetTexture {
            index,
            texture: texture.id(),
        });
    }

    pub fn set_buffer(&mut self, buffer: &Buffer, offset: u64, index: u32) {
        self.push(ComputeCommand::SetBuffer {
            index,
            buffer: buffer.id(),
            offset,
        });
    }

    pub fn set_bytes(&mut self, bytes: &[u8], index: u32) {
        self.push(ComputeCommand::SetBytes {
            index,
            bytes: bytes.to_vec(),
        });
    }

    pub fn dispatch_threads(&mut self, threads_per_grid: Extent3d, threads_per_threadgroup: Extent3d) {
        self.push(ComputeCommand::DispatchThreads {
            threads_per_grid,
            threads_per_threadgroup,
        });
    }

    pub fn dispatch_threadgroups(
        &mut self,
        threadgroups_per_grid: Extent3d,
        threads_per_threadgroup: Extent3d,
    ) {
        self.push(ComputeCommand::DispatchThreadgroups {
            threadgroups_per_grid,
            threads_per_threadgroup,
        });
    }

    /// Close the pass.
    pub fn end_encoding(self) {}
}

impl Drop for ComputeEncoder<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.passes.push(EncodedPass::Compute(record));
        }
    }
}

/// A texture-to-texture copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitCopy {
    pub source: TextureId,
    pub destination: TextureId,
    pub size: Extent3d,
}

/// A recorded blit pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlitPassRecord {
    pub label: Option<String>,
    pub copies: Vec<BlitCopy>,
}

/// Records texture copies.
pub struct BlitEncoder<'a> {
    passes: &'a mut Vec<EncodedPass>,
    record: Option<BlitPassRecord>,
}

impl<'a> BlitEncoder<'a> {
    pub(crate) fn new(passes: &'a mut Vec<EncodedPass>, label: Option<String>) -> Self {
        Self {
            passes,
            record: Some(BlitPassRecord {
                label,
                copies: Vec::new(),
            }),
        }
    }

    /// Copy the overlapping extent of `source` into `destination`.
    pub fn copy_texture(&mut self, source: &Texture, destination: &Texture) {
        let size = Extent3d::new_3d(
            source.width().min(destination.width()),
            source.height().min(destination.height()),
            source.depth().min(destination.depth()),
        );
        if let Some(record) = self.record.as_mut() {
            record.copies.push(BlitCopy {
                source: source.id(),
                destination: destination.id(),
                size,
            });
        }
    }

    pub fn end_encoding(self) {}
}

impl Drop for BlitEncoder<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.passes.push(EncodedPass::Blit(record));
        }
    }
}
