//! Render command recording.

use crate::backend::{BufferId, PipelineId, TextureId};
use crate::pipeline::RenderPipeline;
use crate::resources::{Buffer, Texture};
use crate::types::{CullMode, PrimitiveType, Viewport, Winding};

use super::command_buffer::EncodedPass;
use super::pass_descriptor::AttachmentRecord;

/// A command recorded into a render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    SetViewport(Viewport),
    SetCullMode(CullMode),
    SetFrontFacing(Winding),
    SetPipeline(PipelineId),
    SetVertexBuffer {
        index: u32,
        buffer: BufferId,
        offset: u64,
    },
    SetFragmentBuffer {
        index: u32,
        buffer: BufferId,
        offset: u64,
    },
    SetFragmentTexture {
        index: u32,
        texture: TextureId,
    },
    /// Declare a texture referenced indirectly (through an argument table).
    UseTexture(TextureId),
    /// Declare a buffer referenced indirectly (through an argument table).
    UseBuffer(BufferId),
    Draw {
        primitive: PrimitiveType,
        vertex_start: u32,
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        primitive: PrimitiveType,
        index_count: u32,
        index_buffer: BufferId,
        index_offset: u64,
        instance_count: u32,
    },
    PushDebugGroup(String),
    PopDebugGroup,
}

impl RenderCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawIndexed { .. })
    }
}

/// One draw call and the state commands issued since the previous draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall<'a> {
    pub state: &'a [RenderCommand],
    pub command: &'a RenderCommand,
}

impl DrawCall<'_> {
    /// Fragment buffers bound at `index` before this draw.
    pub fn fragment_buffers_at(&self, index: u32) -> Vec<BufferId> {
        self.state
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetFragmentBuffer { index: i, buffer, .. } if *i == index => {
                    Some(*buffer)
                }
                _ => None,
            })
            .collect()
    }

    /// Vertex buffers bound at `index` before this draw.
    pub fn vertex_buffers_at(&self, index: u32) -> Vec<BufferId> {
        self.state
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetVertexBuffer { index: i, buffer, .. } if *i == index => {
                    Some(*buffer)
                }
                _ => None,
            })
            .collect()
    }

    pub fn cull_mode(&self) -> Option<CullMode> {
        self.state.iter().rev().find_map(|c| match c {
            RenderCommand::SetCullMode(mode) => Some(*mode),
            _ => None,
        })
    }

    pub fn instance_count(&self) -> u32 {
        match self.command {
            RenderCommand::Draw { instance_count, .. }
            | RenderCommand::DrawIndexed { instance_count, .. } => *instance_count,
            _ => 0,
        }
    }
}

/// A recorded render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassRecord {
    pub label: Option<String>,
    pub color: Option<AttachmentRecord>,
    pub depth: Option<AttachmentRecord>,
    pub stencil: Option<AttachmentRecord>,
    pub commands: Vec<RenderCommand>,
}

impl RenderPassRecord {
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Split the command stream into draw calls.
    pub fn draw_calls(&self) -> Vec<DrawCall<'_>> {
        let mut calls = Vec::new();
        let mut start = 0;
        for (i, command) in self.commands.iter().enumerate() {
            if command.is_draw() {
                calls.push(DrawCall {
                    state: &self.commands[start..i],
                    command,
                });
                start = i + 1;
            }
        }
        calls
    }

    /// Textures declared with [`RenderEncoder::use_texture`].
    pub fn used_textures(&self) -> Vec<TextureId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::UseTexture(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Buffers declared with [`RenderEncoder::use_buffer`].
    pub fn used_buffers(&self) -> Vec<BufferId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::UseBuffer(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

/// Records commands for one render pass. The pass is appended to its
/// command buffer when the encoder ends or is dropped.
pub struct RenderEncoder<'a> {
    passes: &'a mut Vec<EncodedPass>,
    record: Option<RenderPassRecord>,
}

impl<'a> RenderEncoder<'a> {
    pub(crate) fn new(passes: &'a mut Vec<EncodedPass>, record: RenderPassRecord) -> Self {
        Self {
            passes,
            record: Some(record),
        }
    }

    fn push(&mut self, command: RenderCommand) {
        if let Some(record) = self.record.as_mut() {
            record.commands.push(command);
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.record.as_ref().and_then(|r| r.label.as_deref())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(RenderCommand::SetViewport(viewport));
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.push(RenderCommand::SetCullMode(mode));
    }

    pub fn set_front_facing(&mut self, winding: Winding) {
        self.push(RenderCommand::SetFrontFacing(winding));
    }

    pub fn set_render_pipeline(&mut self, pipeline: &RenderPipeline) {
        self.push(RenderCommand::SetPipeline(pipeline.id()));
    }

    pub fn set_vertex_buffer(&mut self, buffer: &Buffer, offset: u64, index: u32) {
        self.push(RenderCommand::SetVertexBuffer {
            index,
            buffer: buffer.id(),
            offset,
        });
    }

    pub fn set_fragment_buffer(&mut self, buffer: &Buffer, offset: u64, index: u32) {
        self.push(RenderCommand::SetFragmentBuffer {
            index,
            buffer: buffer.id(),
            offset,
        });
    }

    pub fn set_fragment_texture(&mut self, texture: &Texture, index: u32) {
        self.push(RenderCommand::SetFragmentTexture {
            index,
            texture: texture.id(),
        });
    }

    pub fn use_texture(&mut self, texture: TextureId) {
        self.push(RenderCommand::UseTexture(texture));
    }

    pub fn use_buffer(&mut self, buffer: BufferId) {
        self.push(RenderCommand::UseBuffer(buffer));
    }

    pub fn draw_primitives(
        &mut self,
        primitive: PrimitiveType,
        vertex_start: u32,
        vertex_count: u32,
        instance_count: u32,
    ) {
        self.push(RenderCommand::Draw {
            primitive,
            vertex_start,
            vertex_count,
            instance_count,
        });
    }

    pub fn draw_indexed_primitives(
        &mut self,
        primitive: PrimitiveType,
        index_count: u32,
        index_buffer: &Buffer,
        index_offset: u64,
        instance_count: u32,
    ) {
        self.push(RenderCommand::DrawIndexed {
            primitive,
            index_count,
            index_buffer: index_buffer.id(),
            index_offset,
            instance_count,
        });
    }

    pub fn push_debug_group(&mut self, label: impl Into<String>) {
        self.push(RenderCommand::PushDebugGroup(label.into()));
    }

    pub fn pop_debug_group(&mut self) {
        self.push(RenderCommand::PopDebugGroup);
    }

    /// Close the pass.
    pub fn end_encoding(self) {}
}

impl Drop for RenderEncoder<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.passes.push(EncodedPass::Render(record));
        }
    }
}
