//! Command recording.
//!
//! A [`CommandBuffer`] collects render, compute and blit passes. Each pass
//! is recorded through a short-lived encoder borrowed from the buffer, so
//! only one pass can be open at a time and passes land in submission order.

mod command_buffer;
mod compute;
mod pass_descriptor;
mod render;

pub use command_buffer::{CommandBuffer, EncodedPass};
pub use compute::{
    BlitCopy, BlitEncoder, BlitPassRecord, ComputeCommand, ComputeEncoder, ComputePassRecord,
};
pub use pass_descriptor::{
    AttachmentRecord, ColorAttachment, DepthAttachment, RenderPassDescriptor, StencilAttachment,
};
pub use render::{DrawCall, RenderCommand, RenderEncoder, RenderPassRecord};
