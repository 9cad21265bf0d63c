//! GPU compute systems advanced once per frame by the renderer.

mod texture_compute;

pub use texture_compute::{
    threadgroups_per_grid, threads_per_threadgroup, ComputeHook, ResetState, TextureComputeSystem,
};

use std::any::Any;

use crate::encoder::CommandBuffer;
use crate::error::GraphicsError;

/// Work encoded into the frame's command buffer before any render pass.
pub trait ComputeSystem: Any {
    fn label(&self) -> &str;

    /// Encode this frame's dispatches.
    fn update(&mut self, command_buffer: &mut CommandBuffer) -> Result<(), GraphicsError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
