//! GPU resources.
//!
//! This module contains the GPU resource types created through
//! [`GraphicsDevice`] and the per-frame uniform storage built on them:
//! - [`Buffer`] - GPU memory buffer
//! - [`Texture`] - GPU texture/image
//! - [`UniformRing`] - fixed-slot ring over [`MAX_FRAMES_IN_FLIGHT`] frames
//! - [`StructBuffer`] - typed array uploaded once per frame
//! - [`VertexUniformBuffer`] / [`InstanceMatrixUniformBuffer`] - per-object uniforms
//! - [`ArgumentBuffer`] - argument table referencing many resources from one slot
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice

mod argument_buffer;
mod buffer;
mod instance_uniforms;
mod ring_buffer;
mod struct_buffer;
mod texture;
mod vertex_uniforms;

pub use argument_buffer::{
    ArgumentBuffer, ArgumentDescriptor, ArgumentKind, ArgumentLayout, ARGUMENT_ENTRY_SIZE,
};
pub use buffer::Buffer;
pub use instance_uniforms::{InstanceMatrixUniformBuffer, InstanceMatrixUniforms};
pub use ring_buffer::{UniformRing, MAX_FRAMES_IN_FLIGHT, UNIFORM_ALIGNMENT};
pub use struct_buffer::StructBuffer;
pub use texture::Texture;
pub use vertex_uniforms::{VertexUniformBuffer, VertexUniforms};
