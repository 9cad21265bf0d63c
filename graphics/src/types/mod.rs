//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the renderer.

mod buffer;
mod common;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{
    ClearColor, CullMode, Extent3d, LoadAction, PrimitiveType, StoreAction, Viewport, Winding,
};
pub use texture::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
