//! # Lumen Graphics
//!
//! The core of the Lumen real-time renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsDevice`] - resource creation on top of a [`GpuBackend`]
//! - [`Scene`] - the node tree with lazily derived world matrices
//! - [`UniformRing`] - per-frame uniform slots over [`MAX_FRAMES_IN_FLIGHT`] frames
//! - [`TextureComputeSystem`] - ping-pong compute over storage textures
//! - [`LightAggregator`] / [`ShadowAggregator`] - packed light and shadow buffers
//! - [`Renderer`] - the frame driver tying them together
//! - A [`DummyBackend`] that records command buffers, for tests and headless runs
//!
//! ## Example
//!
//! ```ignore
//! use lumen_graphics::*;
//!
//! let device = GraphicsDevice::dummy();
//! let mut renderer = Renderer::new(RenderContext::new(device.clone()))?;
//! renderer.resize(1280, 720);
//!
//! let mut command_buffer = device.create_command_buffer("Frame");
//! renderer.draw(&mut descriptor, &mut command_buffer, &mut scene, &mut camera)?;
//! device.submit(command_buffer)?;
//! ```

pub mod backend;
pub mod bindings;
pub mod compute;
pub mod device;
pub mod encoder;
pub mod error;
pub mod lighting;
pub mod materials;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod types;

// Re-export main types for convenience
pub use backend::{DummyBackend, GpuBackend};
pub use compute::{ComputeSystem, ResetState, TextureComputeSystem};
pub use device::{DeviceCapabilities, GraphicsDevice};
pub use encoder::{CommandBuffer, ComputeEncoder, RenderEncoder, RenderPassDescriptor};
pub use error::GraphicsError;
pub use lighting::{Light, LightAggregator, LightKind, Shadow, ShadowAggregator};
pub use materials::{BasicColorMaterial, BasicTextureMaterial, Material, StandardMaterial};
pub use mesh::{Geometry, InstancedMesh, Mesh, Submesh};
pub use pipeline::{ComputePipeline, RenderPipeline, ShaderProgram};
pub use renderer::{RenderContext, Renderer, RendererConfig};
pub use resources::{Buffer, StructBuffer, Texture, UniformRing, MAX_FRAMES_IN_FLIGHT};
pub use scene::{Camera, Node, NodeId, Renderable, Scene};
pub use types::{
    BufferDescriptor, BufferUsage, ClearColor, CullMode, Extent3d, TextureDescriptor,
    TextureFormat, TextureUsage, Viewport,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version. Call once at startup.
pub fn init() {
    log::info!("Lumen Graphics v{} initialized", VERSION);
}
