//! Meshes.
//!
//! - [`Geometry`] - flat vertex/index data uploaded lazily
//! - [`Mesh`] - geometry plus material(s), optionally split into [`Submesh`]es
//! - [`InstancedMesh`] - a mesh drawn once per instance matrix

mod geometry;
mod instanced;
mod mesh;

pub use geometry::{Geometry, Vertex};
pub use instanced::InstancedMesh;
pub use mesh::{Mesh, Submesh};
