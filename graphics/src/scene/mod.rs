//! Scene graph.
//!
//! - [`Scene`] - arena of [`Node`]s forming a tree, addressed by [`NodeId`]
//! - [`Node`] - local transform with optional renderable and light facets
//! - [`Renderable`] - the drawing facet
//! - [`Camera`] - view and projection

mod camera;
mod graph;
mod node;
mod renderable;

pub use camera::{Camera, Projection};
pub use graph::{Scene, SceneError};
pub use node::{Node, NodeId};
pub use renderable::Renderable;
