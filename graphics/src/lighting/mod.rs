//! Lights, shadows and their per-frame GPU buffers.
//!
//! - [`Light`] - the light facet of a scene node
//! - [`Shadow`] - shadow camera and depth map owned by a light
//! - [`LightAggregator`] / [`ShadowAggregator`] - packed arrays rebuilt on
//!   count changes and rewritten in place on content changes

mod aggregator;
mod light;
mod shadow;

pub use aggregator::{AggregateUpdate, LightAggregator, ShadowAggregator, ShadowUpdate};
pub use light::{Light, LightData, LightKind};
pub use shadow::{Shadow, ShadowData, DEFAULT_SHADOW_RESOLUTION};
