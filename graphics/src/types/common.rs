//! Common types shared across the renderer.

use glam::Vec4;
use serde::{Deserialize, Serialize};

// ============================================================================
// Viewport
// ============================================================================

/// Viewport configuration for rendering.
///
/// Depth range is `[0, 1]`. Setting `min_depth > max_depth` inverts depth,
/// which the renderer uses for reversed-Z output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Viewport {
    /// Create a new viewport with standard `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Create a viewport from dimensions with origin at (0, 0).
    pub fn from_dimensions(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Set the depth range.
    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// `(x, y, width, height)` as uploaded in vertex uniforms.
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(self.x, self.y, self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

// ============================================================================
// Extent3d
// ============================================================================

/// 3D extent for textures and dispatch grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    /// Depth in pixels (1 for 2D textures).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Create a new 3D extent.
    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

// ============================================================================
// Attachment actions
// ============================================================================

/// RGBA clear color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Action performed on an attachment when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadAction {
    #[default]
    Clear,
    Load,
    DontCare,
}

/// Action performed on an attachment when a render pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StoreAction {
    #[default]
    Store,
    DontCare,
    MultisampleResolve,
    StoreAndMultisampleResolve,
}

impl StoreAction {
    /// The action to use when the attachment is multisampled and resolved.
    pub fn resolving(self) -> Self {
        match self {
            Self::Store | Self::StoreAndMultisampleResolve => Self::StoreAndMultisampleResolve,
            Self::DontCare | Self::MultisampleResolve => Self::MultisampleResolve,
        }
    }

    /// The action to use when the attachment is single sampled.
    pub fn unresolved(self) -> Self {
        match self {
            Self::Store | Self::StoreAndMultisampleResolve => Self::Store,
            Self::DontCare | Self::MultisampleResolve => Self::DontCare,
        }
    }
}

// ============================================================================
// Rasterizer state
// ============================================================================

/// Which faces are discarded by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Front face winding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Winding {
    Clockwise,
    #[default]
    CounterClockwise,
}

/// Primitive topology for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    Point,
    Line,
    LineStrip,
    #[default]
    Triangle,
    TriangleStrip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_vec4() {
        let vp = Viewport::from_dimensions(800.0, 600.0);
        assert_eq!(vp.to_vec4(), Vec4::new(0.0, 0.0, 800.0, 600.0));
        assert!((vp.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_store_action_resolving() {
        assert_eq!(StoreAction::Store.resolving(), StoreAction::StoreAndMultisampleResolve);
        assert_eq!(StoreAction::DontCare.resolving(), StoreAction::MultisampleResolve);
        assert_eq!(StoreAction::StoreAndMultisampleResolve.unresolved(), StoreAction::Store);
        assert_eq!(StoreAction::MultisampleResolve.unresolved(), StoreAction::DontCare);
    }

    #[test]
    fn test_extent_empty() {
        assert!(Extent3d::new_2d(0, 4).is_empty());
        assert!(!Extent3d::new_3d(1, 1, 1).is_empty());
    }
}
