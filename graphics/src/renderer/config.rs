//! Renderer settings loadable from RON.

use serde::{Deserialize, Serialize};

use crate::types::{ClearColor, LoadAction, StoreAction};

/// Pass-level settings of a [`Renderer`](super::Renderer).
///
/// Every field has a default, so a RON document only needs the values it
/// changes:
///
/// ```ron
/// (
///     label: "Preview",
///     sort_objects: true,
///     clear_color: (r: 0.1, g: 0.1, b: 0.1, a: 1.0),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub label: String,
    /// Draw renderables by ascending render order instead of traversal order.
    pub sort_objects: bool,
    pub clear_color: ClearColor,
    pub clear_depth: f64,
    pub clear_stencil: u32,
    pub color_load_action: LoadAction,
    pub color_store_action: StoreAction,
    pub depth_load_action: LoadAction,
    pub depth_store_action: StoreAction,
    pub stencil_load_action: LoadAction,
    pub stencil_store_action: StoreAction,
    /// Map near to 1 and far to 0 in the viewport depth range.
    pub invert_viewport_near_far: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            label: "Lumen Renderer".to_string(),
            sort_objects: false,
            clear_color: ClearColor::BLACK,
            clear_depth: 1.0,
            clear_stencil: 0,
            color_load_action: LoadAction::Clear,
            color_store_action: StoreAction::Store,
            depth_load_action: LoadAction::Clear,
            depth_store_action: StoreAction::DontCare,
            stencil_load_action: LoadAction::Clear,
            stencil_store_action: StoreAction::DontCare,
            invert_viewport_near_far: false,
        }
    }
}

impl RendererConfig {
    pub fn from_ron(document: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(document)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
