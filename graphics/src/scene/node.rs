//! Scene nodes.

use std::cell::Cell;

use glam::{Mat4, Quat, Vec3};
use lumen_core::{next_revision, Transform};

use crate::lighting::Light;
use crate::scene::Renderable;

/// Handle of a node inside a [`Scene`](crate::scene::Scene).
///
/// Handles carry a generation so a handle to a removed node never resolves
/// to a node later stored in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// A node of the scene tree.
///
/// A node is a transform plus an optional renderable facet and an optional
/// light facet. Every transform setter stamps a new revision, which is what
/// invalidates cached world matrices of the node and its descendants.
pub struct Node {
    label: String,
    transform: Transform,
    visible: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) revision: u64,
    pub(crate) world_cache: Cell<Option<(u64, Mat4)>>,
    renderable: Option<Box<dyn Renderable>>,
    light: Option<Light>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            transform: Transform::IDENTITY,
            visible: true,
            parent: None,
            children: Vec::new(),
            revision: next_revision(),
            world_cache: Cell::new(None),
            renderable: None,
            light: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.set_transform(transform);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_renderable(mut self, renderable: impl Renderable) -> Self {
        self.renderable = Some(Box::new(renderable));
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.touch();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.touch();
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.transform.orientation = orientation;
        self.touch();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.touch();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.transform.translate(delta);
        self.touch();
    }

    pub fn rotate(&mut self, rotation: Quat) {
        self.transform.rotate(rotation);
        self.touch();
    }

    /// Orient the local -Z axis towards `target` (in parent space).
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.transform.look_at(target, up);
        self.touch();
    }

    /// Local matrix.
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn renderable(&self) -> Option<&dyn Renderable> {
        self.renderable.as_deref()
    }

    pub fn renderable_mut(&mut self) -> Option<&mut (dyn Renderable + 'static)> {
        self.renderable.as_deref_mut()
    }

    pub fn set_renderable(&mut self, renderable: Option<Box<dyn Renderable>>) {
        self.renderable = renderable;
    }

    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        self.light.as_mut()
    }

    pub fn set_light(&mut self, light: Option<Light>) {
        self.light = light;
    }

    pub(crate) fn touch(&mut self) {
        self.revision = next_revision();
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label)
            .field("visible", &self.visible)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .field("renderable", &self.renderable.as_ref().map(|r| r.label().to_string()))
            .field("light", &self.light.as_ref().map(Light::kind))
            .finish()
    }
}
