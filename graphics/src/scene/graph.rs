//! Arena-backed scene tree.

use glam::{Mat3, Mat4};

use super::node::{Node, NodeId};
use super::Renderable;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("Node {0:?} does not exist")]
    InvalidNode(NodeId),

    #[error("Node {0:?} cannot be its own ancestor")]
    Cycle(NodeId),

    #[error("The root node cannot be reparented or removed")]
    Root,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Tree of [`Node`]s.
///
/// Nodes are owned by the scene and addressed by [`NodeId`]. Children hold
/// no back-pointer; the parent link is an index into the same arena. Nodes
/// inserted with [`Scene::insert`] stay detached (and out of traversal)
/// until attached with [`Scene::add_child`].
pub struct Scene {
    label: String,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Scene {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let mut scene = Self {
            label: label.clone(),
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        scene.root = scene.insert(Node::new(label));
        scene
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Store a detached node.
    pub fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Store a node as a child of the root.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = self.insert(node);
        // The root is always live and a fresh node has no children.
        let _ = self.add_child(self.root, id);
        id
    }

    /// Store a node as a child of `parent`.
    pub fn add_to(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::InvalidNode(parent));
        }
        let id = self.insert(node);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::Root);
        }
        if !self.contains(parent) {
            return Err(SceneError::InvalidNode(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::InvalidNode(child));
        }
        if self.ancestors(parent).any(|id| id == child) || parent == child {
            return Err(SceneError::Cycle(child));
        }

        self.detach(child);
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
            node.touch();
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The child stays alive, detached.
    ///
    /// Returns false when `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.get(child) {
            Some(node) if node.parent == Some(parent) => {
                self.detach(child);
                true
            }
            _ => false,
        }
    }

    /// Remove a node and its whole subtree, returning the node itself.
    pub fn remove(&mut self, id: NodeId) -> Result<Node, SceneError> {
        if id == self.root {
            return Err(SceneError::Root);
        }
        if !self.contains(id) {
            return Err(SceneError::InvalidNode(id));
        }
        self.detach(id);

        let mut stack = self.get(id).map(|n| n.children.clone()).unwrap_or_default();
        while let Some(next) = stack.pop() {
            if let Some(node) = self.take(next) {
                stack.extend(node.children);
            }
        }
        self.take(id).ok_or(SceneError::InvalidNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Iterate the ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(id).and_then(Node::parent);
        std::iter::from_fn(move || {
            let next = current?;
            current = self.get(next).and_then(Node::parent);
            Some(next)
        })
    }

    /// Latest revision along the chain from the top-most ancestor to `id`.
    ///
    /// Changes whenever the node or any ancestor is moved or reparented.
    pub fn world_revision(&self, id: NodeId) -> u64 {
        let own = self.get(id).map_or(0, |n| n.revision);
        self.ancestors(id)
            .filter_map(|a| self.get(a))
            .fold(own, |acc, n| acc.max(n.revision))
    }

    /// Composed matrix from the top-most ancestor down to `id`.
    ///
    /// Computed lazily and cached per node; a cache entry is valid while the
    /// chain revision it was computed for is unchanged.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.get(id)?;
        let mut chain: Vec<NodeId> = self.ancestors(id).collect();
        chain.reverse();
        chain.push(id);

        let mut key = 0u64;
        let mut world = Mat4::IDENTITY;
        for (depth, node_id) in chain.into_iter().enumerate() {
            let node = self.get(node_id)?;
            key = key.max(node.revision);
            if let Some((cached_key, cached)) = node.world_cache.get() {
                if cached_key == key {
                    world = cached;
                    continue;
                }
            }
            world = if depth == 0 {
                node.local_matrix()
            } else {
                world * node.local_matrix()
            };
            node.world_cache.set(Some((key, world)));
        }
        Some(world)
    }

    pub fn normal_matrix(&self, id: NodeId) -> Option<Mat3> {
        self.world_matrix(id)
            .map(|world| lumen_core::math::normal_matrix(&world))
    }

    /// Whether `id` and all its ancestors are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::visible)
            && self
                .ancestors(id)
                .all(|a| self.get(a).is_some_and(Node::visible))
    }

    /// Depth-first, pre-order walk from the root.
    ///
    /// The callback receives each node with its effective visibility (the
    /// node's own flag AND every ancestor's). Invisible subtrees are still
    /// visited.
    pub fn traverse(&self, mut visit: impl FnMut(NodeId, &Node, bool)) {
        self.traverse_from(self.root, &mut visit);
    }

    pub fn traverse_from(&self, start: NodeId, visit: &mut impl FnMut(NodeId, &Node, bool)) {
        let parent_visible = self
            .get(start)
            .and_then(Node::parent)
            .map_or(true, |p| self.is_visible(p));

        let mut stack = vec![(start, parent_visible)];
        while let Some((id, inherited)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            let visible = inherited && node.visible();
            visit(id, node, visible);
            stack.extend(node.children.iter().rev().map(|&c| (c, visible)));
        }
    }

    /// Ids in traversal order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.len());
        self.traverse(|id, _, _| ids.push(id));
        ids
    }

    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(|id, node, _| {
            if found.is_none() && node.label() == label {
                found = Some(id);
            }
        });
        found
    }

    /// Downcast the renderable of `id` to a concrete type.
    pub fn renderable_as<T: Renderable>(&self, id: NodeId) -> Option<&T> {
        self.get(id)?.renderable()?.as_any().downcast_ref::<T>()
    }

    pub fn renderable_as_mut<T: Renderable>(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id)?
            .renderable_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.get(child).and_then(Node::parent) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
            node.touch();
        }
    }

    fn take(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        self.free.push(id.index);
        Some(node)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Scene")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3, Vec4};
    use lumen_core::math::mat4_approx_eq;

    #[test]
    fn test_world_matrix_composes_ancestors() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a").with_position(Vec3::new(1.0, 0.0, 0.0)));
        let b = scene
            .add_to(a, Node::new("b").with_position(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();

        let world = scene.world_matrix(b).unwrap();
        assert_eq!(world.w_axis, Vec4::new(1.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn test_world_matrix_tracks_ancestor_changes() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a"));
        let b = scene
            .add_to(a, Node::new("b").with_position(Vec3::X))
            .unwrap();
        let _ = scene.world_matrix(b);

        scene
            .get_mut(a)
            .unwrap()
            .set_orientation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let world = scene.world_matrix(b).unwrap();
        let p = world.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_reparent_changes_world_matrix() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a").with_position(Vec3::X));
        let b = scene.add(Node::new("b").with_position(Vec3::Z));
        let c = scene.add_to(a, Node::new("c")).unwrap();
        assert_eq!(scene.world_matrix(c).unwrap().w_axis.truncate(), Vec3::X);

        scene.add_child(b, c).unwrap();
        assert_eq!(scene.get(c).unwrap().parent(), Some(b));
        assert!(scene.get(a).unwrap().children().is_empty());
        assert_eq!(scene.world_matrix(c).unwrap().w_axis.truncate(), Vec3::Z);
    }

    #[test]
    fn test_remove_child_detaches() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a").with_position(Vec3::X));
        let b = scene.add_to(a, Node::new("b")).unwrap();
        assert!(scene.remove_child(a, b));
        assert!(!scene.remove_child(a, b));
        assert!(scene.contains(b));
        assert!(mat4_approx_eq(&scene.world_matrix(b).unwrap(), &Mat4::IDENTITY, 1e-6));
        assert!(!scene.node_ids().contains(&b));
    }

    #[test]
    fn test_remove_subtree_invalidates_handles() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a"));
        let b = scene.add_to(a, Node::new("b")).unwrap();
        let removed = scene.remove(a).unwrap();
        assert_eq!(removed.label(), "a");
        assert!(!scene.contains(a));
        assert!(!scene.contains(b));

        let reused = scene.insert(Node::new("c"));
        assert!(scene.get(a).is_none());
        assert!(scene.contains(reused));
    }

    #[test]
    fn test_cycles_rejected() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a"));
        let b = scene.add_to(a, Node::new("b")).unwrap();
        assert_eq!(scene.add_child(b, a), Err(SceneError::Cycle(a)));
        assert_eq!(scene.add_child(a, a), Err(SceneError::Cycle(a)));
        assert_eq!(scene.remove(scene.root()).unwrap_err(), SceneError::Root);
    }

    #[test]
    fn test_traverse_is_preorder_with_inherited_visibility() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a"));
        let a1 = scene.add_to(a, Node::new("a1")).unwrap();
        let b = scene.add(Node::new("b"));
        scene.get_mut(a).unwrap().set_visible(false);

        let mut order = Vec::new();
        scene.traverse(|id, _, visible| order.push((id, visible)));
        assert_eq!(
            order,
            vec![(scene.root(), true), (a, false), (a1, false), (b, true)]
        );
        assert!(!scene.is_visible(a1));
        assert_eq!(scene.find_by_label("a1"), Some(a1));
    }

    #[test]
    fn test_world_revision_changes_with_ancestor() {
        let mut scene = Scene::new("s");
        let a = scene.add(Node::new("a"));
        let b = scene.add_to(a, Node::new("b")).unwrap();
        let before = scene.world_revision(b);
        scene.get_mut(a).unwrap().translate(Vec3::Y);
        assert!(scene.world_revision(b) > before);
    }
}
