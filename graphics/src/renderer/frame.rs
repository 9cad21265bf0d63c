//! Per-frame node lists.

use crate::scene::{NodeId, Scene};

/// Nodes collected by one scene traversal.
///
/// Rebuilt at the start of every frame; ids are only meaningful for the
/// scene they were collected from.
#[derive(Debug, Default, Clone)]
pub struct FrameLists {
    /// Every node, visible or not, in traversal order.
    pub objects: Vec<NodeId>,
    /// Visible nodes with a renderable.
    pub renderables: Vec<NodeId>,
    /// Visible nodes with a light.
    pub lights: Vec<NodeId>,
    /// Visible lights that cast shadows.
    pub shadows: Vec<NodeId>,
    pub shadow_casters: Vec<NodeId>,
    pub shadow_receivers: Vec<NodeId>,
}

impl FrameLists {
    pub fn clear(&mut self) {
        self.objects.clear();
        self.renderables.clear();
        self.lights.clear();
        self.shadows.clear();
        self.shadow_casters.clear();
        self.shadow_receivers.clear();
    }

    /// Clear and refill from a depth-first walk of `scene`.
    pub fn collect(&mut self, scene: &Scene) {
        self.clear();
        scene.traverse(|id, node, visible| {
            self.objects.push(id);
            if !visible {
                return;
            }
            if let Some(light) = node.light() {
                self.lights.push(id);
                if light.cast_shadow() {
                    self.shadows.push(id);
                }
            }
            if let Some(renderable) = node.renderable() {
                self.renderables.push(id);
                if renderable.receive_shadow() {
                    self.shadow_receivers.push(id);
                }
                if renderable.cast_shadow() {
                    self.shadow_casters.push(id);
                }
            }
        });
    }

    /// Whether a shadow pass can affect anything this frame.
    pub fn shadows_possible(&self) -> bool {
        !self.shadows.is_empty()
            && !self.shadow_casters.is_empty()
            && !self.shadow_receivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::Light;
    use crate::scene::Node;
    use glam::Vec3;

    #[test]
    fn test_hidden_subtree_is_excluded() {
        let mut scene = Scene::new("scene");
        let group = scene.add(Node::new("group"));
        let light = scene
            .add_to(group, Node::new("sun").with_light(Light::directional(Vec3::ONE, 1.0)))
            .unwrap();
        scene.add(Node::new("lamp").with_light(Light::point(Vec3::ONE, 1.0, 5.0)));

        let mut lists = FrameLists::default();
        lists.collect(&scene);
        assert_eq!(lists.objects.len(), 4);
        assert_eq!(lists.lights.len(), 2);

        scene.get_mut(group).unwrap().set_visible(false);
        lists.collect(&scene);
        assert_eq!(lists.objects.len(), 4);
        assert_eq!(lists.lights.len(), 1);
        assert!(!lists.lights.contains(&light));
    }

    #[test]
    fn test_shadow_lights() {
        let mut scene = Scene::new("scene");
        scene.add(
            Node::new("sun").with_light(Light::directional(Vec3::ONE, 1.0).with_cast_shadow(true)),
        );
        scene.add(Node::new("lamp").with_light(Light::point(Vec3::ONE, 1.0, 5.0).with_cast_shadow(true)));
        let mut lists = FrameLists::default();
        lists.collect(&scene);
        assert_eq!(lists.shadows.len(), 1);
        assert!(!lists.shadows_possible());
    }
}
