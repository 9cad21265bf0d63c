//! Per-frame light and shadow buffers.
//!
//! Both aggregators follow the same policy: allocation and layout depend
//! only on the number of entries, so a count change rebuilds the buffers
//! and re-subscribes to every entry; otherwise only entries whose change
//! counters moved cause a rewrite, and nothing is written when nothing
//! changed.

use std::sync::Arc;

use glam::Mat4;
use lumen_core::ChangeCursor;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{ArgumentBuffer, ArgumentLayout, Buffer, StructBuffer};
use crate::scene::{NodeId, Scene};

use super::{Light, LightData, Shadow, ShadowData};

/// What an aggregate update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateUpdate {
    Unchanged,
    /// Contents rewritten in the existing allocation.
    Rewritten,
    /// Reallocated for a new count and rewritten.
    Rebuilt,
}

impl AggregateUpdate {
    pub fn changed(&self) -> bool {
        *self != Self::Unchanged
    }
}

#[derive(Debug)]
struct LightSubscription {
    node: NodeId,
    light: ChangeCursor,
    world_revision: u64,
}

impl LightSubscription {
    fn new(scene: &Scene, node: NodeId) -> Self {
        let light = light_of(scene, node)
            .map(|l| ChangeCursor::observing(l.changes()))
            .unwrap_or_default();
        Self {
            node,
            light,
            world_revision: scene.world_revision(node),
        }
    }

    /// Consume pending changes; true if there were any.
    fn consume(&mut self, scene: &Scene) -> bool {
        let light_changed = light_of(scene, self.node)
            .map(|l| self.light.consume(l.changes()))
            .unwrap_or(false);
        let revision = scene.world_revision(self.node);
        let moved = revision != self.world_revision;
        self.world_revision = revision;
        light_changed || moved
    }
}

fn light_of(scene: &Scene, node: NodeId) -> Option<&Light> {
    scene.get(node)?.light()
}

fn shadow_of(scene: &Scene, node: NodeId) -> Option<&Shadow> {
    light_of(scene, node)?.shadow()
}

/// Packed [`LightData`] array of every light in the frame.
#[derive(Debug, Default)]
pub struct LightAggregator {
    buffer: Option<StructBuffer<LightData>>,
    subscriptions: Vec<LightSubscription>,
    scratch: Vec<LightData>,
}

impl LightAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the buffer in line with `lights` (nodes carrying a light, in
    /// traversal order).
    pub fn update(
        &mut self,
        device: &Arc<GraphicsDevice>,
        scene: &Scene,
        lights: &[NodeId],
    ) -> Result<AggregateUpdate, GraphicsError> {
        if lights.len() != self.subscriptions.len() {
            self.subscriptions = lights
                .iter()
                .map(|&node| LightSubscription::new(scene, node))
                .collect();
            self.buffer = if lights.is_empty() {
                None
            } else {
                Some(StructBuffer::new(device, lights.len(), "Light Data")?)
            };
            log::debug!("LightAggregator: rebuilt for {} lights", lights.len());
            self.write(scene)?;
            return Ok(AggregateUpdate::Rebuilt);
        }

        let same_members = self
            .subscriptions
            .iter()
            .zip(lights)
            .all(|(subscription, &node)| subscription.node == node);
        if !same_members {
            self.subscriptions = lights
                .iter()
                .map(|&node| LightSubscription::new(scene, node))
                .collect();
            self.write(scene)?;
            return Ok(AggregateUpdate::Rewritten);
        }

        let mut dirty = false;
        for subscription in &mut self.subscriptions {
            dirty |= subscription.consume(scene);
        }
        if dirty {
            self.write(scene)?;
            Ok(AggregateUpdate::Rewritten)
        } else {
            Ok(AggregateUpdate::Unchanged)
        }
    }

    fn write(&mut self, scene: &Scene) -> Result<(), GraphicsError> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(());
        };
        self.scratch.clear();
        self.scratch.extend(self.subscriptions.iter().map(|s| {
            let world = scene.world_matrix(s.node).unwrap_or(Mat4::IDENTITY);
            light_of(scene, s.node)
                .map(|light| light.data(&world))
                .unwrap_or_default()
        }));
        buffer.update(&self.scratch)
    }

    pub fn count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn buffer(&self) -> Option<&Arc<Buffer>> {
        self.buffer.as_ref().map(StructBuffer::buffer)
    }

    /// Offset of the region written last.
    pub fn offset(&self) -> u64 {
        self.buffer.as_ref().map_or(0, StructBuffer::offset)
    }

    /// Read back the current contents.
    pub fn read(&self) -> Result<Vec<LightData>, GraphicsError> {
        match &self.buffer {
            Some(buffer) => buffer.read(),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug)]
struct ShadowSubscription {
    node: NodeId,
    matrix: ChangeCursor,
    data: ChangeCursor,
    texture: ChangeCursor,
}

impl ShadowSubscription {
    fn new(scene: &Scene, node: NodeId) -> Self {
        match shadow_of(scene, node) {
            Some(shadow) => Self {
                node,
                matrix: ChangeCursor::observing(shadow.matrix_changes()),
                data: ChangeCursor::observing(shadow.data_changes()),
                texture: ChangeCursor::observing(shadow.texture_changes()),
            },
            None => Self {
                node,
                matrix: ChangeCursor::default(),
                data: ChangeCursor::default(),
                texture: ChangeCursor::default(),
            },
        }
    }
}

/// Outcome of a [`ShadowAggregator::update`] per buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowUpdate {
    pub matrices: AggregateUpdate,
    pub data: AggregateUpdate,
    pub textures: AggregateUpdate,
}

/// Shadow matrices, shadow data and the argument table binding the data
/// buffer (entry 0) and each shadow map (entries `1..=N`).
#[derive(Debug, Default)]
pub struct ShadowAggregator {
    matrices: Option<StructBuffer<Mat4>>,
    data: Option<StructBuffer<ShadowData>>,
    arguments: Option<ArgumentBuffer>,
    subscriptions: Vec<ShadowSubscription>,
}

impl ShadowAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the buffers in line with `shadows` (nodes whose light casts
    /// shadows, in traversal order). Shadows must already be prepared.
    pub fn update(
        &mut self,
        device: &Arc<GraphicsDevice>,
        scene: &Scene,
        shadows: &[NodeId],
    ) -> Result<ShadowUpdate, GraphicsError> {
        if shadows.len() != self.subscriptions.len() {
            self.rebuild(device, scene, shadows)?;
            return Ok(ShadowUpdate {
                matrices: AggregateUpdate::Rebuilt,
                data: AggregateUpdate::Rebuilt,
                textures: AggregateUpdate::Rebuilt,
            });
        }

        let same_members = self
            .subscriptions
            .iter()
            .zip(shadows)
            .all(|(subscription, &node)| subscription.node == node);
        if !same_members {
            self.subscriptions = shadows
                .iter()
                .map(|&node| ShadowSubscription::new(scene, node))
                .collect();
            self.write_matrices(scene)?;
            self.write_data(scene)?;
            self.write_textures(scene)?;
            return Ok(ShadowUpdate {
                matrices: AggregateUpdate::Rewritten,
                data: AggregateUpdate::Rewritten,
                textures: AggregateUpdate::Rewritten,
            });
        }

        let (mut matrices, mut data, mut textures) = (false, false, false);
        for subscription in &mut self.subscriptions {
            if let Some(shadow) = shadow_of(scene, subscription.node) {
                matrices |= subscription.matrix.consume(shadow.matrix_changes());
                data |= subscription.data.consume(shadow.data_changes());
                textures |= subscription.texture.consume(shadow.texture_changes());
            }
        }

        let outcome = |changed: bool| {
            if changed {
                AggregateUpdate::Rewritten
            } else {
                AggregateUpdate::Unchanged
            }
        };
        if matrices {
            self.write_matrices(scene)?;
        }
        if data {
            self.write_data(scene)?;
        }
        if textures {
            self.write_textures(scene)?;
        }
        Ok(ShadowUpdate {
            matrices: outcome(matrices),
            data: outcome(data),
            textures: outcome(textures),
        })
    }

    fn rebuild(
        &mut self,
        device: &Arc<GraphicsDevice>,
        scene: &Scene,
        shadows: &[NodeId],
    ) -> Result<(), GraphicsError> {
        let count = shadows.len();
        self.subscriptions = shadows
            .iter()
            .map(|&node| ShadowSubscription::new(scene, node))
            .collect();

        if count == 0 {
            self.matrices = None;
            self.data = None;
            self.arguments = None;
        } else {
            self.matrices = Some(StructBuffer::new(device, count, "Shadow Matrices")?);
            self.data = Some(StructBuffer::new(device, count, "Shadow Data")?);
            let layout = ArgumentLayout::new()
                .with_buffer(0)
                .with_textures(1, count as u32);
            self.arguments = Some(ArgumentBuffer::new(device, layout, "Shadows")?);
        }
        log::debug!("ShadowAggregator: rebuilt for {} shadows", count);

        self.write_matrices(scene)?;
        self.write_data(scene)?;
        self.write_textures(scene)
    }

    fn write_matrices(&mut self, scene: &Scene) -> Result<(), GraphicsError> {
        let Some(buffer) = self.matrices.as_mut() else {
            return Ok(());
        };
        let matrices: Vec<Mat4> = self
            .subscriptions
            .iter()
            .map(|s| shadow_of(scene, s.node).map_or(Mat4::IDENTITY, Shadow::matrix))
            .collect();
        buffer.update(&matrices)
    }

    fn write_data(&mut self, scene: &Scene) -> Result<(), GraphicsError> {
        let (Some(buffer), Some(arguments)) = (self.data.as_mut(), self.arguments.as_mut()) else {
            return Ok(());
        };
        let data: Vec<ShadowData> = self
            .subscriptions
            .iter()
            .map(|s| shadow_of(scene, s.node).map_or_else(ShadowData::default, Shadow::data))
            .collect();
        buffer.update(&data)?;
        // The data region moved with the update.
        arguments.set_buffer(0, buffer.buffer(), buffer.offset())
    }

    fn write_textures(&mut self, scene: &Scene) -> Result<(), GraphicsError> {
        let Some(arguments) = self.arguments.as_mut() else {
            return Ok(());
        };
        for (slot, subscription) in self.subscriptions.iter().enumerate() {
            let texture = shadow_of(scene, subscription.node).and_then(Shadow::texture);
            arguments.set_texture(slot as u32 + 1, texture.map(|t| t.as_ref()))?;
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Light-space matrices, bound to the vertex stage of receivers.
    pub fn matrices(&self) -> Option<&StructBuffer<Mat4>> {
        self.matrices.as_ref()
    }

    /// Per-light shadow parameters, reached through the argument table.
    pub fn data(&self) -> Option<&StructBuffer<ShadowData>> {
        self.data.as_ref()
    }

    /// Argument table bound to the fragment stage of receivers.
    pub fn arguments(&self) -> Option<&ArgumentBuffer> {
        self.arguments.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Node;
    use glam::Vec3;

    fn scene_with_lights(count: usize) -> (Scene, Vec<NodeId>) {
        let mut scene = Scene::new("lights");
        let ids = (0..count)
            .map(|i| {
                scene.add(
                    Node::new(format!("light {i}"))
                        .with_light(Light::directional(Vec3::ONE, 1.0)),
                )
            })
            .collect();
        (scene, ids)
    }

    #[test]
    fn test_count_change_rebuilds() {
        let device = GraphicsDevice::dummy();
        let (scene, ids) = scene_with_lights(2);
        let mut lights = LightAggregator::new();
        assert_eq!(
            lights.update(&device, &scene, &ids[..1]).unwrap(),
            AggregateUpdate::Rebuilt
        );
        let first = lights.buffer().unwrap().id();
        assert_eq!(
            lights.update(&device, &scene, &ids).unwrap(),
            AggregateUpdate::Rebuilt
        );
        assert_ne!(lights.buffer().unwrap().id(), first);
        assert_eq!(lights.read().unwrap().len(), 2);
    }

    #[test]
    fn test_color_change_rewrites_in_place() {
        let device = GraphicsDevice::dummy();
        let (mut scene, ids) = scene_with_lights(1);
        let mut lights = LightAggregator::new();
        lights.update(&device, &scene, &ids).unwrap();
        let buffer = lights.buffer().unwrap().id();
        let before = lights.read().unwrap();

        assert_eq!(
            lights.update(&device, &scene, &ids).unwrap(),
            AggregateUpdate::Unchanged
        );

        scene
            .get_mut(ids[0])
            .and_then(Node::light_mut)
            .unwrap()
            .set_color(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(
            lights.update(&device, &scene, &ids).unwrap(),
            AggregateUpdate::Rewritten
        );
        assert_eq!(lights.buffer().unwrap().id(), buffer);
        assert_ne!(lights.read().unwrap(), before);
    }

    #[test]
    fn test_transform_change_rewrites() {
        let device = GraphicsDevice::dummy();
        let (mut scene, ids) = scene_with_lights(1);
        let mut lights = LightAggregator::new();
        lights.update(&device, &scene, &ids).unwrap();

        scene.get_mut(ids[0]).unwrap().set_position(Vec3::Y);
        assert_eq!(
            lights.update(&device, &scene, &ids).unwrap(),
            AggregateUpdate::Rewritten
        );
        assert_eq!(lights.read().unwrap()[0].position.y, 1.0);
    }

    #[test]
    fn test_membership_change_at_same_count() {
        let device = GraphicsDevice::dummy();
        let (scene, ids) = scene_with_lights(2);
        let mut lights = LightAggregator::new();
        lights.update(&device, &scene, &ids[..1]).unwrap();
        let buffer = lights.buffer().unwrap().id();
        assert_eq!(
            lights.update(&device, &scene, &ids[1..]).unwrap(),
            AggregateUpdate::Rewritten
        );
        assert_eq!(lights.buffer().unwrap().id(), buffer);
    }

    #[test]
    fn test_empty_lights_release_buffer() {
        let device = GraphicsDevice::dummy();
        let (scene, ids) = scene_with_lights(1);
        let mut lights = LightAggregator::new();
        lights.update(&device, &scene, &ids).unwrap();
        lights.update(&device, &scene, &[]).unwrap();
        assert!(lights.buffer().is_none());
        assert_eq!(lights.count(), 0);
    }

    fn scene_with_shadow() -> (Scene, NodeId) {
        let device = GraphicsDevice::dummy();
        let mut scene = Scene::new("shadows");
        let id = scene.add(
            Node::new("sun")
                .with_light(Light::directional(Vec3::ONE, 1.0).with_cast_shadow(true)),
        );
        let world = scene.world_matrix(id).unwrap();
        let revision = scene.world_revision(id);
        scene
            .get_mut(id)
            .and_then(Node::light_mut)
            .and_then(Light::shadow_mut)
            .unwrap()
            .prepare(&device, &world, revision)
            .unwrap();
        (scene, id)
    }

    #[test]
    fn test_shadow_table_layout() {
        let device = GraphicsDevice::dummy();
        let (scene, id) = scene_with_shadow();
        let mut shadows = ShadowAggregator::new();
        let update = shadows.update(&device, &scene, &[id]).unwrap();
        assert_eq!(update.matrices, AggregateUpdate::Rebuilt);

        let arguments = shadows.arguments().unwrap();
        let data = shadows.data().unwrap();
        assert_eq!(
            arguments.read_entry(0).unwrap(),
            (data.buffer().id().raw(), data.offset())
        );
        let texture = shadow_of(&scene, id).and_then(Shadow::texture).unwrap();
        assert_eq!(arguments.read_entry(1).unwrap().0, texture.id().raw());
        assert_eq!(arguments.referenced_textures().count(), 1);
    }

    #[test]
    fn test_shadow_changes_are_separate() {
        let device = GraphicsDevice::dummy();
        let (mut scene, id) = scene_with_shadow();
        let mut shadows = ShadowAggregator::new();
        shadows.update(&device, &scene, &[id]).unwrap();

        scene
            .get_mut(id)
            .and_then(Node::light_mut)
            .and_then(Light::shadow_mut)
            .unwrap()
            .set_strength(0.5);
        let update = shadows.update(&device, &scene, &[id]).unwrap();
        assert_eq!(update.matrices, AggregateUpdate::Unchanged);
        assert_eq!(update.data, AggregateUpdate::Rewritten);
        assert_eq!(update.textures, AggregateUpdate::Unchanged);
        assert_eq!(shadows.data().unwrap().read().unwrap()[0].strength, 0.5);
    }
}
