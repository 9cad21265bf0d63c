//! Scene graph, uniform ring and light aggregation behavior.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use lumen_graphics::lighting::AggregateUpdate;
use lumen_graphics::materials::builtin_program;
use lumen_graphics::{
    BasicColorMaterial, BufferUsage, Geometry, GraphicsDevice, InstancedMesh, Light,
    LightAggregator, Node, NodeId, Renderable, Scene, UniformRing, MAX_FRAMES_IN_FLIGHT,
};
use rstest::rstest;

fn assert_mat_eq(a: Mat4, b: Mat4) {
    assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
}

/// root -> a -> b -> c, each offset along a different axis.
fn chain() -> (Scene, [NodeId; 3]) {
    let mut scene = Scene::new("chain");
    let a = scene.add(Node::new("a").with_position(Vec3::new(1.0, 0.0, 0.0)));
    let b = scene
        .add_to(a, Node::new("b").with_position(Vec3::new(0.0, 2.0, 0.0)))
        .unwrap();
    let c = scene
        .add_to(b, Node::new("c").with_position(Vec3::new(0.0, 0.0, 3.0)))
        .unwrap();
    (scene, [a, b, c])
}

fn composed(scene: &Scene, id: NodeId) -> Mat4 {
    let mut chain: Vec<NodeId> = scene.ancestors(id).collect();
    chain.reverse();
    chain.push(id);
    chain.iter().fold(Mat4::IDENTITY, |world, &node| {
        world * scene.get(node).unwrap().local_matrix()
    })
}

#[derive(Debug, Clone, Copy)]
enum Op {
    MoveRoot,
    RotateMiddle,
    ScaleLeaf,
    ReparentLeafToRoot,
    ReparentLeafToFirst,
}

fn apply(scene: &mut Scene, [a, b, c]: [NodeId; 3], op: Op) {
    match op {
        Op::MoveRoot => scene.get_mut(a).unwrap().translate(Vec3::new(0.0, 0.0, -4.0)),
        Op::RotateMiddle => scene
            .get_mut(b)
            .unwrap()
            .rotate(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        Op::ScaleLeaf => scene.get_mut(c).unwrap().set_scale(Vec3::splat(2.0)),
        Op::ReparentLeafToRoot => {
            let root = scene.root();
            scene.add_child(root, c).unwrap();
        }
        Op::ReparentLeafToFirst => scene.add_child(a, c).unwrap(),
    }
}

#[rstest]
#[case(vec![Op::MoveRoot])]
#[case(vec![Op::RotateMiddle, Op::ScaleLeaf])]
#[case(vec![Op::ReparentLeafToRoot, Op::MoveRoot])]
#[case(vec![Op::RotateMiddle, Op::ReparentLeafToFirst, Op::RotateMiddle])]
#[case(vec![Op::ScaleLeaf, Op::ReparentLeafToRoot, Op::ReparentLeafToFirst, Op::MoveRoot])]
fn test_world_matrix_matches_composition(#[case] ops: Vec<Op>) {
    let (mut scene, ids) = chain();
    for &id in &ids {
        // Prime the caches so stale entries would show.
        scene.world_matrix(id).unwrap();
    }
    for op in ops {
        apply(&mut scene, ids, op);
        for &id in &ids {
            assert_mat_eq(scene.world_matrix(id).unwrap(), composed(&scene, id));
        }
    }
}

#[test]
fn test_reparent_rejects_cycles() {
    let (mut scene, [a, b, c]) = chain();
    assert!(scene.add_child(c, a).is_err());
    assert!(scene.add_child(a, a).is_err());
    assert_eq!(scene.get(c).unwrap().parent(), Some(b));
    assert_eq!(scene.get(a).unwrap().parent(), Some(scene.root()));
}

#[rstest]
#[case(0, None, false)]
#[case(3, None, true)]
#[case(3, Some(0), false)]
#[case(3, Some(2), true)]
fn test_instanced_drawable_needs_instances(
    #[case] count: u32,
    #[case] draw_count: Option<u32>,
    #[case] drawable: bool,
) {
    let mut mesh = InstancedMesh::new("grass", Geometry::quad(1.0, 1.0), count).with_material(
        BasicColorMaterial::new(Arc::new(builtin_program()), glam::Vec4::ONE),
    );
    mesh.set_draw_count(draw_count);
    assert_eq!(mesh.drawable(), drawable);
}

#[rstest]
#[case(1)]
#[case(2)]
fn test_uniform_ring_cycles_without_aliasing(#[case] views: u32) {
    let device = GraphicsDevice::dummy();
    let mut ring = UniformRing::new(&device, 192, views, BufferUsage::UNIFORM, "Ring").unwrap();
    let frames = MAX_FRAMES_IN_FLIGHT as usize;

    let mut history: Vec<Vec<u64>> = Vec::new();
    for _ in 0..frames * 3 {
        ring.advance();
        history.push((0..views).map(|slot| ring.slot_offset(slot)).collect());
    }

    for (i, offsets) in history.iter().enumerate() {
        for &offset in offsets {
            assert_eq!(offset % 256, 0);
            assert!(offset + ring.stride() <= ring.capacity());
        }
        if i >= frames {
            assert_eq!(offsets, &history[i - frames]);
        }
    }
    for window in history.windows(frames) {
        let distinct: HashSet<u64> = window.iter().flatten().copied().collect();
        assert_eq!(distinct.len(), frames * views as usize);
    }
}

#[test]
fn test_light_aggregator_rewrites_in_place() {
    common::init_logging();
    let device = GraphicsDevice::dummy();
    let mut scene = Scene::new("lights");
    let sun = scene.add(Node::new("sun").with_light(Light::directional(Vec3::ONE, 1.0)));
    let mut aggregator = LightAggregator::new();

    assert_eq!(
        aggregator.update(&device, &scene, &[sun]).unwrap(),
        AggregateUpdate::Rebuilt
    );
    assert_eq!(
        aggregator.update(&device, &scene, &[sun]).unwrap(),
        AggregateUpdate::Unchanged
    );

    let buffer = Arc::clone(aggregator.buffer().unwrap());
    let before = buffer.read(0, buffer.size()).unwrap();
    scene
        .get_mut(sun)
        .unwrap()
        .light_mut()
        .unwrap()
        .set_color(Vec3::new(1.0, 0.5, 0.25));
    assert_eq!(
        aggregator.update(&device, &scene, &[sun]).unwrap(),
        AggregateUpdate::Rewritten
    );
    assert_eq!(aggregator.buffer().unwrap().id(), buffer.id());
    assert_ne!(buffer.read(0, buffer.size()).unwrap(), before);

    let lamp = scene.add(Node::new("lamp").with_light(Light::point(Vec3::ONE, 1.0, 4.0)));
    assert_eq!(
        aggregator.update(&device, &scene, &[sun, lamp]).unwrap(),
        AggregateUpdate::Rebuilt
    );
    assert_eq!(aggregator.count(), 2);
    assert_eq!(aggregator.read().unwrap().len(), 2);
}

#[test]
fn test_light_aggregator_tracks_node_motion() {
    let device = GraphicsDevice::dummy();
    let mut scene = Scene::new("lights");
    let group = scene.add(Node::new("group"));
    let lamp = scene
        .add_to(group, Node::new("lamp").with_light(Light::point(Vec3::ONE, 1.0, 4.0)))
        .unwrap();
    let mut aggregator = LightAggregator::new();
    aggregator.update(&device, &scene, &[lamp]).unwrap();

    scene.get_mut(group).unwrap().translate(Vec3::new(0.0, 3.0, 0.0));
    assert_eq!(
        aggregator.update(&device, &scene, &[lamp]).unwrap(),
        AggregateUpdate::Rewritten
    );
    let data = aggregator.read().unwrap();
    assert!((data[0].position.y - 3.0).abs() < 1e-5);
}
