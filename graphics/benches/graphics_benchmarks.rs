use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Quat, Vec3, Vec4};

use lumen_graphics::materials::builtin_program;
use lumen_graphics::{
    BasicColorMaterial, Camera, Geometry, GraphicsDevice, Light, LightAggregator, Mesh, Node,
    NodeId, RenderContext, RenderPassDescriptor, Renderer, Scene, StandardMaterial,
};

// ---------------------------------------------------------------------------
// Scene graph
// ---------------------------------------------------------------------------

fn deep_chain(depth: usize) -> (Scene, NodeId, NodeId) {
    let mut scene = Scene::new("chain");
    let top = scene.add(Node::new("node_0"));
    let mut leaf = top;
    for i in 1..depth {
        let node = Node::new(format!("node_{i}")).with_position(Vec3::new(0.0, 0.1, 0.0));
        leaf = scene.add_to(leaf, node).unwrap();
    }
    (scene, top, leaf)
}

fn bench_world_matrix_cached(c: &mut Criterion) {
    let (scene, _, leaf) = deep_chain(64);
    scene.world_matrix(leaf);
    c.bench_function("world_matrix_depth_64_cached", |b| {
        b.iter(|| black_box(scene.world_matrix(black_box(leaf))));
    });
}

fn bench_world_matrix_dirty(c: &mut Criterion) {
    let (mut scene, top, leaf) = deep_chain(64);
    c.bench_function("world_matrix_depth_64_after_root_move", |b| {
        b.iter(|| {
            if let Some(node) = scene.get_mut(top) {
                node.rotate(Quat::from_rotation_y(0.01));
            }
            black_box(scene.world_matrix(leaf))
        });
    });
}

// ---------------------------------------------------------------------------
// Light aggregation
// ---------------------------------------------------------------------------

fn bench_light_update(c: &mut Criterion) {
    let device = GraphicsDevice::dummy();
    let mut scene = Scene::new("lights");
    let lights: Vec<NodeId> = (0..64)
        .map(|i| {
            scene.add(
                Node::new(format!("light_{i}"))
                    .with_position(Vec3::new(i as f32, 2.0, 0.0))
                    .with_light(Light::point(Vec3::ONE, 1.0, 5.0)),
            )
        })
        .collect();
    let mut aggregator = LightAggregator::new();
    aggregator.update(&device, &scene, &lights).unwrap();

    c.bench_function("light_aggregator_64_unchanged", |b| {
        b.iter(|| black_box(aggregator.update(&device, &scene, &lights).unwrap()));
    });

    c.bench_function("light_aggregator_64_one_moved", |b| {
        b.iter(|| {
            if let Some(node) = scene.get_mut(lights[0]) {
                node.translate(Vec3::new(0.0, 0.0, 0.01));
            }
            black_box(aggregator.update(&device, &scene, &lights).unwrap())
        });
    });
}

// ---------------------------------------------------------------------------
// Full frames
// ---------------------------------------------------------------------------

fn bench_frame(c: &mut Criterion) {
    let device = GraphicsDevice::dummy();
    let mut renderer = Renderer::new(RenderContext::new(Arc::clone(&device))).unwrap();
    renderer.resize(1280, 720);
    let program = Arc::new(builtin_program());

    let mut scene = Scene::new("frame");
    let mut sun = Node::new("sun")
        .with_position(Vec3::new(0.0, 10.0, 0.0))
        .with_light(Light::directional(Vec3::ONE, 2.0).with_cast_shadow(true));
    sun.look_at(Vec3::ZERO, Vec3::Z);
    scene.add(sun);
    for i in 0..32 {
        let mesh = if i % 2 == 0 {
            Mesh::new(format!("mesh_{i}"), Geometry::cube(1.0))
                .with_material(StandardMaterial::new(Arc::clone(&program)))
        } else {
            Mesh::new(format!("mesh_{i}"), Geometry::quad(1.0, 1.0))
                .with_material(BasicColorMaterial::new(Arc::clone(&program), Vec4::ONE))
        };
        scene.add(
            Node::new(format!("node_{i}"))
                .with_position(Vec3::new((i % 8) as f32, 0.0, (i / 8) as f32))
                .with_renderable(mesh.with_shadows(true, true)),
        );
    }

    let mut camera = Camera::perspective(60.0, 0.1, 100.0);
    camera.set_position(Vec3::new(0.0, 5.0, 12.0));
    camera.look_at(Vec3::ZERO, Vec3::Y);

    c.bench_function("frame_32_meshes_with_shadows", |b| {
        b.iter(|| {
            let mut descriptor = RenderPassDescriptor::new();
            let mut command_buffer = device.create_command_buffer("Bench Frame");
            renderer
                .draw(&mut descriptor, &mut command_buffer, &mut scene, &mut camera)
                .unwrap();
            black_box(command_buffer)
        });
    });
}

criterion_group!(
    benches,
    bench_world_matrix_cached,
    bench_world_matrix_dirty,
    bench_light_update,
    bench_frame
);
criterion_main!(benches);
