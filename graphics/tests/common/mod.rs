//! Shared fixtures for the renderer integration tests.
//!
//! Everything runs on the dummy backend, so assertions are made against
//! the recorded command buffers rather than pixels.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use glam::{Vec3, Vec4};
use lumen_graphics::encoder::{ComputePassRecord, RenderPassRecord};
use lumen_graphics::materials::builtin_program;
use lumen_graphics::{
    BasicColorMaterial, Camera, CommandBuffer, Geometry, GraphicsDevice, Light, Mesh, Node,
    RenderContext, RenderPassDescriptor, Renderer, Scene, ShaderProgram, StandardMaterial,
};

static INIT: Once = Once::new();

/// Install the test logger once per test binary.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A renderer on a fresh dummy device with a camera looking at the origin.
pub struct TestContext {
    pub device: Arc<GraphicsDevice>,
    pub renderer: Renderer,
    pub camera: Camera,
    pub program: Arc<ShaderProgram>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_context(|context| context)
    }

    pub fn with_context(configure: impl FnOnce(RenderContext) -> RenderContext) -> Self {
        init_logging();
        let device = GraphicsDevice::dummy();
        let context = configure(RenderContext::new(Arc::clone(&device)));
        let mut renderer = Renderer::new(context).expect("valid render context");
        renderer.resize(320, 240);
        let mut camera = Camera::perspective(60.0, 0.1, 100.0);
        camera.set_position(Vec3::new(0.0, 2.0, 8.0));
        camera.look_at(Vec3::ZERO, Vec3::Y);
        Self {
            device,
            renderer,
            camera,
            program: Arc::new(builtin_program()),
        }
    }

    /// Draw one frame and return the recorded command buffer.
    pub fn frame(&mut self, scene: &mut Scene) -> CommandBuffer {
        let mut descriptor = RenderPassDescriptor::new();
        let mut command_buffer = self.device.create_command_buffer("Test Frame");
        self.renderer
            .draw(&mut descriptor, &mut command_buffer, scene, &mut self.camera)
            .expect("frame encodes");
        command_buffer
    }

    pub fn color_mesh(&self, label: &str) -> Mesh {
        Mesh::new(label, Geometry::quad(1.0, 1.0))
            .with_material(BasicColorMaterial::new(Arc::clone(&self.program), Vec4::ONE))
    }

    pub fn lit_mesh(&self, label: &str) -> Mesh {
        Mesh::new(label, Geometry::cube(1.0))
            .with_material(StandardMaterial::new(Arc::clone(&self.program)))
    }
}

/// Scene with one unshadowed directional light and one lit mesh.
pub fn lit_scene(ctx: &TestContext) -> Scene {
    let mut scene = Scene::new("Lit");
    scene.add(
        Node::new("Sun")
            .with_position(Vec3::new(0.0, 5.0, 5.0))
            .with_light(Light::directional(Vec3::ONE, 2.0)),
    );
    scene.add(Node::new("Cube").with_renderable(ctx.lit_mesh("Cube")));
    scene
}

/// Scene with a shadow casting directional light, a caster and a receiver.
pub fn shadow_scene(ctx: &TestContext) -> Scene {
    let mut scene = Scene::new("Shadows");
    let mut sun = Node::new("Sun")
        .with_position(Vec3::new(0.0, 6.0, 0.0))
        .with_light(Light::directional(Vec3::ONE, 2.0).with_cast_shadow(true));
    sun.look_at(Vec3::ZERO, Vec3::Z);
    scene.add(sun);
    scene.add(
        Node::new("Caster")
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .with_renderable(ctx.color_mesh("Caster").with_shadows(true, false)),
    );
    scene.add(
        Node::new("Ground").with_renderable(ctx.lit_mesh("Ground").with_shadows(false, true)),
    );
    scene
}

/// The frame's main pass: the last render pass recorded.
pub fn main_pass(command_buffer: &CommandBuffer) -> &RenderPassRecord {
    command_buffer
        .render_passes()
        .last()
        .expect("main pass recorded")
}

/// Render passes recorded before the main pass.
pub fn shadow_passes(command_buffer: &CommandBuffer) -> Vec<&RenderPassRecord> {
    let passes: Vec<_> = command_buffer.render_passes().collect();
    passes[..passes.len().saturating_sub(1)].to_vec()
}

pub fn compute_passes(command_buffer: &CommandBuffer) -> Vec<&ComputePassRecord> {
    command_buffer.compute_passes().collect()
}
