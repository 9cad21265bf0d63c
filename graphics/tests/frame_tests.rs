//! End-to-end frame encoding on the dummy backend.

mod common;

use std::sync::Arc;

use common::{compute_passes, lit_scene, main_pass, shadow_passes, shadow_scene, TestContext};
use lumen_graphics::bindings::{FragmentBufferIndex, VertexBufferIndex};
use lumen_graphics::encoder::EncodedPass;
use lumen_graphics::types::StoreAction;
use lumen_graphics::{
    RenderContext, ShaderProgram, TextureComputeSystem, TextureDescriptor, TextureFormat,
    TextureUsage,
};
use rstest::rstest;

#[test]
fn test_lit_scene_binds_lighting_every_frame() {
    let mut ctx = TestContext::new();
    let mut scene = lit_scene(&ctx);

    for _ in 0..3 {
        let command_buffer = ctx.frame(&mut scene);
        let pass = main_pass(&command_buffer);
        let draws = pass.draw_calls();
        assert_eq!(draws.len(), 1);

        let light_buffer = ctx.renderer.light_aggregator().buffer().unwrap().id();
        let draw = &draws[0];
        assert_eq!(
            draw.fragment_buffers_at(FragmentBufferIndex::Lighting.into()),
            vec![light_buffer]
        );
        assert!(draw
            .vertex_buffers_at(VertexBufferIndex::ShadowMatrices.into())
            .is_empty());
        assert!(draw
            .fragment_buffers_at(FragmentBufferIndex::Shadows.into())
            .is_empty());
    }
    assert_eq!(ctx.renderer.light_aggregator().count(), 1);
}

#[test]
fn test_shadow_scene_encodes_shadow_pass_first() {
    let mut ctx = TestContext::new();
    let mut scene = shadow_scene(&ctx);
    let command_buffer = ctx.frame(&mut scene);

    let sun = scene.find_by_label("Sun").unwrap();
    let shadow_texture = scene
        .get(sun)
        .and_then(|node| node.light())
        .and_then(|light| light.shadow())
        .and_then(|shadow| shadow.texture())
        .map(|texture| texture.id())
        .expect("shadow map allocated");

    let shadows = shadow_passes(&command_buffer);
    assert_eq!(shadows.len(), 1);
    let depth = shadows[0].depth.expect("shadow pass has a depth attachment");
    assert_eq!(depth.texture, shadow_texture);
    assert_eq!(depth.store_action, StoreAction::Store);
    assert_eq!(shadows[0].draw_count(), 1);
    assert!(shadows[0].color.is_none());

    let pass = main_pass(&command_buffer);
    assert!(pass.used_textures().contains(&shadow_texture));

    let aggregator = ctx.renderer.shadow_aggregator();
    let matrices = aggregator.matrices().unwrap().buffer().id();
    let arguments = aggregator.arguments().unwrap().buffer().id();
    let data = aggregator.data().unwrap().buffer().id();
    assert_eq!(pass.used_buffers(), vec![data]);
    let draws = pass.draw_calls();
    let receiver = draws
        .iter()
        .find(|draw| {
            !draw
                .fragment_buffers_at(FragmentBufferIndex::Lighting.into())
                .is_empty()
        })
        .expect("lit receiver drawn");
    assert_eq!(
        receiver.vertex_buffers_at(VertexBufferIndex::ShadowMatrices.into()),
        vec![matrices]
    );
    assert_eq!(
        receiver.fragment_buffers_at(FragmentBufferIndex::Shadows.into()),
        vec![arguments]
    );
}

#[test]
fn test_no_shadow_pass_without_receivers() {
    let mut ctx = TestContext::new();
    let mut scene = shadow_scene(&ctx);
    let ground = scene.find_by_label("Ground").unwrap();
    scene.get_mut(ground).unwrap().set_visible(false);

    let command_buffer = ctx.frame(&mut scene);
    assert!(shadow_passes(&command_buffer).is_empty());
    assert_eq!(main_pass(&command_buffer).draw_count(), 1);
}

#[test]
fn test_compute_runs_before_render_passes() {
    let mut ctx = TestContext::new();
    let program = Arc::new(
        ShaderProgram::new("Noise", Vec::<u8>::new())
            .with_entry_point("noise_reset")
            .with_entry_point("noise_update"),
    );
    let mut system = TextureComputeSystem::new(
        &ctx.device,
        "Noise",
        vec![TextureDescriptor::new_2d(
            64,
            64,
            TextureFormat::Rgba32Float,
            TextureUsage::SHADER_READ,
        )],
        true,
    )
    .unwrap();
    system
        .set_program(&program, Some("noise_reset"), "noise_update")
        .unwrap();
    let id = ctx.renderer.add_compute_system(system);

    let mut scene = shadow_scene(&ctx);
    let command_buffer = ctx.frame(&mut scene);

    let passes = command_buffer.passes();
    assert!(matches!(passes.first(), Some(EncodedPass::Compute(_))));
    assert!(passes.iter().skip(1).all(EncodedPass::is_render));
    assert_eq!(compute_passes(&command_buffer).len(), 1);

    let system = ctx
        .renderer
        .compute_system_as::<TextureComputeSystem>(id)
        .unwrap();
    assert_eq!(system.ping_pong_index(), 1);
}

#[rstest]
#[case(1)]
#[case(4)]
fn test_main_pass_sample_count(#[case] sample_count: u32) {
    let mut ctx = TestContext::with_context(|context: RenderContext| {
        context.with_sample_count(sample_count)
    });
    let mut scene = lit_scene(&ctx);
    let command_buffer = ctx.frame(&mut scene);
    let pass = main_pass(&command_buffer);

    let color = pass.color.expect("color attachment");
    assert_eq!(color.sample_count, sample_count);
    assert_eq!(color.resolve_texture.is_some(), sample_count > 1);
    let expected_store = if sample_count > 1 {
        StoreAction::StoreAndMultisampleResolve
    } else {
        StoreAction::Store
    };
    assert_eq!(color.store_action, expected_store);
    assert_eq!(pass.draw_count(), 1);
}

#[test]
fn test_surface_lost_encodes_nothing() {
    let mut ctx = TestContext::new();
    let mut scene = lit_scene(&ctx);
    let mut descriptor = lumen_graphics::RenderPassDescriptor::new();
    let mut command_buffer = ctx.device.create_command_buffer("Lost");
    command_buffer.mark_surface_lost();

    ctx.renderer
        .draw(&mut descriptor, &mut command_buffer, &mut scene, &mut ctx.camera)
        .unwrap();
    assert!(command_buffer.passes().is_empty());
    assert!(!descriptor.has_attachments());
}
