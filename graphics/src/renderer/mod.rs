//! The per-frame driver.
//!
//! [`Renderer::draw`] runs one frame:
//!
//! 1. update: traverse the scene into [`FrameLists`], prepare shadow maps,
//!    update renderables and their uniforms, refresh the light and shadow
//!    buffers and encode registered compute systems
//! 2. shadow pass: one depth-only pass per shadow casting light, only
//!    when the frame has both casters and receivers
//! 3. targets: allocate whatever color, depth and stencil targets the
//!    caller's descriptor lacks
//! 4. main pass: bind lighting and shadow state per renderable and draw
//! 5. restore the caller's attachments

mod config;
pub(crate) mod context;
mod frame;
mod targets;

pub use config::RendererConfig;
pub use context::RenderContext;
pub use frame::FrameLists;
pub use targets::RenderTargets;

use std::sync::Arc;

use glam::Mat4;

use crate::bindings::{FragmentBufferIndex, VertexBufferIndex};
use crate::compute::ComputeSystem;
use crate::encoder::{CommandBuffer, RenderEncoder, RenderPassDescriptor};
use crate::error::GraphicsError;
use crate::lighting::{LightAggregator, ShadowAggregator};
use crate::resources::Texture;
use crate::scene::{Camera, Renderable, Scene};
use crate::types::{CullMode, LoadAction, StoreAction, TextureFormat, Viewport};

use targets::{ensure_target, TargetSpec};

/// Handle of a compute system registered with a [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputeSystemId(u64);

type UpdateHook = Box<dyn FnMut()>;
type EncoderHook = Box<dyn FnMut(&mut RenderEncoder<'_>)>;

/// Attachments of a descriptor as the caller supplied them.
struct SavedAttachments {
    color: Option<Arc<Texture>>,
    color_resolve: Option<Arc<Texture>>,
    depth: Option<Arc<Texture>>,
    depth_resolve: Option<Arc<Texture>>,
    stencil: Option<Arc<Texture>>,
    width: u32,
    height: u32,
}

impl SavedAttachments {
    fn capture(descriptor: &RenderPassDescriptor) -> Self {
        Self {
            color: descriptor.color.texture.clone(),
            color_resolve: descriptor.color.resolve_texture.clone(),
            depth: descriptor.depth.texture.clone(),
            depth_resolve: descriptor.depth.resolve_texture.clone(),
            stencil: descriptor.stencil.texture.clone(),
            width: descriptor.render_target_width,
            height: descriptor.render_target_height,
        }
    }

    fn restore(self, descriptor: &mut RenderPassDescriptor) {
        descriptor.color.texture = self.color;
        descriptor.color.resolve_texture = self.color_resolve;
        descriptor.depth.texture = self.depth;
        descriptor.depth.resolve_texture = self.depth_resolve;
        descriptor.stencil.texture = self.stencil;
        descriptor.render_target_width = self.width;
        descriptor.render_target_height = self.height;
    }
}

/// Draws a [`Scene`] through a [`Camera`] into a render pass.
pub struct Renderer {
    config: RendererConfig,
    context: RenderContext,
    width: u32,
    height: u32,
    viewport: Viewport,
    targets: RenderTargets,
    frame: FrameLists,
    lights: LightAggregator,
    shadows: ShadowAggregator,
    compute_systems: Vec<(ComputeSystemId, Box<dyn ComputeSystem>)>,
    next_compute_id: u64,
    on_update: Option<UpdateHook>,
    pre_draw: Option<EncoderHook>,
    post_draw: Option<EncoderHook>,
}

impl Renderer {
    /// Create a renderer with the default [`RendererConfig`]. The output
    /// size starts at zero; call [`Renderer::resize`] or let the first
    /// frame adopt the target size.
    pub fn new(context: RenderContext) -> Result<Self, GraphicsError> {
        Self::with_config(context, RendererConfig::default())
    }

    /// Fails if the context's sample count, amplification count or
    /// attachment formats are invalid for its device.
    pub fn with_config(context: RenderContext, config: RendererConfig) -> Result<Self, GraphicsError> {
        context.validate()?;
        log::info!("Renderer: created '{}' ({:?})", config.label, context);
        Ok(Self {
            config,
            context,
            width: 0,
            height: 0,
            viewport: Viewport::default(),
            targets: RenderTargets::default(),
            frame: FrameLists::default(),
            lights: LightAggregator::new(),
            shadows: ShadowAggregator::new(),
            compute_systems: Vec::new(),
            next_compute_id: 0,
            on_update: None,
            pre_draw: None,
            post_draw: None,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// A depth inversion change made through this reference reaches the
    /// viewport only on the next size change. [`Renderer::set_config`]
    /// applies it immediately.
    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    /// Replace the configuration; the viewport follows the depth inversion
    /// setting.
    pub fn set_config(&mut self, config: RendererConfig) {
        self.config = config;
        self.update_viewport();
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Switch the output configuration. Render targets are reallocated on
    /// the next frame if anything changed.
    pub fn set_context(&mut self, context: RenderContext) -> Result<(), GraphicsError> {
        context.validate()?;
        if context.pipeline_key() != self.context.pipeline_key()
            || !Arc::ptr_eq(&context.device, &self.context.device)
        {
            log::debug!("Renderer: context changed, invalidating render targets");
            self.targets.invalidate();
        }
        self.context = context;
        Ok(())
    }

    /// Output size in pixels as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Set the output size and viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.update_viewport();
    }

    /// Full-target viewport, with near and far swapped when the config
    /// inverts depth.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn update_viewport(&mut self) {
        let viewport = Viewport::from_dimensions(self.width as f32, self.height as f32);
        self.viewport = if self.config.invert_viewport_near_far {
            viewport.with_depth_range(1.0, 0.0)
        } else {
            viewport
        };
    }

    /// Color, depth and stencil targets the renderer allocated for
    /// attachments the descriptor left empty.
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Lists collected by the most recent frame.
    pub fn frame(&self) -> &FrameLists {
        &self.frame
    }

    /// Packed light data bound to every lit draw of the last frame.
    pub fn light_aggregator(&self) -> &LightAggregator {
        &self.lights
    }

    /// Shadow matrices, shadow data and the argument table of the last
    /// frame's shadow casting lights.
    pub fn shadow_aggregator(&self) -> &ShadowAggregator {
        &self.shadows
    }

    /// Run before anything else each frame.
    pub fn set_on_update(&mut self, hook: impl FnMut() + 'static) {
        self.on_update = Some(Box::new(hook));
    }

    /// Run after the main pass is opened, before any renderable is drawn.
    pub fn set_pre_draw(&mut self, hook: impl FnMut(&mut RenderEncoder<'_>) + 'static) {
        self.pre_draw = Some(Box::new(hook));
    }

    /// Run after the last renderable is drawn.
    pub fn set_post_draw(&mut self, hook: impl FnMut(&mut RenderEncoder<'_>) + 'static) {
        self.post_draw = Some(Box::new(hook));
    }

    /// Register a compute system; it is encoded every frame before the
    /// shadow pass.
    pub fn add_compute_system(&mut self, system: impl ComputeSystem) -> ComputeSystemId {
        let id = ComputeSystemId(self.next_compute_id);
        self.next_compute_id += 1;
        log::debug!("Renderer: registered compute system '{}'", system.label());
        self.compute_systems.push((id, Box::new(system)));
        id
    }

    /// Unregister a compute system and hand it back.
    pub fn remove_compute_system(&mut self, id: ComputeSystemId) -> Option<Box<dyn ComputeSystem>> {
        let index = self.compute_systems.iter().position(|(i, _)| *i == id)?;
        Some(self.compute_systems.remove(index).1)
    }

    /// Borrow a registered compute system as its concrete type. `None` if
    /// the id is unknown or the type does not match.
    pub fn compute_system_as<T: ComputeSystem>(&self, id: ComputeSystemId) -> Option<&T> {
        self.compute_systems
            .iter()
            .find(|(i, _)| *i == id)
            .and_then(|(_, system)| system.as_any().downcast_ref::<T>())
    }

    pub fn compute_system_as_mut<T: ComputeSystem>(&mut self, id: ComputeSystemId) -> Option<&mut T> {
        self.compute_systems
            .iter_mut()
            .find(|(i, _)| *i == id)
            .and_then(|(_, system)| system.as_any_mut().downcast_mut::<T>())
    }

    /// Run the update phase without drawing, building every pipeline the
    /// scene needs. Compute work is submitted right away.
    pub fn compile(&mut self, scene: &mut Scene, camera: &mut Camera) -> Result<(), GraphicsError> {
        let device = Arc::clone(&self.context.device);
        let mut command_buffer = device.create_command_buffer(format!("{} Compile", self.config.label));
        self.update(&mut command_buffer, scene, camera)?;
        device.submit(command_buffer)
    }

    /// Draw into `render_target` instead of the descriptor's color texture
    /// (its resolve texture when multisampling).
    pub fn draw_to_target(
        &mut self,
        descriptor: &mut RenderPassDescriptor,
        command_buffer: &mut CommandBuffer,
        scene: &mut Scene,
        camera: &mut Camera,
        render_target: Arc<Texture>,
    ) -> Result<(), GraphicsError> {
        if self.context.sample_count > 1 {
            let previous = descriptor.color.resolve_texture.replace(render_target);
            let result = self.draw(descriptor, command_buffer, scene, camera);
            descriptor.color.resolve_texture = previous;
            result
        } else {
            let previous = descriptor.color.texture.replace(render_target);
            let result = self.draw(descriptor, command_buffer, scene, camera);
            descriptor.color.texture = previous;
            result
        }
    }

    /// Record one frame of `scene` seen from `camera`.
    ///
    /// A frame whose render pass cannot be opened (surface lost, nothing
    /// to render into, zero-sized output) is skipped without error. The
    /// update phase still runs in that case.
    ///
    /// With no size set yet, the size is taken from the descriptor's color
    /// target, or its render target dimensions.
    pub fn draw(
        &mut self,
        descriptor: &mut RenderPassDescriptor,
        command_buffer: &mut CommandBuffer,
        scene: &mut Scene,
        camera: &mut Camera,
    ) -> Result<(), GraphicsError> {
        if self.width == 0 || self.height == 0 {
            self.adopt_target_size(descriptor);
        }

        self.update(command_buffer, scene, camera)?;

        if self.width == 0 || self.height == 0 {
            log::trace!("Renderer: zero-sized output, skipping render passes");
            return Ok(());
        }

        if self.frame.shadows_possible() {
            self.encode_shadows(command_buffer, scene);
        }

        let saved = SavedAttachments::capture(descriptor);
        let result = self.encode_main_pass(descriptor, command_buffer, scene);
        saved.restore(descriptor);
        result
    }

    fn adopt_target_size(&mut self, descriptor: &RenderPassDescriptor) {
        let (width, height) = descriptor
            .color
            .resolve_texture
            .as_ref()
            .or(descriptor.color.texture.as_ref())
            .map_or(
                (descriptor.render_target_width, descriptor.render_target_height),
                |t| (t.width(), t.height()),
            );
        if width > 0 && height > 0 {
            log::debug!("Renderer: adopting target size {width}x{height}");
            self.resize(width, height);
        }
    }

    fn update(
        &mut self,
        command_buffer: &mut CommandBuffer,
        scene: &mut Scene,
        camera: &mut Camera,
    ) -> Result<(), GraphicsError> {
        if let Some(hook) = self.on_update.as_mut() {
            hook();
        }

        let aspect = if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        };
        camera.update(aspect);

        self.frame.collect(scene);
        log::trace!(
            "Renderer: frame has {} objects, {} renderables, {} lights",
            self.frame.objects.len(),
            self.frame.renderables.len(),
            self.frame.lights.len()
        );

        let device = Arc::clone(&self.context.device);
        for &id in &self.frame.shadows {
            let world = scene.world_matrix(id).unwrap_or(Mat4::IDENTITY);
            let revision = scene.world_revision(id);
            if let Some(shadow) = scene
                .get_mut(id)
                .and_then(|node| node.light_mut())
                .and_then(|light| light.shadow_mut())
            {
                shadow.prepare(&device, &world, revision)?;
            }
        }

        let light_count = self.frame.lights.len();
        let shadow_count = self.frame.shadows.len();
        let viewport = self.viewport.to_vec4();
        let views = self.context.vertex_amplification_count.max(1);
        for &id in &self.frame.objects {
            let world = scene.world_matrix(id).unwrap_or(Mat4::IDENTITY);
            let Some(renderable) = scene.get_mut(id).and_then(|node| node.renderable_mut()) else {
                continue;
            };
            let receive_shadow = renderable.receive_shadow();
            for material in renderable.materials_mut() {
                if material.lighting() {
                    material.set_light_count(light_count);
                }
                if receive_shadow {
                    material.set_shadow_count(shadow_count);
                }
            }
            renderable.update(&self.context, &world)?;
        }

        for &id in &self.frame.renderables {
            let world = scene.world_matrix(id).unwrap_or(Mat4::IDENTITY);
            if let Some(renderable) = scene.get_mut(id).and_then(|node| node.renderable_mut()) {
                for view in 0..views {
                    renderable.update_uniforms(&world, camera, viewport, view)?;
                }
            }
        }

        self.lights.update(&device, scene, &self.frame.lights)?;
        self.shadows.update(&device, scene, &self.frame.shadows)?;

        for (_, system) in &mut self.compute_systems {
            system.update(command_buffer)?;
        }
        Ok(())
    }

    fn encode_shadows(&self, command_buffer: &mut CommandBuffer, scene: &Scene) {
        for &light_id in &self.frame.shadows {
            let Some(shadow) = scene
                .get(light_id)
                .and_then(|node| node.light())
                .and_then(|light| light.shadow())
            else {
                continue;
            };
            let (Some(texture), Some(uniforms)) = (shadow.texture(), shadow.camera_uniforms()) else {
                continue;
            };

            let mut descriptor = RenderPassDescriptor::new()
                .with_depth_texture(Arc::clone(texture))
                .with_label(format!("{} Shadow Pass", self.config.label));
            descriptor.depth.load_action = LoadAction::Clear;
            descriptor.depth.store_action = StoreAction::Store;
            descriptor.depth.clear_depth = 1.0;
            descriptor.render_target_width = texture.width();
            descriptor.render_target_height = texture.height();

            let Some(mut encoder) = command_buffer.render_encoder(&descriptor) else {
                log::trace!("Renderer: shadow pass skipped, no encoder");
                return;
            };
            encoder.set_viewport(Viewport::from_dimensions(
                texture.width() as f32,
                texture.height() as f32,
            ));
            encoder.set_vertex_buffer(
                uniforms.buffer(),
                uniforms.offset(),
                VertexBufferIndex::ShadowMatrices.into(),
            );
            for &caster in &self.frame.shadow_casters {
                if let Some(renderable) = scene.get(caster).and_then(|node| node.renderable()) {
                    if renderable.drawable() {
                        renderable.draw(&mut encoder, renderable.cull_mode(), true);
                    }
                }
            }
            encoder.end_encoding();
        }
    }

    /// Fill in the attachments the caller left out and set this frame's
    /// actions and clear values.
    fn resolve_targets(&mut self, descriptor: &mut RenderPassDescriptor) -> Result<(), GraphicsError> {
        let device = Arc::clone(&self.context.device);
        let samples = self.context.sample_count;
        let multisampled = samples > 1;
        let (width, height) = (self.width, self.height);
        let label = self.config.label.clone();

        match self.context.color_format {
            None => {
                descriptor.color.texture = None;
                descriptor.color.resolve_texture = None;
            }
            Some(format) => {
                let spec = |sample_count, suffix: &'static str| TargetSpec {
                    width,
                    height,
                    format,
                    sample_count,
                    label: suffix,
                };
                if multisampled {
                    if descriptor.color.texture.as_ref().map(|t| t.sample_count()) != Some(samples) {
                        descriptor.color.texture = Some(ensure_target(
                            &mut self.targets.color_multisample,
                            &device,
                            spec(samples, "Multisample Color Texture"),
                        )?);
                    }
                    if descriptor.color.resolve_texture.is_none() {
                        let color = ensure_target(
                            &mut self.targets.color,
                            &device,
                            spec(1, "Color Texture"),
                        )?;
                        descriptor.render_target_width = color.width();
                        descriptor.render_target_height = color.height();
                        descriptor.color.resolve_texture = Some(color);
                    }
                } else if descriptor.color.texture.is_none() {
                    let color =
                        ensure_target(&mut self.targets.color, &device, spec(1, "Color Texture"))?;
                    descriptor.render_target_width = color.width();
                    descriptor.render_target_height = color.height();
                    descriptor.color.texture = Some(color);
                }
            }
        }

        match self.context.depth_format {
            None => {
                descriptor.depth.texture = None;
            }
            Some(format) => {
                let spec = |sample_count, suffix: &'static str| TargetSpec {
                    width,
                    height,
                    format,
                    sample_count,
                    label: suffix,
                };
                if multisampled {
                    if descriptor.depth.texture.as_ref().map(|t| t.sample_count()) != Some(samples) {
                        descriptor.depth.texture = Some(ensure_target(
                            &mut self.targets.depth_multisample,
                            &device,
                            spec(samples, "Multisample Depth Texture"),
                        )?);
                    }
                    if descriptor.depth.resolve_texture.is_none() {
                        descriptor.depth.resolve_texture = Some(ensure_target(
                            &mut self.targets.depth,
                            &device,
                            spec(1, "Depth Texture"),
                        )?);
                    }
                } else if descriptor.depth.texture.is_none() {
                    descriptor.depth.texture = Some(ensure_target(
                        &mut self.targets.depth,
                        &device,
                        spec(1, "Depth Texture"),
                    )?);
                }
                if format == TextureFormat::Depth32FloatStencil8 {
                    descriptor.stencil.texture = descriptor.depth.texture.clone();
                }
            }
        }

        match self.context.stencil_format {
            None => {
                if self.context.depth_format != Some(TextureFormat::Depth32FloatStencil8) {
                    descriptor.stencil.texture = None;
                }
            }
            Some(_) if self.context.depth_format == Some(TextureFormat::Depth32FloatStencil8) => {
                // Packed depth-stencil: the depth arm already shares its texture.
            }
            Some(format) => {
                let stale = descriptor
                    .stencil
                    .texture
                    .as_ref()
                    .map_or(true, |t| t.sample_count() != samples || t.format() != format);
                if stale {
                    descriptor.stencil.texture = Some(ensure_target(
                        &mut self.targets.stencil,
                        &device,
                        TargetSpec {
                            width,
                            height,
                            format,
                            sample_count: samples,
                            label: "Stencil Texture",
                        },
                    )?);
                }
            }
        }

        let config = &self.config;
        let (color_store, depth_store) = if multisampled {
            (
                config.color_store_action.resolving(),
                config.depth_store_action.resolving(),
            )
        } else {
            (
                config.color_store_action.unresolved(),
                config.depth_store_action.unresolved(),
            )
        };
        descriptor.label = Some(format!("{label} Pass"));
        descriptor.color.load_action = config.color_load_action;
        descriptor.color.store_action = color_store;
        descriptor.color.clear_color = config.clear_color;
        descriptor.depth.load_action = config.depth_load_action;
        descriptor.depth.store_action = depth_store;
        descriptor.depth.clear_depth = config.clear_depth;
        descriptor.stencil.load_action = config.stencil_load_action;
        descriptor.stencil.store_action = config.stencil_store_action;
        descriptor.stencil.clear_stencil = config.clear_stencil;
        Ok(())
    }

    fn encode_main_pass(
        &mut self,
        descriptor: &mut RenderPassDescriptor,
        command_buffer: &mut CommandBuffer,
        scene: &Scene,
    ) -> Result<(), GraphicsError> {
        self.resolve_targets(descriptor)?;

        let Some(mut encoder) = command_buffer.render_encoder(descriptor) else {
            log::trace!("Renderer: frame skipped, no render encoder");
            return Ok(());
        };
        encoder.set_viewport(self.viewport);
        encoder.push_debug_group(format!("{} Pass", self.config.label));
        if let Some(hook) = self.pre_draw.as_mut() {
            hook(&mut encoder);
        }

        let mut order = self.frame.renderables.clone();
        if self.config.sort_objects {
            order.sort_by_key(|&id| {
                scene
                    .get(id)
                    .and_then(|node| node.renderable())
                    .map_or(0, |r| r.render_order())
            });
        }

        if !order.is_empty() {
            for &light_id in &self.frame.shadows {
                let texture = scene
                    .get(light_id)
                    .and_then(|node| node.light())
                    .and_then(|light| light.shadow())
                    .and_then(|shadow| shadow.texture());
                if let Some(texture) = texture {
                    encoder.use_texture(texture.id());
                }
            }
            if let Some(data) = self.shadows.data() {
                encoder.use_buffer(data.buffer().id());
            }
            for id in order {
                if let Some(renderable) = scene.get(id).and_then(|node| node.renderable()) {
                    if renderable.drawable() {
                        self.encode_renderable(&mut encoder, renderable);
                    }
                }
            }
        }

        if let Some(hook) = self.post_draw.as_mut() {
            hook(&mut encoder);
        }
        encoder.pop_debug_group();
        encoder.end_encoding();
        Ok(())
    }

    fn encode_renderable(&self, encoder: &mut RenderEncoder<'_>, renderable: &dyn Renderable) {
        encoder.push_debug_group(renderable.label());

        let materials = renderable.materials();
        if materials.iter().any(|m| m.lighting()) {
            if let Some(buffer) = self.lights.buffer() {
                encoder.set_fragment_buffer(
                    buffer,
                    self.lights.offset(),
                    FragmentBufferIndex::Lighting.into(),
                );
            }
        }
        if materials.iter().any(|m| m.receive_shadow()) {
            if let Some(matrices) = self.shadows.matrices() {
                encoder.set_vertex_buffer(
                    matrices.buffer(),
                    matrices.offset(),
                    VertexBufferIndex::ShadowMatrices.into(),
                );
            }
            if let Some(arguments) = self.shadows.arguments() {
                encoder.set_fragment_buffer(
                    arguments.buffer(),
                    0,
                    FragmentBufferIndex::Shadows.into(),
                );
            }
        }

        let cull_mode = renderable.cull_mode();
        if cull_mode == CullMode::None && !renderable.opaque() {
            renderable.draw(encoder, CullMode::Front, false);
            renderable.draw(encoder, CullMode::Back, false);
        } else {
            renderable.draw(encoder, cull_mode, false);
        }

        encoder.pop_debug_group();
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("size", &(self.width, self.height))
            .field("compute_systems", &self.compute_systems.len())
            .finish()
    }
}
