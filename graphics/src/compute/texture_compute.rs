//! Ping-pong texture compute.

use std::any::Any;
use std::sync::Arc;

use lumen_core::math::div_ceil;

use crate::bindings::ComputeTextureIndex;
use crate::device::GraphicsDevice;
use crate::encoder::{CommandBuffer, ComputeEncoder};
use crate::error::GraphicsError;
use crate::pipeline::{ComputePipeline, ComputePipelineDescriptor, ShaderProgram};
use crate::resources::Texture;
use crate::types::{Extent3d, TextureDescriptor, TextureUsage};

use super::ComputeSystem;

/// Callback run before a dispatch. Receives the encoder and the first
/// texture index left free after the system bound its textures.
pub type ComputeHook = Box<dyn FnMut(&mut ComputeEncoder<'_>, u32)>;

/// Reset progress of a [`TextureComputeSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    /// Textures were (re)allocated; the next update runs the reset program.
    NeedsReset,
    /// Reset dispatches are being encoded.
    Resetting,
    Steady,
}

/// Threads per threadgroup for a pipeline.
///
/// 2D grids use one SIMD row wide and as many rows as fit; 3D grids use a
/// cube no wider than the SIMD width.
pub fn threads_per_threadgroup(pipeline: &ComputePipeline, is_3d: bool) -> Extent3d {
    let width = pipeline.thread_execution_width().max(1);
    let max_threads = pipeline.max_total_threads_per_threadgroup().max(1);
    if is_3d {
        let side = ((max_threads as f64).cbrt().floor() as u32).clamp(1, width);
        Extent3d::new_3d(side, side, side)
    } else {
        Extent3d::new_2d(width, (max_threads / width).max(1))
    }
}

/// Threadgroups needed to cover `grid`.
pub fn threadgroups_per_grid(grid: Extent3d, per_group: Extent3d) -> Extent3d {
    Extent3d::new_3d(
        div_ceil(grid.width, per_group.width),
        div_ceil(grid.height, per_group.height),
        div_ceil(grid.depth, per_group.depth),
    )
}

/// Owns a set of storage textures written by compute programs.
///
/// With feedback enabled every descriptor gets two textures: the one
/// written last is the current output, the other is bound as input to the
/// next dispatch. A reset program initialises both before the first
/// update, after which every [`update`](ComputeSystem::update) dispatches
/// the update program once and swaps the pair.
pub struct TextureComputeSystem {
    device: Arc<GraphicsDevice>,
    label: String,
    descriptors: Vec<TextureDescriptor>,
    feedback: bool,
    textures: Vec<Arc<Texture>>,
    index: usize,
    state: ResetState,
    reset_pipeline: Option<Arc<ComputePipeline>>,
    update_pipeline: Option<Arc<ComputePipeline>>,
    pre_reset: Option<ComputeHook>,
    pre_update: Option<ComputeHook>,
}

/// One storage texture per descriptor, two with feedback.
fn allocate_textures(
    device: &Arc<GraphicsDevice>,
    label: &str,
    descriptors: &[TextureDescriptor],
    feedback: bool,
) -> Result<Vec<Arc<Texture>>, GraphicsError> {
    let mut usage = TextureUsage::SHADER_WRITE;
    if feedback {
        usage |= TextureUsage::SHADER_READ;
    }
    let count = if feedback { 2 } else { 1 };
    let mut textures = Vec::with_capacity(descriptors.len() * count);
    for (i, descriptor) in descriptors.iter().enumerate() {
        for slot in 0..count {
            let descriptor = descriptor
                .clone()
                .with_usage(usage)
                .with_label(format!("{label} Texture {i}.{slot}"));
            textures.push(device.create_texture(&descriptor)?);
        }
    }
    log::debug!(
        "TextureComputeSystem: '{}' allocated {} textures (feedback: {})",
        label,
        textures.len(),
        feedback
    );
    Ok(textures)
}

impl TextureComputeSystem {
    /// Allocate the textures for `descriptors`.
    ///
    /// # Errors
    ///
    /// Fails if any texture cannot be allocated.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        label: impl Into<String>,
        descriptors: Vec<TextureDescriptor>,
        feedback: bool,
    ) -> Result<Self, GraphicsError> {
        let label = label.into();
        let textures = allocate_textures(device, &label, &descriptors, feedback)?;
        Ok(Self {
            device: Arc::clone(device),
            label,
            descriptors,
            feedback,
            textures,
            index: 0,
            state: ResetState::NeedsReset,
            reset_pipeline: None,
            update_pipeline: None,
            pre_reset: None,
            pre_update: None,
        })
    }

    /// Physical textures per descriptor.
    fn texture_count(&self) -> usize {
        if self.feedback {
            2
        } else {
            1
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn descriptors(&self) -> &[TextureDescriptor] {
        &self.descriptors
    }

    /// Replace the descriptors, reallocating every texture.
    /// On failure the system keeps its previous descriptors and textures.
    pub fn set_descriptors(&mut self, descriptors: Vec<TextureDescriptor>) -> Result<(), GraphicsError> {
        self.textures = allocate_textures(&self.device, &self.label, &descriptors, self.feedback)?;
        self.descriptors = descriptors;
        self.reset();
        Ok(())
    }

    pub fn feedback(&self) -> bool {
        self.feedback
    }

    /// Toggle feedback, reallocating every texture when it changes.
    pub fn set_feedback(&mut self, feedback: bool) -> Result<(), GraphicsError> {
        if self.feedback == feedback {
            return Ok(());
        }
        self.textures = allocate_textures(&self.device, &self.label, &self.descriptors, feedback)?;
        self.feedback = feedback;
        self.reset();
        Ok(())
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    /// Run the reset program again on the next update.
    pub fn reset(&mut self) {
        self.index = 0;
        self.state = ResetState::NeedsReset;
    }

    /// Index of the current output within each descriptor's pair.
    pub fn ping_pong_index(&self) -> usize {
        self.index
    }

    pub fn reset_pipeline(&self) -> Option<&Arc<ComputePipeline>> {
        self.reset_pipeline.as_ref()
    }

    /// Set the program that initialises the textures. Triggers a reset.
    pub fn set_reset_pipeline(&mut self, pipeline: Option<Arc<ComputePipeline>>) {
        self.reset_pipeline = pipeline;
        self.reset();
    }

    pub fn update_pipeline(&self) -> Option<&Arc<ComputePipeline>> {
        self.update_pipeline.as_ref()
    }

    pub fn set_update_pipeline(&mut self, pipeline: Option<Arc<ComputePipeline>>) {
        self.update_pipeline = pipeline;
    }

    /// Build both pipelines from `program`.
    ///
    /// The reset entry is optional; a program without one leaves the
    /// textures as allocated.
    pub fn set_program(
        &mut self,
        program: &Arc<ShaderProgram>,
        reset_entry: Option<&str>,
        update_entry: &str,
    ) -> Result<(), GraphicsError> {
        let reset = match reset_entry {
            Some(entry) => Some(self.device.create_compute_pipeline(
                &ComputePipelineDescriptor::new(
                    format!("{} Reset", self.label),
                    Arc::clone(program),
                    entry,
                ),
            )?),
            None => None,
        };
        let update = self
            .device
            .create_compute_pipeline(&ComputePipelineDescriptor::new(
                format!("{} Update", self.label),
                Arc::clone(program),
                update_entry,
            ))?;
        self.set_reset_pipeline(reset);
        self.set_update_pipeline(Some(update));
        Ok(())
    }

    pub fn set_pre_reset(&mut self, hook: impl FnMut(&mut ComputeEncoder<'_>, u32) + 'static) {
        self.pre_reset = Some(Box::new(hook));
    }

    pub fn set_pre_update(&mut self, hook: impl FnMut(&mut ComputeEncoder<'_>, u32) + 'static) {
        self.pre_update = Some(Box::new(hook));
    }

    /// Every allocated texture, pairs adjacent when feedback is enabled.
    pub fn all_textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }

    /// Current output of every descriptor.
    pub fn textures(&self) -> Vec<Arc<Texture>> {
        (0..self.descriptors.len())
            .filter_map(|i| self.texture(i).cloned())
            .collect()
    }

    /// Current output of descriptor `i`.
    pub fn texture(&self, i: usize) -> Option<&Arc<Texture>> {
        self.textures.get(i * self.texture_count() + self.index)
    }

    /// The other texture of descriptor `i`'s pair, the one written before
    /// the current output. `None` without feedback.
    pub fn previous_texture(&self, i: usize) -> Option<&Arc<Texture>> {
        if !self.feedback {
            return None;
        }
        self.textures.get(i * 2 + (1 - self.index))
    }

    fn ping_pong(&mut self) {
        self.index = (self.index + 1) % self.texture_count();
    }

    /// Bind the textures and return the next free texture index.
    fn bind(&self, encoder: &mut ComputeEncoder<'_>) -> u32 {
        let mut slot = u32::from(ComputeTextureIndex::Custom0);
        let count = self.texture_count();
        for i in 0..self.descriptors.len() {
            let base = i * count;
            if self.feedback {
                let (input, output) = (self.index, 1 - self.index);
                encoder.set_texture(&self.textures[base + input], slot);
                encoder.set_texture(&self.textures[base + output], slot + 1);
                slot += 2;
            } else {
                encoder.set_texture(&self.textures[base], slot);
                slot += 1;
            }
        }
        slot
    }

    fn dispatch(&self, encoder: &mut ComputeEncoder<'_>, pipeline: &ComputePipeline) {
        let Some(texture) = self.textures.get(self.index) else {
            return;
        };
        let grid = texture.size();
        let per_group = threads_per_threadgroup(pipeline, texture.descriptor().is_3d());
        if self.device.capabilities().non_uniform_threadgroups {
            encoder.dispatch_threads(grid, per_group);
        } else {
            encoder.dispatch_threadgroups(threadgroups_per_grid(grid, per_group), per_group);
        }
    }

    /// Encode pending reset dispatches and one update dispatch.
    pub fn encode(&mut self, encoder: &mut ComputeEncoder<'_>) {
        if self.state == ResetState::NeedsReset {
            if let Some(pipeline) = self.reset_pipeline.clone() {
                self.state = ResetState::Resetting;
                encoder.set_compute_pipeline(&pipeline);
                for _ in 0..self.texture_count() {
                    let offset = self.bind(encoder);
                    if let Some(hook) = self.pre_reset.as_mut() {
                        hook(encoder, offset);
                    }
                    self.dispatch(encoder, &pipeline);
                    self.ping_pong();
                }
                log::trace!("TextureComputeSystem: '{}' reset", self.label);
            }
            self.state = ResetState::Steady;
        }

        if let Some(pipeline) = self.update_pipeline.clone() {
            encoder.set_compute_pipeline(&pipeline);
            let offset = self.bind(encoder);
            if let Some(hook) = self.pre_update.as_mut() {
                hook(encoder, offset);
            }
            self.dispatch(encoder, &pipeline);
            self.ping_pong();
        }
    }
}

impl ComputeSystem for TextureComputeSystem {
    fn label(&self) -> &str {
        &self.label
    }

    fn update(&mut self, command_buffer: &mut CommandBuffer) -> Result<(), GraphicsError> {
        if self.textures.is_empty()
            || (self.reset_pipeline.is_none() && self.update_pipeline.is_none())
        {
            return Ok(());
        }
        let Some(mut encoder) = command_buffer.compute_encoder(format!("{} Compute", self.label))
        else {
            log::trace!("TextureComputeSystem: '{}' has no encoder", self.label);
            return Ok(());
        };
        self.encode(&mut encoder);
        encoder.end_encoding();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for TextureComputeSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureComputeSystem")
            .field("label", &self.label)
            .field("descriptors", &self.descriptors.len())
            .field("feedback", &self.feedback)
            .field("index", &self.index)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::device::DeviceCapabilities;
    use crate::encoder::ComputeCommand;
    use crate::types::TextureFormat;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn program() -> Arc<ShaderProgram> {
        Arc::new(
            ShaderProgram::new("Fill", Vec::<u8>::new())
                .with_entry_point("fill_reset")
                .with_entry_point("fill_update"),
        )
    }

    fn descriptor() -> TextureDescriptor {
        TextureDescriptor::new_2d(100, 60, TextureFormat::Rgba32Float, TextureUsage::empty())
    }

    fn system(device: &Arc<GraphicsDevice>, feedback: bool) -> TextureComputeSystem {
        let mut system =
            TextureComputeSystem::new(device, "Fill", vec![descriptor()], feedback).unwrap();
        system
            .set_program(&program(), Some("fill_reset"), "fill_update")
            .unwrap();
        system
    }

    fn run(system: &mut TextureComputeSystem) -> CommandBuffer {
        let mut command_buffer = CommandBuffer::new("test");
        system.update(&mut command_buffer).unwrap();
        command_buffer
    }

    #[test]
    fn test_feedback_allocates_pairs() {
        let device = GraphicsDevice::dummy();
        let system = system(&device, true);
        assert_eq!(system.all_textures().len(), 2);
        let usage = system.all_textures()[0].descriptor().usage;
        assert!(usage.contains(TextureUsage::SHADER_WRITE | TextureUsage::SHADER_READ));

        let single = TextureComputeSystem::new(&device, "Single", vec![descriptor()], false).unwrap();
        assert_eq!(single.all_textures().len(), 1);
        assert!(!single.all_textures()[0]
            .descriptor()
            .usage
            .contains(TextureUsage::SHADER_READ));
        assert!(single.previous_texture(0).is_none());
    }

    #[test]
    fn test_reset_runs_once_per_slot_then_only_update() {
        let device = GraphicsDevice::dummy();
        let mut system = system(&device, true);
        let reset = system.reset_pipeline().unwrap().id();
        let update = system.update_pipeline().unwrap().id();

        let first = run(&mut system);
        let pass = first.compute_passes().next().unwrap();
        assert_eq!(pass.dispatch_count(reset), 2);
        assert_eq!(pass.dispatch_count(update), 1);
        assert_eq!(system.state(), ResetState::Steady);

        let second = run(&mut system);
        let pass = second.compute_passes().next().unwrap();
        assert_eq!(pass.dispatch_count(reset), 0);
        assert_eq!(pass.dispatch_count(update), 1);
    }

    #[test]
    fn test_reassigning_descriptors_resets() {
        let device = GraphicsDevice::dummy();
        let mut system = system(&device, true);
        run(&mut system);
        let old = system.texture(0).unwrap().id();

        system.set_descriptors(vec![descriptor()]).unwrap();
        assert_eq!(system.state(), ResetState::NeedsReset);
        assert_ne!(system.texture(0).unwrap().id(), old);

        let reset = system.reset_pipeline().unwrap().id();
        let buffer = run(&mut system);
        assert_eq!(buffer.compute_passes().next().unwrap().dispatch_count(reset), 2);
    }

    #[test]
    fn test_toggling_feedback_reallocates_and_resets() {
        let device = GraphicsDevice::dummy();
        let mut system = system(&device, false);
        run(&mut system);
        assert_eq!(system.state(), ResetState::Steady);
        let old = system.all_textures()[0].id();

        system.set_feedback(true).unwrap();
        assert!(system.feedback());
        assert_eq!(system.all_textures().len(), 2);
        assert!(system.all_textures().iter().all(|t| t.id() != old));
        assert_eq!(system.state(), ResetState::NeedsReset);
        assert_eq!(system.ping_pong_index(), 0);

        let reset = system.reset_pipeline().unwrap().id();
        let update = system.update_pipeline().unwrap().id();
        let buffer = run(&mut system);
        let pass = buffer.compute_passes().next().unwrap();
        assert_eq!(pass.dispatch_count(reset), 2);
        assert_eq!(pass.dispatch_count(update), 1);
        assert_eq!(system.state(), ResetState::Steady);

        // Same value: nothing is reallocated.
        let current = system.all_textures()[0].id();
        system.set_feedback(true).unwrap();
        assert_eq!(system.all_textures()[0].id(), current);
        assert_eq!(system.state(), ResetState::Steady);
    }

    #[test]
    fn test_failed_reallocation_keeps_previous_state() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let mut system = system(&device, true);
        run(&mut system);
        let textures: Vec<_> = system.all_textures().iter().map(|t| t.id()).collect();

        backend.set_fail_allocations(true);
        let larger =
            TextureDescriptor::new_2d(256, 256, TextureFormat::Rgba32Float, TextureUsage::empty());
        assert!(system.set_descriptors(vec![larger]).is_err());
        assert!(system.set_feedback(false).is_err());

        assert_eq!(system.descriptors()[0].size.width, 100);
        assert!(system.feedback());
        let after: Vec<_> = system.all_textures().iter().map(|t| t.id()).collect();
        assert_eq!(after, textures);
        assert_eq!(system.state(), ResetState::Steady);
    }

    #[test]
    fn test_ping_pong_alternates() {
        let device = GraphicsDevice::dummy();
        let mut system = system(&device, true);
        let a = system.all_textures()[0].id();
        let b = system.all_textures()[1].id();

        run(&mut system);
        assert_eq!(system.ping_pong_index(), 1);
        assert_eq!(system.texture(0).unwrap().id(), b);
        assert_eq!(system.previous_texture(0).unwrap().id(), a);

        let buffer = run(&mut system);
        assert_eq!(system.ping_pong_index(), 0);
        assert_eq!(system.texture(0).unwrap().id(), a);

        // the update read the previous output and wrote the other texture
        let commands = &buffer.compute_passes().next().unwrap().commands;
        assert!(commands.contains(&ComputeCommand::SetTexture { index: 0, texture: b }));
        assert!(commands.contains(&ComputeCommand::SetTexture { index: 1, texture: a }));
    }

    #[test]
    fn test_no_reset_program_goes_steady() {
        let device = GraphicsDevice::dummy();
        let mut system =
            TextureComputeSystem::new(&device, "Fill", vec![descriptor()], true).unwrap();
        system.set_program(&program(), None, "fill_update").unwrap();
        let update = system.update_pipeline().unwrap().id();
        let buffer = run(&mut system);
        let pass = buffer.compute_passes().next().unwrap();
        assert_eq!(pass.dispatches().len(), 1);
        assert_eq!(pass.dispatch_count(update), 1);
        assert_eq!(system.state(), ResetState::Steady);
    }

    #[test]
    fn test_without_pipelines_encodes_nothing() {
        let device = GraphicsDevice::dummy();
        let mut system =
            TextureComputeSystem::new(&device, "Fill", vec![descriptor()], false).unwrap();
        let buffer = run(&mut system);
        assert!(buffer.passes().is_empty());
    }

    #[test]
    fn test_dispatch_strategy_follows_capabilities() {
        let device = GraphicsDevice::dummy();
        let mut direct = system(&device, false);
        let buffer = run(&mut direct);
        let commands = &buffer.compute_passes().next().unwrap().commands;
        assert!(commands.contains(&ComputeCommand::DispatchThreads {
            threads_per_grid: Extent3d::new_2d(100, 60),
            threads_per_threadgroup: Extent3d::new_2d(32, 32),
        }));

        let capabilities = DeviceCapabilities {
            non_uniform_threadgroups: false,
            ..DeviceCapabilities::default()
        };
        let device = GraphicsDevice::new(Arc::new(DummyBackend::with_capabilities(capabilities)));
        let mut tiled = system(&device, false);
        let buffer = run(&mut tiled);
        let commands = &buffer.compute_passes().next().unwrap().commands;
        assert!(commands.contains(&ComputeCommand::DispatchThreadgroups {
            threadgroups_per_grid: Extent3d::new_3d(4, 2, 1),
            threads_per_threadgroup: Extent3d::new_2d(32, 32),
        }));
    }

    #[test]
    fn test_3d_threadgroup_is_a_cube() {
        let device = GraphicsDevice::dummy();
        let descriptor =
            TextureDescriptor::new_3d(16, 16, 16, TextureFormat::R32Float, TextureUsage::empty());
        let mut system = TextureComputeSystem::new(&device, "Volume", vec![descriptor], false).unwrap();
        system.set_program(&program(), None, "fill_update").unwrap();
        let per_group = threads_per_threadgroup(system.update_pipeline().unwrap(), true);
        assert_eq!(per_group, Extent3d::new_3d(10, 10, 10));
        assert_eq!(
            threadgroups_per_grid(Extent3d::new_3d(16, 16, 16), per_group),
            Extent3d::new_3d(2, 2, 2)
        );
    }

    #[test]
    fn test_hooks_receive_free_index() {
        let device = GraphicsDevice::dummy();
        let mut system = TextureComputeSystem::new(
            &device,
            "Fill",
            vec![descriptor(), descriptor()],
            true,
        )
        .unwrap();
        system
            .set_program(&program(), Some("fill_reset"), "fill_update")
            .unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let resets = Rc::clone(&seen);
        system.set_pre_reset(move |_, offset| resets.borrow_mut().push(("reset", offset)));
        let updates = Rc::clone(&seen);
        system.set_pre_update(move |encoder, offset| {
            encoder.set_bytes(&[1, 2, 3, 4], 0);
            updates.borrow_mut().push(("update", offset));
        });

        run(&mut system);
        assert_eq!(
            *seen.borrow(),
            vec![("reset", 4), ("reset", 4), ("update", 4)]
        );
    }

    #[test]
    fn test_missing_entry_point_fails() {
        let device = GraphicsDevice::dummy();
        let mut system =
            TextureComputeSystem::new(&device, "Fill", vec![descriptor()], false).unwrap();
        let err = system.set_program(&program(), None, "missing").unwrap_err();
        assert!(matches!(err, GraphicsError::ShaderCompilationFailed { .. }));
    }
}
