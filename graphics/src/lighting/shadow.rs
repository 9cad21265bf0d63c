//! Shadow maps owned by lights.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use lumen_core::{ChangeCounter, Transform};

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{StructBuffer, Texture};
use crate::scene::Camera;
use crate::shader::SHADOW_DEPTH_FORMAT;
use crate::types::{TextureDescriptor, TextureUsage};

/// Default shadow map edge length.
pub const DEFAULT_SHADOW_RESOLUTION: u32 = 1024;

/// Per-shadow sampling settings read by receiving shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowData {
    pub strength: f32,
    pub radius: f32,
    pub bias: f32,
    pub normal_bias: f32,
}

impl Default for ShadowData {
    fn default() -> Self {
        Self {
            strength: 1.0,
            radius: 1.0,
            bias: 0.005,
            normal_bias: 0.01,
        }
    }
}

/// A light's shadow camera and depth map.
///
/// Changes are reported on three counters so dependents can rebuild only
/// what moved: the light-space matrix, the sampling data, or the texture.
pub struct Shadow {
    camera: Camera,
    width: u32,
    height: u32,
    texture: Option<Arc<Texture>>,
    data: ShadowData,
    world_revision: u64,
    camera_uniforms: Option<StructBuffer<Mat4>>,
    matrix_changes: ChangeCounter,
    data_changes: ChangeCounter,
    texture_changes: ChangeCounter,
}

impl Shadow {
    /// Orthographic shadow for a directional light.
    pub fn directional() -> Self {
        Self::new(
            Camera::orthographic(-10.0, 10.0, -10.0, 10.0, 0.01, 50.0)
                .with_label("Directional Light Shadow Camera"),
        )
    }

    /// Perspective shadow covering a spot cone of `outer_angle` degrees
    /// (half-angle) out to `radius`.
    pub fn spot(outer_angle: f32, radius: f32) -> Self {
        let far = if radius > 0.0 { radius } else { 50.0 };
        Self::new(
            Camera::perspective((outer_angle * 2.0).clamp(1.0, 179.0), 0.01, far)
                .with_label("Spot Light Shadow Camera"),
        )
    }

    fn new(camera: Camera) -> Self {
        Self {
            camera,
            width: DEFAULT_SHADOW_RESOLUTION,
            height: DEFAULT_SHADOW_RESOLUTION,
            texture: None,
            data: ShadowData::default(),
            world_revision: 0,
            camera_uniforms: None,
            matrix_changes: ChangeCounter::new(),
            data_changes: ChangeCounter::new(),
            texture_changes: ChangeCounter::new(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the shadow camera projection, e.g. to fit a larger scene.
    pub fn set_camera(&mut self, camera: Camera) {
        let transform = *self.camera.transform();
        self.camera = camera;
        self.camera.set_transform(transform);
        self.matrix_changes.bump();
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Change the shadow map size. The texture is reallocated on the next
    /// [`prepare`](Self::prepare).
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if (self.width, self.height) != (width, height) {
            self.width = width;
            self.height = height;
            self.texture = None;
        }
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    pub fn data(&self) -> ShadowData {
        self.data
    }

    pub fn set_data(&mut self, data: ShadowData) {
        if self.data != data {
            self.data = data;
            self.data_changes.bump();
        }
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.set_data(ShadowData {
            strength,
            ..self.data
        });
    }

    pub fn set_bias(&mut self, bias: f32) {
        self.set_data(ShadowData { bias, ..self.data });
    }

    pub fn set_normal_bias(&mut self, normal_bias: f32) {
        self.set_data(ShadowData {
            normal_bias,
            ..self.data
        });
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.set_data(ShadowData { radius, ..self.data });
    }

    /// Light-space view-projection matrix.
    pub fn matrix(&self) -> Mat4 {
        self.camera.view_projection_matrix()
    }

    /// Uniform holding [`matrix`](Self::matrix) for the shadow pass.
    pub fn camera_uniforms(&self) -> Option<&StructBuffer<Mat4>> {
        self.camera_uniforms.as_ref()
    }

    pub fn matrix_changes(&self) -> &ChangeCounter {
        &self.matrix_changes
    }

    pub fn data_changes(&self) -> &ChangeCounter {
        &self.data_changes
    }

    pub fn texture_changes(&self) -> &ChangeCounter {
        &self.texture_changes
    }

    /// Fit the camera to the light at `world` and allocate the depth map
    /// and camera uniforms if missing.
    ///
    /// `world_revision` identifies the light's transform; the matrix is
    /// refitted only when it changes.
    pub fn prepare(
        &mut self,
        device: &Arc<GraphicsDevice>,
        world: &Mat4,
        world_revision: u64,
    ) -> Result<(), GraphicsError> {
        if self.world_revision != world_revision {
            self.world_revision = world_revision;
            let transform = Transform::from_matrix(world).with_scale(Vec3::ONE);
            self.camera.set_transform(transform);
            self.matrix_changes.bump();
        }

        if self.texture.is_none() {
            let descriptor = TextureDescriptor::new_2d(
                self.width,
                self.height,
                SHADOW_DEPTH_FORMAT,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::SHADER_READ,
            )
            .with_label("Shadow Map");
            self.texture = Some(device.create_texture(&descriptor)?);
            self.texture_changes.bump();
            log::debug!(
                "Shadow: allocated {}x{} shadow map",
                self.width,
                self.height
            );
        }

        if self.camera_uniforms.is_none() {
            self.camera_uniforms = Some(StructBuffer::new(device, 1, "Shadow Camera")?);
        }
        let matrix = self.camera.view_projection_matrix();
        match self.camera_uniforms.as_mut() {
            Some(uniforms) => uniforms.update(&[matrix]),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Shadow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shadow")
            .field("camera", &self.camera.label())
            .field("resolution", &(self.width, self.height))
            .field("allocated", &self.texture.is_some())
            .field("data", &self.data)
            .finish()
    }
}
