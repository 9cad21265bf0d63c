//! Materials.
//!
//! Every material embeds a [`MaterialCore`] (shader, parameters, uniform
//! ring, lighting and shadow configuration) and implements [`Material`].
//! Optional behaviour is composed through capability traits rather than a
//! type hierarchy:
//!
//! - [`ShaderFactory`] - entry points used to build the material's shader
//! - [`TextureSlots`] - fragment textures bound with the material
//!
//! Built-in materials:
//! - [`BasicColorMaterial`] - unlit flat color
//! - [`BasicTextureMaterial`] - unlit 2D texture
//! - [`StandardMaterial`] - lit metallic/roughness, receives shadows

mod base;
mod basic;
mod material;
mod standard;

pub use base::MaterialCore;
pub use basic::{BasicColorMaterial, BasicTextureMaterial};
pub use material::{Material, ShaderFactory, TextureSlots};
pub use standard::StandardMaterial;

use crate::pipeline::ShaderProgram;

/// Entry points a program must export to serve every built-in material.
pub const BUILTIN_ENTRY_POINTS: &[&str] = &[
    BasicColorMaterial::VERTEX_ENTRY,
    BasicColorMaterial::FRAGMENT_ENTRY,
    BasicTextureMaterial::VERTEX_ENTRY,
    BasicTextureMaterial::FRAGMENT_ENTRY,
    StandardMaterial::VERTEX_ENTRY,
    StandardMaterial::FRAGMENT_ENTRY,
    "shadow_vertex",
];

/// Describe a precompiled library exporting [`BUILTIN_ENTRY_POINTS`].
pub fn builtin_program_from(label: &str, bytes: Vec<u8>) -> ShaderProgram {
    BUILTIN_ENTRY_POINTS
        .iter()
        .fold(ShaderProgram::new(label, bytes), |program, entry| {
            program.with_entry_point(*entry)
        })
}

/// An empty library exporting [`BUILTIN_ENTRY_POINTS`], for headless
/// backends that do not read shader bytes.
pub fn builtin_program() -> ShaderProgram {
    builtin_program_from("Builtin", Vec::new())
}
