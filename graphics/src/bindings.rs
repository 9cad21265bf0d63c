//! Fixed binding slots shared by the renderer and the shader programs.

/// Vertex stage buffer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VertexBufferIndex {
    Vertices = 0,
    VertexUniforms = 1,
    InstanceMatrixUniforms = 2,
    MaterialUniforms = 3,
    ShadowMatrices = 4,
}

/// Fragment stage buffer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FragmentBufferIndex {
    MaterialUniforms = 0,
    Lighting = 1,
    /// Argument table: shadow data buffer then one texture per shadow.
    Shadows = 2,
}

/// Fragment stage texture slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FragmentTextureIndex {
    BaseColor = 0,
    Normal = 1,
    Roughness = 2,
    Metallic = 3,
    Emissive = 4,
}

/// Compute stage texture slots; feedback systems bind the previous frame's
/// texture first, then the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComputeTextureIndex {
    Custom0 = 0,
}

macro_rules! index_conversions {
    ($($name:ident),*) => {
        $(impl From<$name> for u32 {
            fn from(index: $name) -> u32 {
                index as u32
            }
        })*
    };
}

index_conversions!(
    VertexBufferIndex,
    FragmentBufferIndex,
    FragmentTextureIndex,
    ComputeTextureIndex
);
