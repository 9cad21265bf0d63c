//! Texture types and descriptors.

use super::Extent3d;
use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 16-bit red channel, float.
    R16Float,
    /// 32-bit red channel, float.
    R32Float,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 8-bit stencil only.
    Stencil8,
    /// 16-bit depth.
    Depth16Unorm,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns true if this format has a depth component.
    pub fn has_depth(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm | Self::Depth32Float | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Stencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        self.has_depth() || self.has_stencil()
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::Stencil8 => 1,
            Self::R16Float | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be read in a shader.
        const SHADER_READ = 1 << 2;
        /// Texture can be written by a compute shader.
        const SHADER_WRITE = 1 << 3;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    D2,
    D3,
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent3d,
    /// 2D or 3D.
    pub dimension: TextureDimension,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            dimension: TextureDimension::D2,
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Create a new 3D texture descriptor.
    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            size: Extent3d::new_3d(width, height, depth),
            dimension: TextureDimension::D3,
            ..Self::new_2d(width, height, format, usage)
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Add usage flags.
    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage |= usage;
        self
    }

    pub fn is_3d(&self) -> bool {
        self.dimension == TextureDimension::D3
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(0, 0, TextureFormat::default(), TextureUsage::empty())
    }
}
