//! Shadow map descriptions and the maps built from them

use crate::backend::*;
use crate::resources::RenderTarget;

/// Bits per stored depth value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadowPrecision {
    Low,
    #[default]
    High,
}

impl ShadowPrecision {
    pub fn depth_format(&self) -> TextureFormat {
        match self {
            ShadowPrecision::Low => TextureFormat::Depth16Unorm,
            ShadowPrecision::High => TextureFormat::Depth32Float,
        }
    }

    /// Two-channel format holding depth and depth squared
    pub fn variance_format(&self) -> TextureFormat {
        match self {
            ShadowPrecision::Low => TextureFormat::Rg16Float,
            ShadowPrecision::High => TextureFormat::Rg32Float,
        }
    }
}

/// Size, precision and sampling of one shadow texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowTextureDescription {
    /// Side length in texels; shadow textures are square
    pub size: u32,
    pub precision: ShadowPrecision,
    pub filter: FilterMode,
}

impl ShadowTextureDescription {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            precision: ShadowPrecision::default(),
            filter: FilterMode::Linear,
        }
    }

    pub fn with_precision(mut self, precision: ShadowPrecision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.size, self.size)
    }
}

impl Default for ShadowTextureDescription {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Kind of shadow map a light needs. Used as the shadow cache key.
///
/// The directional variants serve every light that casts along one
/// direction, including projective lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowMapDescription {
    /// One depth target
    DirectionalBasic(ShadowTextureDescription),
    /// One depth-moments target, blurred after rendering
    DirectionalVariance(ShadowTextureDescription),
    /// One depth cube, rendered face by face
    OmniCubeBasic(ShadowTextureDescription),
    /// Two depth targets, one per hemisphere
    OmniDualParaboloidBasic(ShadowTextureDescription),
}

impl ShadowMapDescription {
    pub fn texture(&self) -> &ShadowTextureDescription {
        match self {
            ShadowMapDescription::DirectionalBasic(t)
            | ShadowMapDescription::DirectionalVariance(t)
            | ShadowMapDescription::OmniCubeBasic(t)
            | ShadowMapDescription::OmniDualParaboloidBasic(t) => t,
        }
    }
}

/// Depth cube with one framebuffer per face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeShadowMap {
    pub description: ShadowTextureDescription,
    pub texture: TextureHandle,
    /// Indexed by [`CubeFace::index`]
    pub faces: [FramebufferHandle; 6],
}

/// Front and back hemisphere depth targets sharing one lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualParaboloidShadowMap {
    pub positive: RenderTarget,
    pub negative: RenderTarget,
}

/// An allocated shadow map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMap {
    Basic(RenderTarget),
    Variance(RenderTarget),
    Cube(CubeShadowMap),
    DualParaboloid(DualParaboloidShadowMap),
}

impl ShadowMap {
    /// Textures sampled when lighting with this map
    pub fn textures(&self) -> Vec<TextureHandle> {
        match self {
            ShadowMap::Basic(target) => target.depth.into_iter().collect(),
            ShadowMap::Variance(target) => target.color.into_iter().collect(),
            ShadowMap::Cube(cube) => vec![cube.texture],
            ShadowMap::DualParaboloid(dual) => dual
                .positive
                .depth
                .into_iter()
                .chain(dual.negative.depth)
                .collect(),
        }
    }
}
