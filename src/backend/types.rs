//! Common types shared between the renderer and its backend

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
    Rg16Float,
    Rg32Float,
    R32Float,
    Depth16Unorm,
    Depth24Plus,
    Depth24PlusStencil8,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24Plus
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
        )
    }

    /// Two-channel float formats hold depth moments for variance shadow maps
    pub fn is_variance(&self) -> bool {
        matches!(self, TextureFormat::Rg16Float | TextureFormat::Rg32Float)
    }

    /// Float color formats need hardware support to be rendered into
    pub fn is_float_color(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba16Float
                | TextureFormat::Rgba32Float
                | TextureFormat::Rg16Float
                | TextureFormat::Rg32Float
                | TextureFormat::R32Float
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Depth16Unorm => 2,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rg16Float
            | TextureFormat::R32Float
            | TextureFormat::Depth24Plus
            | TextureFormat::Depth24PlusStencil8
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float | TextureFormat::Rg32Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    Cube,
}

impl TextureDimension {
    pub fn layers(&self) -> u32 {
        match self {
            TextureDimension::D2 => 1,
            TextureDimension::Cube => 6,
        }
    }
}

/// Cube map face, in the conventional +X, -X, +Y, -Y, +Z, -Z order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Forward and up vectors used to build the face's view matrix
    pub fn basis(&self) -> (Vec3, Vec3) {
        match self {
            CubeFace::PositiveX => (Vec3::X, -Vec3::Y),
            CubeFace::NegativeX => (-Vec3::X, -Vec3::Y),
            CubeFace::PositiveY => (Vec3::Y, Vec3::Z),
            CubeFace::NegativeY => (-Vec3::Y, -Vec3::Z),
            CubeFace::PositiveZ => (Vec3::Z, -Vec3::Y),
            CubeFace::NegativeZ => (-Vec3::Z, -Vec3::Y),
        }
    }
}

/// Filter mode for minification/magnification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Size of a two-dimensional surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Scale both sides, never going below `min` pixels on either side
    pub fn scaled(&self, scale: f32, min: u32) -> Extent {
        Extent {
            width: ((self.width as f32 * scale) as u32).max(min),
            height: ((self.height as f32 * scale) as u32).max(min),
        }
    }
}

/// A rectangular pixel region of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Area {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Area {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole surface of the given extent
    pub fn full(extent: Extent) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn same_size(&self, other: &Area) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn fits_within(&self, extent: Extent) -> bool {
        self.x as u64 + self.width as u64 <= extent.width as u64
            && self.y as u64 + self.height as u64 <= extent.height as u64
    }

    pub fn overlaps(&self, other: &Area) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

bitflags! {
    /// Which attachments a framebuffer blit touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlitMask: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const COLOR_DEPTH = Self::COLOR.bits() | Self::DEPTH.bits();
    }
}

/// Hardware capability flags queried from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Float color formats can be used as render targets
    pub float_color_render_targets: bool,
    /// Cube textures can be attached face by face to framebuffers
    pub cube_render_targets: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            float_color_render_targets: true,
            cube_render_targets: true,
        }
    }
}

/// Texture descriptor
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub extent: Extent,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            extent: Extent::new(1, 1),
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            filter: FilterMode::Nearest,
        }
    }
}

/// Attachment of a texture (or one cube face of it) to a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentTarget {
    pub texture: super::TextureHandle,
    pub face: Option<CubeFace>,
}

impl AttachmentTarget {
    pub fn texture(texture: super::TextureHandle) -> Self {
        Self {
            texture,
            face: None,
        }
    }

    pub fn cube_face(texture: super::TextureHandle, face: CubeFace) -> Self {
        Self {
            texture,
            face: Some(face),
        }
    }
}

/// Framebuffer descriptor
#[derive(Debug, Clone)]
pub struct FramebufferDescriptor {
    pub label: Option<String>,
    pub color: Vec<AttachmentTarget>,
    pub depth: Option<AttachmentTarget>,
}

/// Values used to clear the bound framebuffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub color: Option<Vec4>,
    pub depth: Option<f32>,
}

impl ClearValues {
    pub fn color(color: Vec4) -> Self {
        Self {
            color: Some(color),
            depth: None,
        }
    }

    pub fn depth(depth: f32) -> Self {
        Self {
            color: None,
            depth: Some(depth),
        }
    }

    pub fn color_depth(color: Vec4, depth: f32) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
        }
    }
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOperation {
    Add,
    Subtract,
    Min,
    Max,
}

/// Blend component state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        }
    }
}

/// Blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    pub fn alpha_blending() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::SrcAlpha,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
        }
    }

    pub fn additive() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent::default(),
        }
    }
}

/// Compare function for depth testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    LessEqual,
    Equal,
    Always,
}

/// Depth test and write state for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub compare: CompareFunction,
    pub write: bool,
}

impl DepthState {
    pub fn disabled() -> Self {
        Self {
            compare: CompareFunction::Always,
            write: false,
        }
    }

    pub fn test_and_write() -> Self {
        Self {
            compare: CompareFunction::Less,
            write: true,
        }
    }

    pub fn test_only() -> Self {
        Self {
            compare: CompareFunction::LessEqual,
            write: false,
        }
    }
}

/// Fixed-function state applied to a single draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawState {
    pub blend: Option<BlendState>,
    pub depth: DepthState,
}

impl DrawState {
    /// Fullscreen passes: no blending, no depth
    pub fn fullscreen() -> Self {
        Self {
            blend: None,
            depth: DepthState::disabled(),
        }
    }

    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn with_depth(mut self, depth: DepthState) -> Self {
        self.depth = depth;
        self
    }
}

/// Texture unit index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUnit(pub u32);

/// Value of a single named shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Sampler(TextureUnit),
}

/// A named shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub name: &'static str,
    pub value: UniformValue,
}

impl Uniform {
    pub fn new(name: &'static str, value: UniformValue) -> Self {
        Self { name, value }
    }

    pub fn float(name: &'static str, value: f32) -> Self {
        Self::new(name, UniformValue::Float(value))
    }

    pub fn int(name: &'static str, value: i32) -> Self {
        Self::new(name, UniformValue::Int(value))
    }

    pub fn vec2(name: &'static str, value: Vec2) -> Self {
        Self::new(name, UniformValue::Vec2(value))
    }

    pub fn vec3(name: &'static str, value: Vec3) -> Self {
        Self::new(name, UniformValue::Vec3(value))
    }

    pub fn vec4(name: &'static str, value: Vec4) -> Self {
        Self::new(name, UniformValue::Vec4(value))
    }

    pub fn mat4(name: &'static str, value: Mat4) -> Self {
        Self::new(name, UniformValue::Mat4(value))
    }

    pub fn sampler(name: &'static str, unit: TextureUnit) -> Self {
        Self::new(name, UniformValue::Sampler(unit))
    }
}

/// Observer (camera) uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObserverUniform {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub inv_view: Mat4,
    pub inv_projection: Mat4,
    pub position: Vec4, // w unused
    pub near_far: Vec4, // x=near, y=far, zw = viewport size
}

/// Per-instance uniform data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct InstanceUniform {
    pub model: Mat4,
    pub model_view: Mat4,
    pub normal_matrix: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_extent_clamps_to_minimum() {
        let extent = Extent::new(640, 480);
        assert_eq!(extent.scaled(0.5, 2), Extent::new(320, 240));
        assert_eq!(extent.scaled(0.001, 2), Extent::new(2, 2));
    }

    #[test]
    fn test_area_bounds_and_overlap() {
        let extent = Extent::new(8, 8);
        assert!(Area::new(4, 4, 4, 4).fits_within(extent));
        assert!(!Area::new(5, 4, 4, 4).fits_within(extent));

        let a = Area::new(0, 0, 4, 4);
        assert!(a.overlaps(&Area::new(3, 3, 2, 2)));
        assert!(!a.overlaps(&Area::new(4, 0, 2, 2)));
    }

    #[test]
    fn test_format_classification() {
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(TextureFormat::Rg32Float.is_variance());
        assert!(TextureFormat::Rg16Float.is_float_color());
        assert!(!TextureFormat::Rgba8Unorm.is_float_color());
        assert_eq!(TextureFormat::Rgba32Float.bytes_per_pixel(), 16);
    }

    #[test]
    fn test_blit_mask_combines_attachments() {
        assert_eq!(BlitMask::COLOR | BlitMask::DEPTH, BlitMask::COLOR_DEPTH);
        assert!(BlitMask::COLOR_DEPTH.contains(BlitMask::DEPTH));
        assert!(!BlitMask::COLOR.contains(BlitMask::DEPTH));
    }
}
