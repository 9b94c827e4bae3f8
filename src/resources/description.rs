//! Render target descriptions

use crate::backend::{Extent, FilterMode, TextureFormat};
use crate::error::{RenderError, RenderResult};

/// Minimum side length of a scaled working buffer
pub const MIN_SCALED_SIZE: u32 = 2;

/// Describes an off-screen render target. Used as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDescription {
    pub extent: Extent,
    /// Color attachment format, if the target has one
    pub color: Option<TextureFormat>,
    /// Depth attachment format, if the target has one
    pub depth: Option<TextureFormat>,
    pub filter: FilterMode,
}

impl RenderTargetDescription {
    /// Color-only target with linear filtering
    pub fn color(extent: Extent, format: TextureFormat) -> Self {
        Self {
            extent,
            color: Some(format),
            depth: None,
            filter: FilterMode::Linear,
        }
    }

    /// Depth-only target with nearest filtering
    pub fn depth(extent: Extent, format: TextureFormat) -> Self {
        Self {
            extent,
            color: None,
            depth: Some(format),
            filter: FilterMode::Nearest,
        }
    }

    pub fn with_depth(mut self, format: TextureFormat) -> Self {
        self.depth = Some(format);
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    /// Same formats at a scaled size, at least 2x2
    pub fn scaled(&self, scale: f32) -> Self {
        self.with_extent(self.extent.scaled(scale, MIN_SCALED_SIZE))
    }

    /// Same description without the depth attachment
    pub fn color_only(&self) -> Self {
        Self {
            depth: None,
            ..*self
        }
    }

    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// Bytes of GPU memory the attachments occupy
    pub fn byte_size(&self) -> usize {
        let per_pixel = self.color.map_or(0, |f| f.bytes_per_pixel())
            + self.depth.map_or(0, |f| f.bytes_per_pixel());
        self.extent.pixel_count() as usize * per_pixel as usize
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.extent.width == 0 || self.extent.height == 0 {
            return Err(RenderError::InvalidParameter(format!(
                "render target extent {:?} is empty",
                self.extent
            )));
        }
        match (self.color, self.depth) {
            (None, None) => Err(RenderError::InvalidParameter(
                "render target has no attachments".into(),
            )),
            (Some(color), _) if color.is_depth() => Err(RenderError::InvalidParameter(format!(
                "{color:?} is not a color format"
            ))),
            (_, Some(depth)) if !depth.is_depth() => Err(RenderError::InvalidParameter(format!(
                "{depth:?} is not a depth format"
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = RenderTargetDescription::color(Extent::new(64, 64), TextureFormat::Rgba8Unorm);
        let b = RenderTargetDescription::color(Extent::new(64, 64), TextureFormat::Rgba8Unorm);
        assert_eq!(a, b);
        assert_ne!(a, a.with_filter(FilterMode::Nearest));
        assert_ne!(a, a.with_depth(TextureFormat::Depth24Plus));
    }

    #[test]
    fn test_scaled_keeps_formats() {
        let desc = RenderTargetDescription::color(Extent::new(100, 10), TextureFormat::Rgba16Float);
        let scaled = desc.scaled(0.1);
        assert_eq!(scaled.extent, Extent::new(10, 2));
        assert_eq!(scaled.color, desc.color);
        assert_eq!(scaled.filter, desc.filter);
    }

    #[test]
    fn test_byte_size_counts_both_attachments() {
        let desc = RenderTargetDescription::color(Extent::new(10, 10), TextureFormat::Rgba8Unorm)
            .with_depth(TextureFormat::Depth32Float);
        assert_eq!(desc.byte_size(), 800);
    }

    #[test]
    fn test_validate_rejects_swapped_formats() {
        let desc = RenderTargetDescription::color(Extent::new(4, 4), TextureFormat::Depth32Float);
        assert!(desc.validate().is_err());
        let desc = RenderTargetDescription::depth(Extent::new(4, 4), TextureFormat::Rgba8Unorm);
        assert!(desc.validate().is_err());
    }
}
