//! Region copies between render targets
//!
//! A copy whose source and target regions differ in size rescales. Color is
//! filtered linearly when rescaling, depth is always sampled nearest.
//!
//! Copying between overlapping regions of the same target reads pixels that
//! were already overwritten. Callers that need `input == output` route the
//! copy through a borrowed scratch target (see
//! [`copy_through_scratch`](crate::filters::copy_through_scratch)).

use crate::backend::*;
use crate::error::{RenderError, RenderResult};
use crate::resources::RenderTarget;

/// Which attachments a copy moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyChannels {
    Color,
    ColorWithDepth,
    Depth,
    /// Color attachments holding variance depth moments
    DepthVariance,
}

impl CopyChannels {
    pub fn mask(&self) -> BlitMask {
        match self {
            CopyChannels::Color | CopyChannels::DepthVariance => BlitMask::COLOR,
            CopyChannels::ColorWithDepth => BlitMask::COLOR_DEPTH,
            CopyChannels::Depth => BlitMask::DEPTH,
        }
    }

    /// Channels both targets can take part in, if any
    pub fn common(source: &RenderTarget, target: &RenderTarget) -> Option<Self> {
        let color = source.has_color() && target.has_color();
        let depth = source.has_depth() && target.has_depth();
        match (color, depth) {
            (true, true) => Some(CopyChannels::ColorWithDepth),
            (true, false) if source.is_variance() && target.is_variance() => {
                Some(CopyChannels::DepthVariance)
            }
            (true, false) => Some(CopyChannels::Color),
            (false, true) => Some(CopyChannels::Depth),
            (false, false) => None,
        }
    }
}

/// Copies pixel regions between render targets
pub struct RegionCopier<B: GraphicsBackend> {
    backend: SharedBackend<B>,
}

impl<B: GraphicsBackend> RegionCopier<B> {
    pub fn new(backend: SharedBackend<B>) -> Self {
        Self { backend }
    }

    /// Copy `source_area` of `source` into `target_area` of `target`
    pub fn copy(
        &self,
        source: &RenderTarget,
        source_area: Area,
        target: &RenderTarget,
        target_area: Area,
        channels: CopyChannels,
    ) -> RenderResult<()> {
        check_area(source, source_area)?;
        check_area(target, target_area)?;
        check_channels(source, target, channels)?;

        if source.framebuffer == target.framebuffer && source_area.overlaps(&target_area) {
            log::warn!(
                "Copying between overlapping regions {:?} and {:?} of {:?}",
                source_area,
                target_area,
                source.framebuffer
            );
        }

        let mask = channels.mask();
        let filter = if source_area.same_size(&target_area) || mask.contains(BlitMask::DEPTH) {
            FilterMode::Nearest
        } else {
            FilterMode::Linear
        };

        self.backend.borrow_mut().blit_framebuffer(
            source.framebuffer,
            source_area,
            target.framebuffer,
            target_area,
            mask,
            filter,
        )?;
        Ok(())
    }

    /// Copy the whole of `source` over the whole of `target`
    pub fn copy_full(
        &self,
        source: &RenderTarget,
        target: &RenderTarget,
        channels: CopyChannels,
    ) -> RenderResult<()> {
        self.copy(source, source.area(), target, target.area(), channels)
    }
}

fn check_area(target: &RenderTarget, area: Area) -> RenderResult<()> {
    let extent = target.extent();
    if area.width == 0 || area.height == 0 || !area.fits_within(extent) {
        return Err(RenderError::RegionOutOfBounds {
            region: area,
            width: extent.width,
            height: extent.height,
        });
    }
    Ok(())
}

fn check_channels(
    source: &RenderTarget,
    target: &RenderTarget,
    channels: CopyChannels,
) -> RenderResult<()> {
    let (color, depth, variance) = match channels {
        CopyChannels::Color => (true, false, false),
        CopyChannels::ColorWithDepth => (true, true, false),
        CopyChannels::Depth => (false, true, false),
        CopyChannels::DepthVariance => (true, false, true),
    };
    let missing = |t: &RenderTarget| {
        (color && !t.has_color()) || (depth && !t.has_depth()) || (variance && !t.is_variance())
    };
    // Depth is copied bit for bit, never converted
    let mismatched_depth = depth && source.description.depth != target.description.depth;
    if missing(source) || missing(target) || mismatched_depth {
        return Err(RenderError::IncompatibleTargets(format!(
            "{:?} copy from {:?} to {:?}",
            channels, source.description, target.description
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::resources::{RenderTargetCache, RenderTargetDescription};
    use glam::Vec4;

    fn setup() -> (SharedBackend<DummyBackend>, RenderTargetCache, RegionCopier<DummyBackend>) {
        let backend = share(DummyBackend::new());
        let cache = RenderTargetCache::new(backend.clone(), CacheConfig::default());
        let copier = RegionCopier::new(backend.clone());
        (backend, cache, copier)
    }

    #[test]
    fn test_copy_outside_target_fails() {
        let (_backend, cache, copier) = setup();
        let desc = RenderTargetDescription::color(Extent::new(4, 4), TextureFormat::Rgba8Unorm);
        let a = cache.get(&desc).unwrap();
        let b = cache.get(&desc).unwrap();
        let err = copier
            .copy(&a, Area::new(0, 0, 4, 4), &b, Area::new(2, 2, 4, 4), CopyChannels::Color)
            .unwrap_err();
        assert!(matches!(err, RenderError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_depth_copy_needs_depth_on_both_sides() {
        let (_backend, cache, copier) = setup();
        let color = RenderTargetDescription::color(Extent::new(4, 4), TextureFormat::Rgba8Unorm);
        let depth = color.with_depth(TextureFormat::Depth24Plus);
        let a = cache.get(&depth).unwrap();
        let b = cache.get(&color).unwrap();
        let err = copier.copy_full(&a, &b, CopyChannels::Depth).unwrap_err();
        assert!(matches!(err, RenderError::IncompatibleTargets(_)));
    }

    #[test]
    fn test_rescaling_copy_uses_linear_for_color_only() {
        let (backend, cache, copier) = setup();
        let big = RenderTargetDescription::color(Extent::new(8, 8), TextureFormat::Rgba8Unorm);
        let small = big.scaled(0.5);
        let a = cache.get(&big).unwrap();
        let b = cache.get(&small).unwrap();
        backend
            .borrow_mut()
            .write_texels(a.color.unwrap(), &vec![Vec4::ONE; 64])
            .unwrap();

        copier.copy_full(&a, &b, CopyChannels::Color).unwrap();
        assert_eq!(backend.borrow().texel(b.color.unwrap(), 3, 3), Some(Vec4::ONE));
        assert_eq!(CopyChannels::common(&a, &b), Some(CopyChannels::Color));
    }
}
