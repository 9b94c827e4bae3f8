//! Render targets and their cache

use crate::backend::*;
use crate::cache::{BorrowCache, CacheStats, Receipt, ResourceLoader};
use crate::config::CacheConfig;
use crate::error::{RenderError, RenderResult};

use super::{PendingAllocations, RenderTargetDescription};

/// A framebuffer plus the textures attached to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub framebuffer: FramebufferHandle,
    pub description: RenderTargetDescription,
    pub color: Option<TextureHandle>,
    pub depth: Option<TextureHandle>,
}

impl RenderTarget {
    pub fn extent(&self) -> Extent {
        self.description.extent
    }

    /// The whole surface
    pub fn area(&self) -> Area {
        Area::full(self.description.extent)
    }

    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// Color holds depth moments rather than shaded color
    pub fn is_variance(&self) -> bool {
        self.description.color.is_some_and(|f| f.is_variance())
    }

    pub fn color_texture(&self) -> RenderResult<TextureHandle> {
        self.color.ok_or_else(|| {
            RenderError::IncompatibleTargets(format!("{:?} has no color texture", self.framebuffer))
        })
    }

    pub fn depth_texture(&self) -> RenderResult<TextureHandle> {
        self.depth.ok_or_else(|| {
            RenderError::IncompatibleTargets(format!("{:?} has no depth texture", self.framebuffer))
        })
    }
}

/// Build a render target's textures and framebuffer through a rollback guard
pub(crate) fn create_render_target<B: GraphicsBackend>(
    pending: &mut PendingAllocations<'_, B>,
    description: &RenderTargetDescription,
    label: &str,
) -> RenderResult<RenderTarget> {
    description.validate()?;
    if let Some(format) = description.color {
        if format.is_float_color() && !pending.backend().capabilities().float_color_render_targets {
            return Err(RenderError::Unsupported(format!(
                "{format:?} render targets"
            )));
        }
    }

    let texture = |format| TextureDescriptor {
        label: Some(label.to_string()),
        extent: description.extent,
        dimension: TextureDimension::D2,
        format,
        filter: description.filter,
    };

    let color = description
        .color
        .map(|format| pending.texture(&texture(format)))
        .transpose()?;
    let depth = description
        .depth
        .map(|format| pending.texture(&texture(format)))
        .transpose()?;
    let framebuffer = pending.framebuffer(&FramebufferDescriptor {
        label: Some(label.to_string()),
        color: color.map(AttachmentTarget::texture).into_iter().collect(),
        depth: depth.map(AttachmentTarget::texture),
    })?;

    Ok(RenderTarget {
        framebuffer,
        description: *description,
        color,
        depth,
    })
}

pub(crate) fn destroy_render_target<B: GraphicsBackend>(backend: &mut B, target: &RenderTarget) {
    backend.destroy_framebuffer(target.framebuffer);
    if let Some(color) = target.color {
        backend.destroy_texture(color);
    }
    if let Some(depth) = target.depth {
        backend.destroy_texture(depth);
    }
}

/// Loads render targets from their descriptions
pub struct RenderTargetLoader<B: GraphicsBackend> {
    backend: SharedBackend<B>,
}

impl<B: GraphicsBackend> RenderTargetLoader<B> {
    pub fn new(backend: SharedBackend<B>) -> Self {
        Self { backend }
    }
}

impl<B: GraphicsBackend> ResourceLoader for RenderTargetLoader<B> {
    type Key = RenderTargetDescription;
    type Value = RenderTarget;

    fn load(&mut self, key: &RenderTargetDescription) -> RenderResult<RenderTarget> {
        let mut backend = self.backend.borrow_mut();
        let mut pending = PendingAllocations::new(&mut *backend);
        let target = create_render_target(&mut pending, key, "render_target")?;
        pending.commit();
        Ok(target)
    }

    fn close(&mut self, value: RenderTarget) {
        destroy_render_target(&mut *self.backend.borrow_mut(), &value);
    }

    fn size_of(&self, value: &RenderTarget) -> usize {
        value.description.byte_size()
    }
}

/// An outstanding render target borrow
pub type RenderTargetReceipt = Receipt<RenderTargetDescription, RenderTarget>;

/// Cache of off-screen render targets keyed by description
#[derive(Debug, Clone)]
pub struct RenderTargetCache {
    cache: BorrowCache<RenderTargetDescription, RenderTarget>,
}

impl RenderTargetCache {
    pub fn new<B: GraphicsBackend + 'static>(backend: SharedBackend<B>, config: CacheConfig) -> Self {
        Self::wrap(BorrowCache::new(RenderTargetLoader::new(backend), config))
    }

    /// View an existing cache as a render target cache
    pub fn wrap(cache: BorrowCache<RenderTargetDescription, RenderTarget>) -> Self {
        Self { cache }
    }

    pub fn get(&self, description: &RenderTargetDescription) -> RenderResult<RenderTargetReceipt> {
        self.cache.get(description)
    }

    pub fn with_borrowed<R>(
        &self,
        description: &RenderTargetDescription,
        f: impl FnOnce(&RenderTarget) -> RenderResult<R>,
    ) -> RenderResult<R> {
        self.cache.with_borrowed(description, f)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn evict_idle(&self) -> usize {
        self.cache.evict_idle()
    }

    pub fn inner(&self) -> &BorrowCache<RenderTargetDescription, RenderTarget> {
        &self.cache
    }
}
