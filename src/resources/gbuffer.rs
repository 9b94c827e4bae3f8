//! Geometry buffer
//!
//! Holds the per-pixel surface data written by the opaque pass:
//! - Albedo (base color)
//! - View-space normals
//! - Specular color and shininess
//! - Depth/stencil

use crate::backend::*;
use crate::cache::{BorrowCache, CacheStats, Receipt, ResourceLoader};
use crate::config::CacheConfig;
use crate::error::RenderResult;

use super::{PendingAllocations, RenderTarget, RenderTargetDescription};

pub const GBUFFER_ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const GBUFFER_SPECULAR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const GBUFFER_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

/// Describes a geometry buffer. Used as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GBufferDescription {
    pub extent: Extent,
    /// Depth format, matching the target the depth is later copied into
    pub depth_format: TextureFormat,
}

impl GBufferDescription {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            depth_format: GBUFFER_DEPTH_FORMAT,
        }
    }

    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = format;
        self
    }
}

/// Geometry buffer textures and the framebuffers writing them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBuffer {
    pub description: GBufferDescription,
    /// All four attachments
    pub framebuffer: FramebufferHandle,
    /// Depth only, used to copy depth out of the buffer
    pub depth_framebuffer: FramebufferHandle,
    pub albedo: TextureHandle,
    pub normal: TextureHandle,
    pub specular: TextureHandle,
    pub depth: TextureHandle,
    pub normal_format: TextureFormat,
}

impl GBuffer {
    pub fn extent(&self) -> Extent {
        self.description.extent
    }

    /// The depth attachment as a depth-only render target
    pub fn depth_target(&self) -> RenderTarget {
        RenderTarget {
            framebuffer: self.depth_framebuffer,
            description: RenderTargetDescription::depth(self.extent(), self.description.depth_format),
            color: None,
            depth: Some(self.depth),
        }
    }

    fn byte_size(&self) -> usize {
        let per_pixel = GBUFFER_ALBEDO_FORMAT.bytes_per_pixel()
            + self.normal_format.bytes_per_pixel()
            + GBUFFER_SPECULAR_FORMAT.bytes_per_pixel()
            + self.description.depth_format.bytes_per_pixel();
        self.extent().pixel_count() as usize * per_pixel as usize
    }
}

/// Loads geometry buffers
pub struct GBufferLoader<B: GraphicsBackend> {
    backend: SharedBackend<B>,
}

impl<B: GraphicsBackend> GBufferLoader<B> {
    pub fn new(backend: SharedBackend<B>) -> Self {
        Self { backend }
    }
}

impl<B: GraphicsBackend> ResourceLoader for GBufferLoader<B> {
    type Key = GBufferDescription;
    type Value = GBuffer;

    fn load(&mut self, key: &GBufferDescription) -> RenderResult<GBuffer> {
        let mut backend = self.backend.borrow_mut();
        // Float normals when they can be rendered into
        let normal_format = if backend.capabilities().float_color_render_targets {
            TextureFormat::Rgba16Float
        } else {
            TextureFormat::Rgba8Unorm
        };
        let mut pending = PendingAllocations::new(&mut *backend);

        let texture = |label: &str, format| TextureDescriptor {
            label: Some(label.to_string()),
            extent: key.extent,
            dimension: TextureDimension::D2,
            format,
            filter: FilterMode::Nearest,
        };
        let albedo = pending.texture(&texture("gbuffer_albedo", GBUFFER_ALBEDO_FORMAT))?;
        let normal = pending.texture(&texture("gbuffer_normal", normal_format))?;
        let specular = pending.texture(&texture("gbuffer_specular", GBUFFER_SPECULAR_FORMAT))?;
        let depth = pending.texture(&texture("gbuffer_depth", key.depth_format))?;

        let framebuffer = pending.framebuffer(&FramebufferDescriptor {
            label: Some("gbuffer".into()),
            color: vec![
                AttachmentTarget::texture(albedo),
                AttachmentTarget::texture(normal),
                AttachmentTarget::texture(specular),
            ],
            depth: Some(AttachmentTarget::texture(depth)),
        })?;
        let depth_framebuffer = pending.framebuffer(&FramebufferDescriptor {
            label: Some("gbuffer_depth".into()),
            color: Vec::new(),
            depth: Some(AttachmentTarget::texture(depth)),
        })?;
        pending.commit();

        Ok(GBuffer {
            description: *key,
            framebuffer,
            depth_framebuffer,
            albedo,
            normal,
            specular,
            depth,
            normal_format,
        })
    }

    fn close(&mut self, value: GBuffer) {
        let mut backend = self.backend.borrow_mut();
        backend.destroy_framebuffer(value.depth_framebuffer);
        backend.destroy_framebuffer(value.framebuffer);
        for texture in [value.albedo, value.normal, value.specular, value.depth] {
            backend.destroy_texture(texture);
        }
    }

    fn size_of(&self, value: &GBuffer) -> usize {
        value.byte_size()
    }
}

/// An outstanding geometry buffer borrow
pub type GBufferReceipt = Receipt<GBufferDescription, GBuffer>;

/// Cache of geometry buffers keyed by size
#[derive(Debug, Clone)]
pub struct GBufferCache {
    cache: BorrowCache<GBufferDescription, GBuffer>,
}

impl GBufferCache {
    pub fn new<B: GraphicsBackend + 'static>(backend: SharedBackend<B>, config: CacheConfig) -> Self {
        Self::wrap(BorrowCache::new(GBufferLoader::new(backend), config))
    }

    /// View an existing cache as a geometry buffer cache
    pub fn wrap(cache: BorrowCache<GBufferDescription, GBuffer>) -> Self {
        Self { cache }
    }

    pub fn get(&self, description: &GBufferDescription) -> RenderResult<GBufferReceipt> {
        self.cache.get(description)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn evict_idle(&self) -> usize {
        self.cache.evict_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    #[test]
    fn test_partial_failure_rolls_back() {
        let backend = share(DummyBackend::new());
        backend.borrow_mut().fail_texture_creation_after(3);
        let cache = GBufferCache::new(backend.clone(), CacheConfig::default());

        let err = cache.get(&GBufferDescription::new(Extent::new(32, 32))).unwrap_err();
        assert!(matches!(err, RenderError::Allocation(_)));
        assert_eq!(backend.borrow().live_textures(), 0);
        assert_eq!(backend.borrow().textures_destroyed(), 3);
    }

    #[test]
    fn test_depth_target_shares_depth_texture() {
        let backend = share(DummyBackend::new());
        let cache = GBufferCache::new(backend.clone(), CacheConfig::default());
        let gbuffer = cache.get(&GBufferDescription::new(Extent::new(32, 32))).unwrap();
        let depth = gbuffer.depth_target();
        assert_eq!(depth.depth, Some(gbuffer.depth));
        assert!(!depth.has_color());
        assert_eq!(backend.borrow().live_framebuffers(), 2);
    }

    #[test]
    fn test_depth_format_is_part_of_the_key() {
        let backend = share(DummyBackend::new());
        let cache = GBufferCache::new(backend.clone(), CacheConfig::default());
        let extent = Extent::new(16, 16);
        let stencil = GBufferDescription::new(extent);
        let float = stencil.with_depth_format(TextureFormat::Depth32Float);

        cache.get(&stencil).unwrap().return_to_cache();
        let gbuffer = cache.get(&float).unwrap();

        assert_eq!(cache.stats().misses, 2);
        assert_eq!(
            gbuffer.depth_target().description.depth,
            Some(TextureFormat::Depth32Float)
        );
    }
}
