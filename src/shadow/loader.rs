//! Shadow map allocation

use crate::backend::*;
use crate::cache::{BorrowCache, CacheStats, Receipt, ResourceLoader};
use crate::config::CacheConfig;
use crate::error::{RenderError, RenderResult};
use crate::resources::{
    create_render_target, destroy_render_target, PendingAllocations, RenderTargetDescription,
};

use super::description::*;

/// Loads every kind of shadow map
pub struct ShadowMapLoader<B: GraphicsBackend> {
    backend: SharedBackend<B>,
}

impl<B: GraphicsBackend> ShadowMapLoader<B> {
    pub fn new(backend: SharedBackend<B>) -> Self {
        Self { backend }
    }
}

fn depth_description(texture: &ShadowTextureDescription) -> RenderTargetDescription {
    RenderTargetDescription::depth(texture.extent(), texture.precision.depth_format())
        .with_filter(texture.filter)
}

fn create_cube<B: GraphicsBackend>(
    pending: &mut PendingAllocations<'_, B>,
    texture: &ShadowTextureDescription,
) -> RenderResult<CubeShadowMap> {
    if !pending.backend().capabilities().cube_render_targets {
        return Err(RenderError::Unsupported("cube render targets".into()));
    }
    let cube = pending.texture(&TextureDescriptor {
        label: Some("shadow_cube".into()),
        extent: texture.extent(),
        dimension: TextureDimension::Cube,
        format: texture.precision.depth_format(),
        filter: texture.filter,
    })?;

    let mut faces = Vec::with_capacity(6);
    for face in CubeFace::ALL {
        faces.push(pending.framebuffer(&FramebufferDescriptor {
            label: Some(format!("shadow_cube_{face:?}")),
            color: Vec::new(),
            depth: Some(AttachmentTarget::cube_face(cube, face)),
        })?);
    }
    let faces: [FramebufferHandle; 6] = faces
        .try_into()
        .map_err(|_| RenderError::InvalidParameter("cube map needs six faces".into()))?;

    Ok(CubeShadowMap {
        description: *texture,
        texture: cube,
        faces,
    })
}

impl<B: GraphicsBackend> ResourceLoader for ShadowMapLoader<B> {
    type Key = ShadowMapDescription;
    type Value = ShadowMap;

    fn load(&mut self, key: &ShadowMapDescription) -> RenderResult<ShadowMap> {
        let mut backend = self.backend.borrow_mut();
        // One guard for the whole map: a failure anywhere, including the
        // second hemisphere, releases everything created before it.
        let mut pending = PendingAllocations::new(&mut *backend);

        let map = match key {
            ShadowMapDescription::DirectionalBasic(texture) => ShadowMap::Basic(
                create_render_target(&mut pending, &depth_description(texture), "shadow_depth")?,
            ),
            ShadowMapDescription::DirectionalVariance(texture) => {
                if !pending.backend().capabilities().float_color_render_targets {
                    return Err(RenderError::Unsupported(
                        "variance shadow maps need float color render targets".into(),
                    ));
                }
                let description = RenderTargetDescription::color(
                    texture.extent(),
                    texture.precision.variance_format(),
                )
                .with_depth(texture.precision.depth_format())
                .with_filter(texture.filter);
                ShadowMap::Variance(create_render_target(
                    &mut pending,
                    &description,
                    "shadow_variance",
                )?)
            }
            ShadowMapDescription::OmniCubeBasic(texture) => {
                ShadowMap::Cube(create_cube(&mut pending, texture)?)
            }
            ShadowMapDescription::OmniDualParaboloidBasic(texture) => {
                let description = depth_description(texture);
                let positive = create_render_target(&mut pending, &description, "shadow_dp_pos")?;
                let negative = create_render_target(&mut pending, &description, "shadow_dp_neg")?;
                ShadowMap::DualParaboloid(DualParaboloidShadowMap { positive, negative })
            }
        };

        pending.commit();
        log::debug!("Allocated shadow map {:?}", key);
        Ok(map)
    }

    fn close(&mut self, value: ShadowMap) {
        let mut backend = self.backend.borrow_mut();
        match value {
            ShadowMap::Basic(target) | ShadowMap::Variance(target) => {
                destroy_render_target(&mut *backend, &target)
            }
            ShadowMap::Cube(cube) => {
                for face in cube.faces {
                    backend.destroy_framebuffer(face);
                }
                backend.destroy_texture(cube.texture);
            }
            ShadowMap::DualParaboloid(dual) => {
                destroy_render_target(&mut *backend, &dual.positive);
                destroy_render_target(&mut *backend, &dual.negative);
            }
        }
    }

    fn size_of(&self, value: &ShadowMap) -> usize {
        match value {
            ShadowMap::Basic(target) | ShadowMap::Variance(target) => {
                target.description.byte_size()
            }
            ShadowMap::Cube(cube) => {
                let texture = &cube.description;
                texture.extent().pixel_count() as usize
                    * texture.precision.depth_format().bytes_per_pixel() as usize
                    * 6
            }
            ShadowMap::DualParaboloid(dual) => {
                dual.positive.description.byte_size() + dual.negative.description.byte_size()
            }
        }
    }
}

/// An outstanding shadow map borrow
pub type ShadowMapReceipt = Receipt<ShadowMapDescription, ShadowMap>;

/// Cache of shadow maps keyed by description
#[derive(Debug, Clone)]
pub struct ShadowMapCache {
    cache: BorrowCache<ShadowMapDescription, ShadowMap>,
}

impl ShadowMapCache {
    pub fn new<B: GraphicsBackend + 'static>(backend: SharedBackend<B>, config: CacheConfig) -> Self {
        Self::wrap(BorrowCache::new(ShadowMapLoader::new(backend), config))
    }

    /// View an existing cache as a shadow map cache
    pub fn wrap(cache: BorrowCache<ShadowMapDescription, ShadowMap>) -> Self {
        Self { cache }
    }

    pub fn get(&self, description: &ShadowMapDescription) -> RenderResult<ShadowMapReceipt> {
        self.cache.get(description)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn evict_idle(&self) -> usize {
        self.cache.evict_idle()
    }

    pub fn entries_for(&self, description: &ShadowMapDescription) -> usize {
        self.cache.entries_for(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (SharedBackend<DummyBackend>, ShadowMapCache) {
        let backend = share(DummyBackend::new());
        let cache = ShadowMapCache::new(backend.clone(), CacheConfig::default());
        (backend, cache)
    }

    #[test]
    fn test_dual_paraboloid_allocates_two_hemispheres() {
        let (backend, cache) = cache();
        let desc = ShadowMapDescription::OmniDualParaboloidBasic(ShadowTextureDescription::new(64));
        let map = cache.get(&desc).unwrap();
        let ShadowMap::DualParaboloid(dual) = *map else {
            panic!("expected a dual-paraboloid map, got {:?}", *map);
        };
        assert_ne!(dual.positive.depth, dual.negative.depth);
        assert_eq!(backend.borrow().live_textures(), 2);
        assert_eq!(cache.stats().total_bytes, 2 * 64 * 64 * 4);
    }

    #[test]
    fn test_cube_needs_capability() {
        let caps = Capabilities {
            cube_render_targets: false,
            ..Default::default()
        };
        let backend = share(DummyBackend::with_capabilities(caps, 8));
        let cache = ShadowMapCache::new(backend, CacheConfig::default());
        let desc = ShadowMapDescription::OmniCubeBasic(ShadowTextureDescription::new(32));
        assert!(matches!(cache.get(&desc), Err(RenderError::Unsupported(_))));
    }

    #[test]
    fn test_cube_has_a_framebuffer_per_face() {
        let (backend, cache) = cache();
        let desc = ShadowMapDescription::OmniCubeBasic(ShadowTextureDescription::new(32));
        let map = cache.get(&desc).unwrap();
        assert!(matches!(*map, ShadowMap::Cube(_)));
        assert_eq!(backend.borrow().live_framebuffers(), 6);
        drop(map);
        drop(cache);
        assert_eq!(backend.borrow().live_framebuffers(), 0);
        assert_eq!(backend.borrow().live_textures(), 0);
    }
}
