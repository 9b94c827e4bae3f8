//! Shadow map rendering
//!
//! Produces the frame's [`ShadowMapSet`]: one borrowed map per shadow
//! casting light, rendered from the light's point of view. The maps go back
//! to the shadow cache when the set is dropped at the end of the frame.

use std::collections::{HashMap, HashSet};

use glam::{Mat4, Vec4};

use crate::backend::*;
use crate::error::{RenderError, RenderResult};
use crate::filters::{BlurFilter, Filter};
use crate::pipeline::{Observer, RenderContext};
use crate::program::names;
use crate::resources::{RenderTarget, RenderTargetDescription};
use crate::scene::{Instance, Light, LightId, SphericalLight, SHADOW_NEAR};

use super::{ShadowMap, ShadowMapCache, ShadowMapReceipt};

/// Light-space transforms used to render and sample a shadow map
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadowMatrices {
    Single(Mat4),
    /// Indexed by [`CubeFace::index`]
    Cube([Mat4; 6]),
    Paraboloid { view: Mat4, near: f32, far: f32 },
}

/// A light's borrowed shadow map and its matrices
#[derive(Debug)]
pub struct ShadowMapEntry {
    pub map: ShadowMapReceipt,
    pub matrices: ShadowMatrices,
}

/// Shadow maps rendered for one frame, keyed by light
#[derive(Debug, Default)]
pub struct ShadowMapSet {
    entries: HashMap<LightId, ShadowMapEntry>,
}

impl ShadowMapSet {
    pub fn get(&self, light: LightId) -> Option<&ShadowMapEntry> {
        self.entries.get(&light)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lights(&self) -> impl Iterator<Item = LightId> + '_ {
        self.entries.keys().copied()
    }

    fn insert(&mut self, light: LightId, entry: ShadowMapEntry) {
        self.entries.insert(light, entry);
    }
}

/// Renders shadow maps borrowed from a shadow map cache
#[derive(Debug, Clone)]
pub struct ShadowMapRenderer {
    cache: ShadowMapCache,
}

impl ShadowMapRenderer {
    pub fn new(cache: ShadowMapCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ShadowMapCache {
        &self.cache
    }

    /// Render a shadow map for every light that casts one.
    ///
    /// On failure the maps borrowed so far are returned before the error
    /// propagates. Light ids must be unique, otherwise nothing is rendered.
    pub fn render<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        observer: &Observer,
        lights: &[Light],
        casters: &[Instance],
    ) -> RenderResult<ShadowMapSet> {
        let mut ids = HashSet::with_capacity(lights.len());
        if let Some(light) = lights.iter().find(|light| !ids.insert(light.id())) {
            return Err(RenderError::InvalidParameter(format!(
                "light {:?} appears more than once",
                light.id()
            )));
        }

        let mut set = ShadowMapSet::default();

        for light in lights {
            let Some(description) = light.shadow_description() else {
                continue;
            };
            let map = self.cache.get(&description)?;
            log::debug!("Rendering {:?} for light {:?}", description, light.id());

            let matrices = match (&*map, light) {
                (ShadowMap::Basic(target), _) => {
                    let vp = mapped_view_projection(light, observer);
                    render_depth(ctx, target, names::SHADOW_DEPTH, vp, &[], casters, None)?;
                    ShadowMatrices::Single(vp)
                }
                (ShadowMap::Variance(target), _) => {
                    let vp = mapped_view_projection(light, observer);
                    // Cleared to the moments of the far plane
                    let clear = Some(Vec4::new(1.0, 1.0, 0.0, 0.0));
                    render_depth(ctx, target, names::SHADOW_VARIANCE, vp, &[], casters, clear)?;
                    if let Some(blur) = light.variance_blur() {
                        BlurFilter.evaluate(ctx, &blur, target, target)?;
                    }
                    ShadowMatrices::Single(vp)
                }
                (ShadowMap::Cube(cube), Light::Spherical(spherical)) => {
                    let faces = CubeFace::ALL.map(|face| spherical.face_view_projection(face));
                    for face in CubeFace::ALL {
                        let target = RenderTarget {
                            framebuffer: cube.faces[face.index()],
                            description: RenderTargetDescription::depth(
                                cube.description.extent(),
                                cube.description.precision.depth_format(),
                            ),
                            color: None,
                            depth: Some(cube.texture),
                        };
                        let vp = faces[face.index()];
                        render_depth(ctx, &target, names::SHADOW_DEPTH, vp, &[], casters, None)?;
                    }
                    ShadowMatrices::Cube(faces)
                }
                (ShadowMap::DualParaboloid(dual), Light::Spherical(spherical)) => {
                    render_paraboloids(ctx, spherical, &dual.positive, &dual.negative, casters)?
                }
                (map, light) => {
                    log::warn!("{:?} cannot render {:?}", light.id(), map);
                    continue;
                }
            };

            set.insert(light.id(), ShadowMapEntry { map, matrices });
        }
        Ok(set)
    }
}

fn mapped_view_projection(light: &Light, observer: &Observer) -> Mat4 {
    match light {
        Light::Directional(directional) => {
            directional.view_projection(&observer.camera.frustum_corners())
        }
        Light::Projective(projective) => projective.view_projection(),
        Light::Spherical(spherical) => spherical.face_view_projection(CubeFace::NegativeZ),
    }
}

fn render_paraboloids<B: GraphicsBackend>(
    ctx: &mut RenderContext<B>,
    light: &SphericalLight,
    positive: &RenderTarget,
    negative: &RenderTarget,
    casters: &[Instance],
) -> RenderResult<ShadowMatrices> {
    let view = light.paraboloid_view();
    let near = SHADOW_NEAR;
    let far = light.radius.max(near * 2.0);
    for (target, hemisphere) in [(positive, 1.0), (negative, -1.0)] {
        let uniforms = [
            Uniform::float("u_hemisphere", hemisphere),
            Uniform::float("u_near", near),
            Uniform::float("u_far", far),
        ];
        render_depth(
            ctx,
            target,
            names::SHADOW_DUAL_PARABOLOID,
            view,
            &uniforms,
            casters,
            None,
        )?;
    }
    Ok(ShadowMatrices::Paraboloid { view, near, far })
}

/// Clear `target` and draw every caster into it with depth testing
fn render_depth<B: GraphicsBackend>(
    ctx: &RenderContext<B>,
    target: &RenderTarget,
    program: &str,
    light_matrix: Mat4,
    extra: &[Uniform],
    casters: &[Instance],
    clear_color: Option<Vec4>,
) -> RenderResult<()> {
    let program = ctx.program(program)?;
    let mut backend = ctx.backend.borrow_mut();
    backend.bind_framebuffer(Some(target.framebuffer));
    backend.set_viewport(target.area());
    backend.clear(&ClearValues {
        color: clear_color,
        depth: Some(1.0),
    })?;

    let state = DrawState::fullscreen().with_depth(DepthState::test_and_write());
    for caster in casters {
        let mut uniforms = vec![
            Uniform::mat4("u_light_matrix", light_matrix),
            Uniform::mat4("u_model", caster.transform.matrix()),
        ];
        uniforms.extend_from_slice(extra);
        backend.draw_mesh(program, caster.mesh, &state, &uniforms)?;
    }
    Ok(())
}
