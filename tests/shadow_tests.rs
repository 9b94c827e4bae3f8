//! Shadow map allocation and rendering tests.

mod common;

use common::TestContext;
use deferred_renderer::backend::*;
use deferred_renderer::filters::BlurParameters;
use deferred_renderer::pipeline::Observer;
use deferred_renderer::program::names;
use deferred_renderer::scene::*;
use deferred_renderer::shadow::*;
use deferred_renderer::{CacheConfig, RenderError};
use glam::Vec3;
use rstest::rstest;

fn shadow_cache(t: &TestContext) -> ShadowMapCache {
    ShadowMapCache::new(t.backend.clone(), CacheConfig::default())
}

fn caster(mesh: u64) -> Instance {
    Instance::new(
        MeshHandle(mesh),
        Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
        Material::lit(glam::Vec4::ONE),
    )
}

fn observer() -> Observer {
    Observer::new(&Camera::default(), Extent::new(64, 64))
}

fn spot(id: u32, shadow: MappedShadow) -> Light {
    let mut light = ProjectiveLight::new(
        LightId(id),
        Vec3::new(0.0, 5.0, 0.0),
        Vec3::NEG_Y,
        Vec3::ONE,
        1.0,
    );
    light.shadow = Some(shadow);
    Light::Projective(light)
}

fn point(id: u32, shadow: OmniShadow) -> Light {
    let mut light = SphericalLight::new(LightId(id), Vec3::new(1.0, 3.0, 0.0), Vec3::ONE, 1.0, 8.0);
    light.shadow = Some(shadow);
    Light::Spherical(light)
}

// ============================================================================
// Allocation
// ============================================================================

#[test]
fn test_dual_paraboloid_second_hemisphere_failure_releases_first() {
    let t = TestContext::new();
    let cache = shadow_cache(&t);
    let description =
        ShadowMapDescription::OmniDualParaboloidBasic(ShadowTextureDescription::new(128));

    // The first hemisphere's texture is created, the second one's fails
    t.backend.borrow_mut().fail_texture_creation_after(1);
    let err = cache.get(&description).unwrap_err();
    assert_eq!(err, RenderError::Allocation(BackendError::OutOfMemory));

    let backend = t.backend.borrow();
    assert_eq!(backend.textures_created(), 1);
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(backend.live_framebuffers(), 0);
    drop(backend);
    assert_eq!(cache.entries_for(&description), 0);
    assert_eq!(cache.stats().entries, 0);
    assert_eq!(cache.stats().total_bytes, 0);

    // Nothing stale is left behind for the next attempt
    t.backend.borrow_mut().clear_failures();
    let map = cache.get(&description).unwrap();
    assert!(matches!(*map, ShadowMap::DualParaboloid(_)));
}

#[test]
fn test_dual_paraboloid_framebuffer_failure_releases_textures() {
    let t = TestContext::new();
    let cache = shadow_cache(&t);
    let description =
        ShadowMapDescription::OmniDualParaboloidBasic(ShadowTextureDescription::new(32));

    t.backend.borrow_mut().fail_framebuffer_creation_after(1);
    assert!(matches!(
        cache.get(&description),
        Err(RenderError::Allocation(_))
    ));
    assert_eq!(t.backend.borrow().live_textures(), 0);
    assert_eq!(t.backend.borrow().live_framebuffers(), 0);
}

#[rstest]
#[case::basic(ShadowMapDescription::DirectionalBasic(ShadowTextureDescription::new(64)), true)]
#[case::variance(ShadowMapDescription::DirectionalVariance(ShadowTextureDescription::new(64)), false)]
#[case::cube(ShadowMapDescription::OmniCubeBasic(ShadowTextureDescription::new(64)), true)]
#[case::dual_paraboloid(
    ShadowMapDescription::OmniDualParaboloidBasic(ShadowTextureDescription::new(64)),
    true
)]
fn test_maps_without_float_targets(
    #[case] description: ShadowMapDescription,
    #[case] supported: bool,
) {
    let t = TestContext::with_backend(DummyBackend::with_capabilities(
        Capabilities {
            float_color_render_targets: false,
            cube_render_targets: true,
        },
        16,
    ));
    let cache = shadow_cache(&t);

    let result = cache.get(&description);
    if supported {
        assert!(result.is_ok());
    } else {
        assert!(matches!(result, Err(RenderError::Unsupported(_))));
        assert_eq!(t.backend.borrow().live_textures(), 0);
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_render_one_map_per_shadow_casting_light() {
    let mut t = TestContext::new();
    let renderer = ShadowMapRenderer::new(shadow_cache(&t));
    let unshadowed = DirectionalLight::new(LightId(9), Vec3::NEG_Y, Vec3::ONE, 1.0);
    let lights = vec![
        spot(1, MappedShadow::Basic(ShadowTextureDescription::new(64))),
        Light::Directional(unshadowed),
        point(2, OmniShadow::DualParaboloid(ShadowTextureDescription::new(64))),
    ];
    let casters = vec![caster(1), caster(2)];

    let set = renderer
        .render(&mut t.ctx, &observer(), &lights, &casters)
        .unwrap();

    assert_eq!(set.len(), 2);
    assert!(set.get(LightId(9)).is_none());
    assert!(matches!(
        set.get(LightId(1)).unwrap().matrices,
        ShadowMatrices::Single(_)
    ));
    assert!(matches!(
        set.get(LightId(2)).unwrap().matrices,
        ShadowMatrices::Paraboloid { .. }
    ));
    // Basic map: one pass; dual-paraboloid: one pass per hemisphere
    assert_eq!(t.backend.borrow().draw_count(), 3 * casters.len());
    assert_eq!(renderer.cache().stats().borrowed, 2);

    drop(set);
    assert_eq!(renderer.cache().stats().borrowed, 0);
}

#[test]
fn test_cube_map_renders_every_face() {
    let mut t = TestContext::new();
    let renderer = ShadowMapRenderer::new(shadow_cache(&t));
    let lights = vec![point(4, OmniShadow::Cube(ShadowTextureDescription::new(32)))];
    let casters = vec![caster(1)];

    let set = renderer
        .render(&mut t.ctx, &observer(), &lights, &casters)
        .unwrap();

    let entry = set.get(LightId(4)).unwrap();
    let ShadowMap::Cube(cube) = *entry.map else {
        panic!("expected a cube map, got {:?}", *entry.map);
    };
    let backend = t.backend.borrow();
    let drawn: Vec<FramebufferHandle> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            DummyCommand::DrawMesh {
                framebuffer: Some(fb),
                ..
            } => Some(*fb),
            _ => None,
        })
        .collect();
    assert_eq!(drawn, cube.faces.to_vec());
}

#[test]
fn test_variance_map_is_blurred_in_place() {
    let mut t = TestContext::new();
    let renderer = ShadowMapRenderer::new(shadow_cache(&t));
    let blur = BlurParameters::builder().passes(2).build().unwrap();
    let lights = vec![spot(
        3,
        MappedShadow::Variance {
            map: ShadowTextureDescription::new(64),
            blur,
        },
    )];

    let set = renderer
        .render(&mut t.ctx, &observer(), &lights, &[caster(1)])
        .unwrap();

    let ShadowMap::Variance(target) = *set.get(LightId(3)).unwrap().map else {
        panic!("expected a variance map");
    };
    let horizontal = t.ctx.program(names::BLUR_HORIZONTAL).unwrap();
    let draws = t.fullscreen_draws();
    assert_eq!(draws.iter().filter(|d| d.0 == horizontal).count(), 2);
    assert_eq!(draws.last().unwrap().1, Some(target.framebuffer));
    assert_eq!(t.ctx.targets.stats().borrowed, 0, "blur scratch returned");
}

#[test]
fn test_failed_render_returns_maps_borrowed_so_far() {
    let mut t = TestContext::new();
    let renderer = ShadowMapRenderer::new(shadow_cache(&t));
    let lights = vec![
        spot(1, MappedShadow::Basic(ShadowTextureDescription::new(64))),
        spot(2, MappedShadow::Basic(ShadowTextureDescription::new(64))),
    ];
    t.backend.borrow_mut().fail_draw_after(1);

    let result = renderer.render(&mut t.ctx, &observer(), &lights, &[caster(1)]);
    assert!(result.is_err());
    let stats = renderer.cache().stats();
    assert_eq!(stats.borrowed, 0);
    assert_eq!(stats.entries, 2);
}

#[test]
fn test_duplicate_light_ids_are_rejected() {
    let mut t = TestContext::new();
    let renderer = ShadowMapRenderer::new(shadow_cache(&t));
    let lights = vec![
        spot(5, MappedShadow::Basic(ShadowTextureDescription::new(64))),
        point(5, OmniShadow::Cube(ShadowTextureDescription::new(64))),
    ];

    let err = renderer
        .render(&mut t.ctx, &observer(), &lights, &[caster(1)])
        .unwrap_err();

    assert!(matches!(err, RenderError::InvalidParameter(_)));
    assert_eq!(renderer.cache().stats().misses, 0);
    assert_eq!(t.backend.borrow().draw_count(), 0);
}
