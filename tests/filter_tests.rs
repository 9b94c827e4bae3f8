//! Filter and region copy tests.
//!
//! Scratch usage is read from the render target cache statistics: input and
//! output are borrowed before the filter runs, so every further miss is a
//! scratch target the filter allocated.

mod common;

use common::{color_depth_description, color_description, TestContext};
use deferred_renderer::backend::*;
use deferred_renderer::filters::*;
use deferred_renderer::program::names;
use deferred_renderer::resources::RenderTargetDescription;
use deferred_renderer::{CopyChannels, RenderError};
use glam::Vec4;
use rstest::rstest;

fn blur(passes: u32) -> BlurParameters {
    BlurParameters::builder().passes(passes).build().unwrap()
}

// ============================================================================
// Region copies
// ============================================================================

#[test]
fn test_overlapping_copy_through_scratch_matches_safe_copy() {
    let t = TestContext::new();
    let target = t.target(&color_description(4, 1));
    let source_area = Area::new(0, 0, 3, 1);
    let target_area = Area::new(1, 0, 3, 1);

    // A direct in-place copy reads texels it has already overwritten
    t.fill_ramp(&target);
    t.ctx
        .copier
        .copy(&target, source_area, &target, target_area, CopyChannels::Color)
        .unwrap();
    let direct = t.color_texels(&target);
    assert_eq!(direct, vec![Vec4::splat(1.0); 4]);

    // Two hops through a scratch target behave like a copy from a snapshot
    t.fill_ramp(&target);
    copy_through_scratch(
        &t.ctx,
        &target,
        source_area,
        &target,
        target_area,
        CopyChannels::Color,
    )
    .unwrap();
    let expected: Vec<Vec4> = [1.0, 1.0, 2.0, 3.0].into_iter().map(Vec4::splat).collect();
    assert_eq!(t.color_texels(&target), expected);
    assert_eq!(t.ctx.targets.stats().borrowed, 1, "scratch target returned");
}

#[test]
fn test_copy_same_region_in_place_is_identity() {
    let t = TestContext::new();
    let target = t.target(&color_description(8, 2));
    let texels = t.fill_ramp(&target);

    let area = Area::new(2, 0, 4, 2);
    copy_through_scratch(&t.ctx, &target, area, &target, area, CopyChannels::Color).unwrap();
    assert_eq!(t.color_texels(&target), texels);
}

#[test]
fn test_copy_filter_selects_common_channels() {
    let mut t = TestContext::new();
    let input = t.target(&color_depth_description(4, 4));
    let output = t.target(&color_description(4, 4));
    let texels = t.fill_ramp(&input);

    CopyFilter
        .evaluate(&mut t.ctx, &CopyParameters::default(), &input, &output)
        .unwrap();
    assert_eq!(t.color_texels(&output), texels);
}

#[test]
fn test_depth_copy_moves_depth_only() {
    let t = TestContext::new();
    let description = RenderTargetDescription::depth(Extent::new(4, 4), TextureFormat::Depth32Float);
    let source = t.target(&description);
    let target = t.target(&description);
    let depth = vec![Vec4::new(0.25, 0.0, 0.0, 0.0); 16];
    t.backend
        .borrow_mut()
        .write_texels(source.depth.unwrap(), &depth)
        .unwrap();

    t.ctx
        .copier
        .copy_full(&source, &target, CopyChannels::Depth)
        .unwrap();

    assert_eq!(t.backend.borrow().texels(target.depth.unwrap()), Some(depth));
}

#[test]
fn test_depth_copy_needs_matching_formats() {
    let t = TestContext::new();
    let extent = Extent::new(4, 4);
    let source = t.target(&RenderTargetDescription::depth(extent, TextureFormat::Depth24PlusStencil8));
    let target = t.target(&RenderTargetDescription::depth(extent, TextureFormat::Depth32Float));

    let err = t
        .ctx
        .copier
        .copy_full(&source, &target, CopyChannels::Depth)
        .unwrap_err();
    assert!(matches!(err, RenderError::IncompatibleTargets(_)));
}

#[test]
fn test_variance_copy_moves_moments() {
    let mut t = TestContext::new();
    let description = RenderTargetDescription::color(Extent::new(4, 4), TextureFormat::Rg32Float);
    let input = t.target(&description);
    let output = t.target(&description);
    let moments = vec![Vec4::new(0.5, 0.25, 0.0, 0.0); 16];
    t.backend
        .borrow_mut()
        .write_texels(input.color.unwrap(), &moments)
        .unwrap();
    assert_eq!(CopyChannels::common(&input, &output), Some(CopyChannels::DepthVariance));

    // A blur without passes is a plain variance copy
    BlurFilter.evaluate(&mut t.ctx, &blur(0), &input, &output).unwrap();

    assert_eq!(t.color_texels(&output), moments);
}

// ============================================================================
// Blur
// ============================================================================

#[test]
fn test_blur_zero_passes_copies_between_targets() {
    let mut t = TestContext::new();
    let input = t.target(&color_description(8, 8));
    let output = t.target(&color_description(8, 8));
    let texels = t.fill_ramp(&input);
    let misses = t.ctx.targets.stats().misses;

    BlurFilter.evaluate(&mut t.ctx, &blur(0), &input, &output).unwrap();

    assert_eq!(t.color_texels(&output), texels);
    assert_eq!(t.ctx.targets.stats().misses, misses);
    assert!(t.fullscreen_draws().is_empty());
}

#[test]
fn test_blur_zero_passes_in_place_is_noop() {
    let mut t = TestContext::new();
    let target = t.target(&color_description(8, 8));
    let texels = t.fill_ramp(&target);
    t.backend.borrow_mut().clear_commands();

    BlurFilter.evaluate(&mut t.ctx, &blur(0), &target, &target).unwrap();

    assert_eq!(t.color_texels(&target), texels);
    assert!(t.backend.borrow().commands().is_empty());
}

#[rstest]
#[case::one_pass(1, 1)]
#[case::two_passes(2, 2)]
#[case::three_passes(3, 2)]
fn test_blur_scratch_count(#[case] passes: u32, #[case] scratch: u64) {
    let mut t = TestContext::new();
    let input = t.target(&color_description(16, 16));
    let output = t.target(&color_description(16, 16));
    let misses = t.ctx.targets.stats().misses;

    BlurFilter.evaluate(&mut t.ctx, &blur(passes), &input, &output).unwrap();

    let stats = t.ctx.targets.stats();
    assert_eq!(stats.misses - misses, scratch);
    assert_eq!(stats.borrowed, 2, "only input and output still lent");

    let draws = t.fullscreen_draws();
    assert_eq!(draws.len(), 2 * passes as usize);
    assert_eq!(draws.last().unwrap().1, Some(output.framebuffer));
    assert!(draws[..draws.len() - 1]
        .iter()
        .all(|(_, framebuffer)| *framebuffer != Some(output.framebuffer)));
}

#[test]
fn test_blur_in_place_never_samples_its_output() {
    let mut t = TestContext::new();
    let target = t.target(&color_description(16, 16));

    BlurFilter.evaluate(&mut t.ctx, &blur(3), &target, &target).unwrap();

    // The only draw into the target is the last one
    let draws = t.fullscreen_draws();
    let into_target: Vec<usize> = draws
        .iter()
        .enumerate()
        .filter(|(_, (_, fb))| *fb == Some(target.framebuffer))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(into_target, vec![draws.len() - 1]);
}

#[test]
fn test_blur_returns_scratch_when_a_draw_fails() {
    let mut t = TestContext::new();
    let input = t.target(&color_description(16, 16));
    let output = t.target(&color_description(16, 16));
    t.backend.borrow_mut().fail_draw_after(3);

    let err = BlurFilter
        .evaluate(&mut t.ctx, &blur(3), &input, &output)
        .unwrap_err();
    assert!(matches!(err, RenderError::Api(BackendError::DrawFailed(_))));

    let stats = t.ctx.targets.stats();
    assert_eq!(stats.borrowed, 2);
    assert_eq!(stats.idle, 2, "both scratch targets are back");
    assert_eq!(t.ctx.bindings.depth(), 0);
    assert_eq!(t.backend.borrow().bound_texture(0), None);
}

#[test]
fn test_scaled_blur_borrows_smaller_targets() {
    let mut t = TestContext::new();
    let input = t.target(&color_description(64, 32));
    let params = BlurParameters::builder().passes(2).scale(0.25).build().unwrap();

    BlurFilter.evaluate(&mut t.ctx, &params, &input, &input).unwrap();

    let small = color_description(64, 32).scaled(0.25);
    assert_eq!(small.extent, Extent::new(16, 8));
    assert_eq!(t.ctx.targets.inner().entries_for(&small), 2);
}

// ============================================================================
// Other filters
// ============================================================================

#[test]
fn test_fxaa_in_place_reads_a_copy() {
    let mut t = TestContext::new();
    let target = t.target(&color_description(8, 8));
    let params = FxaaParameters::default();

    FxaaFilter.evaluate(&mut t.ctx, &params, &target, &target).unwrap();

    let backend = t.backend.borrow();
    let blits = backend
        .commands()
        .iter()
        .filter(|c| matches!(c, DummyCommand::Blit { .. }))
        .count();
    assert_eq!(blits, 1);
    drop(backend);
    assert_eq!(t.fullscreen_draws().len(), 1);
    assert_eq!(t.ctx.targets.stats().borrowed, 1);
}

#[test]
fn test_failed_pass_restores_texture_units() {
    let mut t = TestContext::new();
    let input = t.target(&color_description(8, 8));
    let output = t.target(&color_description(8, 8));
    t.backend.borrow_mut().fail_draw_after(0);

    let result = FxaaFilter.evaluate(&mut t.ctx, &FxaaParameters::default(), &input, &output);
    assert!(result.is_err());

    let backend = t.backend.borrow();
    let last_binding = backend
        .commands()
        .iter()
        .rev()
        .find_map(|c| match c {
            DummyCommand::BindTexture { unit, texture } => Some((*unit, *texture)),
            _ => None,
        });
    assert_eq!(last_binding, Some((0, None)));
    assert_eq!(backend.bound_texture(0), None);
}

#[test]
fn test_fog_needs_depth() {
    let mut t = TestContext::new();
    let target = t.target(&color_description(8, 8));
    let params = FogParameters::default();

    let err = FogFilter
        .evaluate(&mut t.ctx, &params, &target, &target)
        .unwrap_err();
    assert!(matches!(err, RenderError::IncompatibleTargets(_)));
}

#[test]
fn test_fog_in_place_copies_color_and_depth() {
    let mut t = TestContext::new();
    let target = t.target(&color_depth_description(8, 8));

    FogFilter
        .evaluate(&mut t.ctx, &FogParameters::default(), &target, &target)
        .unwrap();

    let backend = t.backend.borrow();
    assert!(backend.commands().iter().any(|c| matches!(
        c,
        DummyCommand::Blit { mask, .. } if *mask == BlitMask::COLOR_DEPTH
    )));
}

#[test]
fn test_emission_composites_additively() {
    let mut t = TestContext::new();
    let target = t.target(&color_description(16, 16));
    let params = EmissionParameters::default();

    EmissionFilter.evaluate(&mut t.ctx, &params, &target, &target).unwrap();

    let backend = t.backend.borrow();
    let last = backend
        .commands()
        .iter()
        .rev()
        .find(|c| matches!(c, DummyCommand::DrawFullscreen { .. }));
    assert!(matches!(
        last,
        Some(DummyCommand::DrawFullscreen {
            framebuffer: Some(fb),
            blend: Some(_),
            ..
        }) if *fb == target.framebuffer
    ));
    drop(backend);
    assert_eq!(t.ctx.targets.stats().borrowed, 1);
}

#[test]
fn test_chain_runs_steps_in_order() {
    let mut t = TestContext::new();
    let target = t.target(&color_depth_description(16, 16));
    let steps = vec![
        PostprocessStep::Fog(FogParameters::default()),
        PostprocessStep::Fxaa(FxaaParameters::default()),
    ];

    apply_chain(&mut t.ctx, &steps, &target).unwrap();

    let fog = t.ctx.program(names::FOG).unwrap();
    let fxaa = t.ctx.program(names::FXAA).unwrap();
    let programs: Vec<ProgramHandle> = t.fullscreen_draws().iter().map(|d| d.0).collect();
    assert_eq!(programs, vec![fog, fxaa]);
    assert_eq!(t.ctx.targets.stats().borrowed, 1);
}
