//! Post-processing filters
//!
//! Filters are stateless. Each takes immutable parameters, an input and an
//! output render target, and borrows whatever scratch targets it needs from
//! the context's render target cache for the duration of one evaluation.
//! Every filter gives the right result when `input` and `output` are the
//! same target.

mod blur;
mod chain;
mod copy;
mod emission;
mod fog;
mod fxaa;

pub use blur::*;
pub use chain::*;
pub use copy::*;
pub use emission::*;
pub use fog::*;
pub use fxaa::*;

use crate::backend::*;
use crate::copier::CopyChannels;
use crate::error::RenderResult;
use crate::pipeline::RenderContext;
use crate::resources::{RenderTarget, RenderTargetDescription};

/// A single-input image transform
pub trait Filter {
    type Parameters;

    /// Short name used in logs and debug markers
    fn name(&self) -> &'static str;

    /// Read `input`, write `output`. `input` and `output` may be the same target.
    fn evaluate<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        params: &Self::Parameters,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()>;
}

/// Copy a region onto a possibly overlapping region of the same target.
///
/// The region is first copied into a scratch target with the source's
/// description (same region on both ends), then from the scratch target into
/// the real target region.
pub fn copy_through_scratch<B: GraphicsBackend>(
    ctx: &RenderContext<B>,
    source: &RenderTarget,
    source_area: Area,
    target: &RenderTarget,
    target_area: Area,
    channels: CopyChannels,
) -> RenderResult<()> {
    let scratch = ctx.targets.get(&source.description)?;
    ctx.copier
        .copy(source, source_area, &scratch, source_area, channels)?;
    ctx.copier
        .copy(&scratch, source_area, target, target_area, channels)
}

/// Working description for a filter running at `scale` of the input size
pub(crate) fn scaled_description(input: &RenderTarget, scale: f32) -> RenderTargetDescription {
    let description = input.description.color_only();
    if scale == 1.0 {
        description
    } else {
        description.scaled(scale)
    }
}

/// Texture sampled by a fullscreen pass
pub(crate) struct Input {
    pub name: &'static str,
    pub texture: TextureHandle,
}

impl Input {
    pub fn new(name: &'static str, texture: TextureHandle) -> Self {
        Self { name, texture }
    }
}

/// Draw one fullscreen pass into `output` with `inputs` bound to texture units
pub(crate) fn fullscreen_pass<B: GraphicsBackend>(
    ctx: &mut RenderContext<B>,
    program: &str,
    inputs: &[Input],
    output: &RenderTarget,
    uniforms: &[Uniform],
    state: DrawState,
) -> RenderResult<()> {
    let program = ctx.program(program)?;
    let mut scope = ctx.bindings.enter();

    let mut all = Vec::with_capacity(inputs.len() + uniforms.len());
    for input in inputs {
        let unit = scope.bind(input.texture)?;
        all.push(Uniform::sampler(input.name, unit));
    }
    all.extend_from_slice(uniforms);

    let mut backend = ctx.backend.borrow_mut();
    backend.bind_framebuffer(Some(output.framebuffer));
    backend.set_viewport(output.area());
    backend.draw_fullscreen(program, &state, &all)?;
    Ok(())
}
