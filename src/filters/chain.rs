//! Ordered post-processing chain

use crate::backend::GraphicsBackend;
use crate::error::RenderResult;
use crate::pipeline::RenderContext;
use crate::resources::RenderTarget;

use super::*;

/// One filter of a post-processing chain with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum PostprocessStep {
    Blur(BlurParameters),
    Fxaa(FxaaParameters),
    Fog(FogParameters),
    Emission(EmissionParameters),
}

impl PostprocessStep {
    pub fn name(&self) -> &'static str {
        match self {
            PostprocessStep::Blur(_) => BlurFilter.name(),
            PostprocessStep::Fxaa(_) => FxaaFilter.name(),
            PostprocessStep::Fog(_) => FogFilter.name(),
            PostprocessStep::Emission(_) => EmissionFilter.name(),
        }
    }

    /// Run the step from `input` into `output`
    pub fn apply<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        log::debug!("Post-processing step: {}", self.name());
        match self {
            PostprocessStep::Blur(params) => BlurFilter.evaluate(ctx, params, input, output),
            PostprocessStep::Fxaa(params) => FxaaFilter.evaluate(ctx, params, input, output),
            PostprocessStep::Fog(params) => FogFilter.evaluate(ctx, params, input, output),
            PostprocessStep::Emission(params) => {
                EmissionFilter.evaluate(ctx, params, input, output)
            }
        }
    }
}

/// Apply every step in order, each reading and writing `target`
pub fn apply_chain<B: GraphicsBackend>(
    ctx: &mut RenderContext<B>,
    steps: &[PostprocessStep],
    target: &RenderTarget,
) -> RenderResult<()> {
    for step in steps {
        step.apply(ctx, target, target)?;
    }
    Ok(())
}
