//! Separable blur
//!
//! Each pass is a horizontal sub-pass followed by a vertical one. With more
//! than one pass, the intermediate result ping-pongs between two scratch
//! targets and only the last vertical sub-pass writes the output.

use glam::Vec2;

use crate::backend::*;
use crate::copier::CopyChannels;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::RenderContext;
use crate::program::names;
use crate::resources::RenderTarget;

use super::{fullscreen_pass, scaled_description, Filter, Input};

/// Blur configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurParameters {
    /// Number of horizontal + vertical pass pairs; 0 copies the input
    pub passes: u32,
    /// Working resolution relative to the input, in (0, 1]
    pub scale: f32,
    /// Kernel radius in texels
    pub radius: f32,
}

impl Default for BlurParameters {
    fn default() -> Self {
        Self {
            passes: 1,
            scale: 1.0,
            radius: 1.0,
        }
    }
}

impl BlurParameters {
    pub fn builder() -> BlurParametersBuilder {
        BlurParametersBuilder {
            params: Self::default(),
        }
    }

    /// Start from an existing configuration
    pub fn builder_from(params: &BlurParameters) -> BlurParametersBuilder {
        BlurParametersBuilder { params: *params }
    }
}

/// Builder for [`BlurParameters`]
#[derive(Debug, Clone)]
pub struct BlurParametersBuilder {
    params: BlurParameters,
}

impl BlurParametersBuilder {
    pub fn passes(mut self, passes: u32) -> Self {
        self.params.passes = passes;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.params.scale = scale;
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.params.radius = radius;
        self
    }

    pub fn build(self) -> RenderResult<BlurParameters> {
        let BlurParameters { scale, radius, .. } = self.params;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(RenderError::InvalidParameter(format!(
                "blur scale {scale} outside (0, 1]"
            )));
        }
        if !(radius >= 0.0) {
            return Err(RenderError::InvalidParameter(format!(
                "blur radius {radius} is negative"
            )));
        }
        Ok(self.params)
    }
}

/// Separable blur filter
#[derive(Debug, Clone, Copy, Default)]
pub struct BlurFilter;

impl BlurFilter {
    fn sub_pass<B: GraphicsBackend>(
        ctx: &mut RenderContext<B>,
        params: &BlurParameters,
        horizontal: bool,
        source: &RenderTarget,
        target: &RenderTarget,
    ) -> RenderResult<()> {
        let extent = source.extent();
        let texel = Vec2::new(1.0 / extent.width as f32, 1.0 / extent.height as f32);
        let (program, step) = if horizontal {
            (names::BLUR_HORIZONTAL, Vec2::new(texel.x, 0.0))
        } else {
            (names::BLUR_VERTICAL, Vec2::new(0.0, texel.y))
        };
        fullscreen_pass(
            ctx,
            program,
            &[Input::new("u_source", source.color_texture()?)],
            target,
            &[Uniform::vec2("u_step", step * params.radius)],
            DrawState::fullscreen(),
        )
    }
}

impl Filter for BlurFilter {
    type Parameters = BlurParameters;

    fn name(&self) -> &'static str {
        "blur"
    }

    fn evaluate<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        params: &BlurParameters,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        if params.passes == 0 {
            if input.framebuffer != output.framebuffer {
                let channels = if input.is_variance() && output.is_variance() {
                    CopyChannels::DepthVariance
                } else {
                    CopyChannels::Color
                };
                ctx.copier.copy_full(input, output, channels)?;
            }
            return Ok(());
        }

        let work = scaled_description(input, params.scale);

        if params.passes == 1 {
            // The scratch target is never the input or the output, so both
            // sub-passes read and write distinct targets even when input == output.
            let scratch = ctx.targets.get(&work)?;
            Self::sub_pass(ctx, params, true, input, &scratch)?;
            Self::sub_pass(ctx, params, false, &scratch, output)?;
            return Ok(());
        }

        let a = ctx.targets.get(&work)?;
        let b = ctx.targets.get(&work)?;
        for pass in 0..params.passes {
            let source = if pass == 0 { input } else { &*b };
            let last = pass + 1 == params.passes;
            Self::sub_pass(ctx, params, true, source, &a)?;
            Self::sub_pass(ctx, params, false, &a, if last { output } else { &*b })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_from_keeps_other_fields() {
        let base = BlurParameters::builder().passes(4).radius(2.0).build().unwrap();
        let derived = BlurParameters::builder_from(&base).scale(0.5).build().unwrap();
        assert_eq!(derived.passes, 4);
        assert_eq!(derived.radius, 2.0);
        assert_eq!(derived.scale, 0.5);
    }

    #[test]
    fn test_builder_rejects_bad_scale() {
        assert!(BlurParameters::builder().scale(0.0).build().is_err());
        assert!(BlurParameters::builder().scale(1.5).build().is_err());
    }
}
