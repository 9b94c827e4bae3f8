//! Emission glow
//!
//! Bright emissive pixels are extracted into a reduced resolution glow
//! buffer, blurred there in place, and added back onto the output.

use crate::backend::*;
use crate::copier::CopyChannels;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::RenderContext;
use crate::program::names;
use crate::resources::RenderTarget;

use super::{fullscreen_pass, scaled_description, BlurFilter, BlurParameters, Filter, Input};

/// Glow configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionParameters {
    /// Glow buffer resolution relative to the input, in (0, 1]
    pub scale: f32,
    /// Luminance above which a pixel glows
    pub threshold: f32,
    /// Strength of the composited glow
    pub intensity: f32,
    pub blur: BlurParameters,
}

impl Default for EmissionParameters {
    fn default() -> Self {
        Self {
            scale: 0.5,
            threshold: 1.0,
            intensity: 1.0,
            blur: BlurParameters {
                passes: 2,
                ..Default::default()
            },
        }
    }
}

impl EmissionParameters {
    pub fn builder() -> EmissionParametersBuilder {
        EmissionParametersBuilder {
            params: Self::default(),
        }
    }

    pub fn builder_from(params: &EmissionParameters) -> EmissionParametersBuilder {
        EmissionParametersBuilder { params: *params }
    }
}

/// Builder for [`EmissionParameters`]
#[derive(Debug, Clone)]
pub struct EmissionParametersBuilder {
    params: EmissionParameters,
}

impl EmissionParametersBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.params.scale = scale;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.params.threshold = threshold;
        self
    }

    pub fn intensity(mut self, intensity: f32) -> Self {
        self.params.intensity = intensity;
        self
    }

    pub fn blur(mut self, blur: BlurParameters) -> Self {
        self.params.blur = blur;
        self
    }

    pub fn build(self) -> RenderResult<EmissionParameters> {
        let scale = self.params.scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(RenderError::InvalidParameter(format!(
                "glow scale {scale} outside (0, 1]"
            )));
        }
        Ok(self.params)
    }
}

/// Emission glow filter
#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionFilter;

impl Filter for EmissionFilter {
    type Parameters = EmissionParameters;

    fn name(&self) -> &'static str {
        "emission"
    }

    fn evaluate<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        params: &EmissionParameters,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        let glow = ctx.targets.get(&scaled_description(input, params.scale))?;

        // Extract before the output is touched; input may be the output
        fullscreen_pass(
            ctx,
            names::EMISSION_EXTRACT,
            &[Input::new("u_source", input.color_texture()?)],
            &glow,
            &[Uniform::float("u_threshold", params.threshold)],
            DrawState::fullscreen(),
        )?;
        BlurFilter.evaluate(ctx, &params.blur, &glow, &glow)?;

        if input.framebuffer != output.framebuffer {
            ctx.copier.copy_full(input, output, CopyChannels::Color)?;
        }
        fullscreen_pass(
            ctx,
            names::EMISSION_COMPOSITE,
            &[Input::new("u_glow", glow.color_texture()?)],
            output,
            &[Uniform::float("u_intensity", params.intensity)],
            DrawState::fullscreen().with_blend(BlendState::additive()),
        )
    }
}
