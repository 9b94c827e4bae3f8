//! Depth fog
//!
//! Blends a fog color over the image by view distance, reconstructed from
//! the input's depth attachment.

use glam::Vec4;

use crate::backend::*;
use crate::copier::CopyChannels;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::RenderContext;
use crate::program::names;
use crate::resources::RenderTarget;

use super::{fullscreen_pass, Filter, Input};

/// How fog density grows between the near and far distance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FogProgression {
    #[default]
    Linear,
    Exponential {
        density: f32,
    },
}

impl FogProgression {
    fn mode(&self) -> i32 {
        match self {
            FogProgression::Linear => 0,
            FogProgression::Exponential { .. } => 1,
        }
    }

    fn density(&self) -> f32 {
        match self {
            FogProgression::Linear => 0.0,
            FogProgression::Exponential { density } => *density,
        }
    }
}

/// Fog configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParameters {
    /// Fog color, alpha scales the maximum coverage
    pub color: Vec4,
    /// View distance where fog starts
    pub near: f32,
    /// View distance of full coverage
    pub far: f32,
    pub progression: FogProgression,
}

impl Default for FogParameters {
    fn default() -> Self {
        Self {
            color: Vec4::new(0.5, 0.6, 0.7, 1.0),
            near: 10.0,
            far: 100.0,
            progression: FogProgression::Linear,
        }
    }
}

impl FogParameters {
    pub fn builder() -> FogParametersBuilder {
        FogParametersBuilder {
            params: Self::default(),
        }
    }

    pub fn builder_from(params: &FogParameters) -> FogParametersBuilder {
        FogParametersBuilder { params: *params }
    }
}

/// Builder for [`FogParameters`]
#[derive(Debug, Clone)]
pub struct FogParametersBuilder {
    params: FogParameters,
}

impl FogParametersBuilder {
    pub fn color(mut self, color: Vec4) -> Self {
        self.params.color = color;
        self
    }

    pub fn range(mut self, near: f32, far: f32) -> Self {
        self.params.near = near;
        self.params.far = far;
        self
    }

    pub fn progression(mut self, progression: FogProgression) -> Self {
        self.params.progression = progression;
        self
    }

    pub fn build(self) -> RenderResult<FogParameters> {
        let FogParameters { near, far, .. } = self.params;
        if !(near >= 0.0 && far > near) {
            return Err(RenderError::InvalidParameter(format!(
                "fog range {near}..{far} is empty"
            )));
        }
        Ok(self.params)
    }
}

/// Fog filter. The input must have a depth attachment.
#[derive(Debug, Clone, Copy, Default)]
pub struct FogFilter;

impl Filter for FogFilter {
    type Parameters = FogParameters;

    fn name(&self) -> &'static str {
        "fog"
    }

    fn evaluate<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        params: &FogParameters,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        if !input.has_depth() {
            return Err(RenderError::IncompatibleTargets(
                "fog needs a depth attachment on its input".into(),
            ));
        }

        // The output's own attachments can't be sampled while drawing into it
        let scratch = if input.framebuffer == output.framebuffer {
            let scratch = ctx.targets.get(&input.description)?;
            ctx.copier
                .copy_full(input, &scratch, CopyChannels::ColorWithDepth)?;
            Some(scratch)
        } else {
            None
        };
        let source = scratch.as_deref().unwrap_or(input);

        let uniforms = [
            Uniform::vec4("u_fog_color", params.color),
            Uniform::float("u_fog_near", params.near),
            Uniform::float("u_fog_far", params.far),
            Uniform::int("u_fog_mode", params.progression.mode()),
            Uniform::float("u_fog_density", params.progression.density()),
        ];
        fullscreen_pass(
            ctx,
            names::FOG,
            &[
                Input::new("u_source", source.color_texture()?),
                Input::new("u_depth", source.depth_texture()?),
            ],
            output,
            &uniforms,
            DrawState::fullscreen(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_empty_range() {
        assert!(FogParameters::builder().range(5.0, 5.0).build().is_err());
        let fog = FogParameters::builder()
            .range(1.0, 20.0)
            .progression(FogProgression::Exponential { density: 0.2 })
            .build()
            .unwrap();
        assert_eq!(fog.progression.mode(), 1);
    }
}
