//! FXAA (Fast Approximate Anti-Aliasing)
//!
//! Detects aliased edges from luma contrast and blends along them. Runs on
//! the final low dynamic range image.

use glam::Vec2;

use crate::backend::*;
use crate::copier::CopyChannels;
use crate::error::RenderResult;
use crate::pipeline::RenderContext;
use crate::program::names;
use crate::resources::RenderTarget;

use super::{fullscreen_pass, Filter, Input};

/// Edge search quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FxaaQuality {
    /// 4 edge search iterations
    Low,
    /// 8 edge search iterations
    #[default]
    Medium,
    /// 12 edge search iterations
    High,
}

impl FxaaQuality {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub const fn search_steps(self) -> i32 {
        match self {
            Self::Low => 4,
            Self::Medium => 8,
            Self::High => 12,
        }
    }

    /// Minimum local contrast treated as an edge
    pub const fn edge_threshold(self) -> f32 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.166,
            Self::High => 0.125,
        }
    }
}

/// Anti-aliasing configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FxaaParameters {
    pub quality: FxaaQuality,
}

impl FxaaParameters {
    pub fn builder() -> FxaaParametersBuilder {
        FxaaParametersBuilder {
            params: Self::default(),
        }
    }

    pub fn builder_from(params: &FxaaParameters) -> FxaaParametersBuilder {
        FxaaParametersBuilder { params: *params }
    }
}

/// Builder for [`FxaaParameters`]
#[derive(Debug, Clone)]
pub struct FxaaParametersBuilder {
    params: FxaaParameters,
}

impl FxaaParametersBuilder {
    pub fn quality(mut self, quality: FxaaQuality) -> Self {
        self.params.quality = quality;
        self
    }

    pub fn build(self) -> FxaaParameters {
        self.params
    }
}

/// FXAA filter
#[derive(Debug, Clone, Copy, Default)]
pub struct FxaaFilter;

impl Filter for FxaaFilter {
    type Parameters = FxaaParameters;

    fn name(&self) -> &'static str {
        "fxaa"
    }

    fn evaluate<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        params: &FxaaParameters,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        let extent = input.extent();
        let uniforms = [
            Uniform::vec2(
                "u_texel",
                Vec2::new(1.0 / extent.width as f32, 1.0 / extent.height as f32),
            ),
            Uniform::int("u_search_steps", params.quality.search_steps()),
            Uniform::float("u_edge_threshold", params.quality.edge_threshold()),
        ];

        // Neighbouring pixels are sampled, so an in-place pass reads a copy
        let scratch = if input.framebuffer == output.framebuffer {
            let scratch = ctx.targets.get(&input.description.color_only())?;
            ctx.copier.copy_full(input, &scratch, CopyChannels::Color)?;
            Some(scratch)
        } else {
            None
        };
        let source = scratch.as_deref().unwrap_or(input);

        fullscreen_pass(
            ctx,
            names::FXAA,
            &[Input::new("u_source", source.color_texture()?)],
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
    fn test_default_quality_is_medium() {
        assert_eq!(FxaaParameters::default().quality, FxaaQuality::Medium);
        let high = FxaaParameters::builder().quality(FxaaQuality::High).build();
        assert_eq!(high.quality.search_steps(), 12);
    }
}
