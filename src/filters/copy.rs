//! Plain copy between render targets

use crate::backend::GraphicsBackend;
use crate::copier::CopyChannels;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::RenderContext;
use crate::resources::RenderTarget;

use super::Filter;

/// Copy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyParameters {
    /// Channels to copy; `None` copies every channel both targets have
    pub channels: Option<CopyChannels>,
}

impl CopyParameters {
    pub fn builder() -> CopyParametersBuilder {
        CopyParametersBuilder {
            params: Self::default(),
        }
    }

    pub fn builder_from(params: &CopyParameters) -> CopyParametersBuilder {
        CopyParametersBuilder { params: *params }
    }
}

/// Builder for [`CopyParameters`]
#[derive(Debug, Clone)]
pub struct CopyParametersBuilder {
    params: CopyParameters,
}

impl CopyParametersBuilder {
    pub fn channels(mut self, channels: CopyChannels) -> Self {
        self.params.channels = Some(channels);
        self
    }

    pub fn build(self) -> CopyParameters {
        self.params
    }
}

/// Copies the whole input over the whole output, rescaling if needed
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyFilter;

impl Filter for CopyFilter {
    type Parameters = CopyParameters;

    fn name(&self) -> &'static str {
        "copy"
    }

    fn evaluate<B: GraphicsBackend>(
        &self,
        ctx: &mut RenderContext<B>,
        params: &CopyParameters,
        input: &RenderTarget,
        output: &RenderTarget,
    ) -> RenderResult<()> {
        // A full copy onto itself changes nothing
        if input.framebuffer == output.framebuffer {
            return Ok(());
        }
        let channels = match params.channels {
            Some(channels) => channels,
            None => CopyChannels::common(input, output).ok_or_else(|| {
                RenderError::IncompatibleTargets("targets share no channel".into())
            })?,
        };
        ctx.copier.copy_full(input, output, channels)
    }
}
