//! Frame control
//!
//! [`DeferredControl`] is what a frame procedure drives. It carries the
//! frame's observer and shadow maps, both established once before the
//! procedure runs and released when the frame ends.

use crate::backend::GraphicsBackend;
use crate::config::RendererConfig;
use crate::error::RenderResult;
use crate::filters::apply_chain;
use crate::resources::{GBufferCache, RenderTarget};
use crate::scene::VisibleSet;
use crate::shadow::ShadowMapSet;

use super::{Observer, RenderContext};

/// Stage markers emitted to the backend, in frame order
pub mod stages {
    pub const SHADOW: &str = "shadow";
    pub const OPAQUE_LIT: &str = "opaque-lit";
    pub const OPAQUE_UNLIT: &str = "opaque-unlit";
    pub const TRANSLUCENT: &str = "translucent";
    pub const POSTPROCESS: &str = "postprocess";
}

/// Stages of one frame, callable in any subset by a custom procedure
pub struct DeferredControl<'f, B: GraphicsBackend> {
    pub(super) ctx: &'f mut RenderContext<B>,
    pub(super) gbuffers: &'f GBufferCache,
    pub(super) config: &'f RendererConfig,
    pub(super) observer: &'f Observer,
    pub(super) shadows: &'f ShadowMapSet,
    pub(super) visible: &'f VisibleSet,
    pub(super) output: &'f RenderTarget,
}

impl<'f, B: GraphicsBackend> DeferredControl<'f, B> {
    pub fn observer(&self) -> &Observer {
        self.observer
    }

    pub fn shadow_maps(&self) -> &ShadowMapSet {
        self.shadows
    }

    pub fn visible(&self) -> &VisibleSet {
        self.visible
    }

    pub fn output(&self) -> &RenderTarget {
        self.output
    }

    /// Shared services, for procedures running their own passes or filters
    pub fn context(&mut self) -> &mut RenderContext<B> {
        &mut *self.ctx
    }

    /// Opaque-lit then opaque-unlit
    pub fn render_opaque(&mut self) -> RenderResult<()> {
        self.render_opaque_lit()?;
        self.render_opaque_unlit()
    }

    /// Run the configured post-processing chain on the output
    pub fn postprocess(&mut self) -> RenderResult<()> {
        self.ctx.marker(stages::POSTPROCESS);
        apply_chain(self.ctx, &self.config.postprocess, self.output)
    }

    /// The full fixed procedure: opaque, translucent, post-processing
    pub fn run_default(&mut self) -> RenderResult<()> {
        self.render_opaque()?;
        self.render_translucent()?;
        self.postprocess()
    }
}
