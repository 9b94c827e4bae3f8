//! Deferred renderer entry points

use std::rc::Rc;

use crate::backend::*;
use crate::config::RendererConfig;
use crate::error::{RenderError, RenderResult};
use crate::program::ProgramCache;
use crate::resources::{GBufferCache, RenderTarget, RenderTargetCache};
use crate::scene::VisibleSet;
use crate::shadow::{ShadowMapCache, ShadowMapRenderer};

use super::control::stages;
use super::{DeferredControl, Observer, RenderContext};

/// Renders visible sets into caller owned framebuffers.
///
/// Owns the shared frame services and the geometry buffer and shadow map
/// caches. Everything borrowed during a frame is back in its cache when
/// [`DeferredRenderer::evaluate`] returns, whether or not the frame failed.
pub struct DeferredRenderer<B: GraphicsBackend> {
    ctx: RenderContext<B>,
    gbuffers: GBufferCache,
    shadows: ShadowMapRenderer,
    config: RendererConfig,
}

impl<B: GraphicsBackend + 'static> DeferredRenderer<B> {
    /// Create a renderer whose caches are sized by `config`
    pub fn new(
        backend: SharedBackend<B>,
        programs: Rc<dyn ProgramCache>,
        config: RendererConfig,
    ) -> Self {
        let targets = RenderTargetCache::new(backend.clone(), config.render_targets);
        let gbuffers = GBufferCache::new(backend.clone(), config.gbuffers);
        let shadow_maps = ShadowMapCache::new(backend.clone(), config.shadow_maps);
        log::debug!(
            "Creating deferred renderer (targets: {} bytes, gbuffers: {} bytes, shadow maps: {} bytes)",
            config.render_targets.capacity,
            config.gbuffers.capacity,
            config.shadow_maps.capacity
        );
        Self::with_caches(
            RenderContext::new(backend, programs, targets),
            gbuffers,
            shadow_maps,
            config,
        )
    }
}

impl<B: GraphicsBackend> DeferredRenderer<B> {
    /// Create a renderer around existing caches, e.g. ones shared with
    /// another renderer on the same backend
    pub fn with_caches(
        ctx: RenderContext<B>,
        gbuffers: GBufferCache,
        shadow_maps: ShadowMapCache,
        config: RendererConfig,
    ) -> Self {
        Self {
            ctx,
            gbuffers,
            shadows: ShadowMapRenderer::new(shadow_maps),
            config,
        }
    }

    pub fn context(&mut self) -> &mut RenderContext<B> {
        &mut self.ctx
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    pub fn render_targets(&self) -> &RenderTargetCache {
        &self.ctx.targets
    }

    pub fn gbuffer_cache(&self) -> &GBufferCache {
        &self.gbuffers
    }

    pub fn shadow_cache(&self) -> &ShadowMapCache {
        self.shadows.cache()
    }

    /// Render `visible` into `output` with every stage in order
    pub fn evaluate(&mut self, output: &RenderTarget, visible: &VisibleSet) -> RenderResult<()> {
        self.evaluate_with(output, visible, |control| control.run_default())
    }

    /// Render `visible` into `output`, letting `procedure` choose the stages.
    ///
    /// The observer and shadow maps are set up before `procedure` runs and
    /// released after it returns.
    pub fn evaluate_with<F>(
        &mut self,
        output: &RenderTarget,
        visible: &VisibleSet,
        procedure: F,
    ) -> RenderResult<()>
    where
        F: FnOnce(&mut DeferredControl<'_, B>) -> RenderResult<()>,
    {
        if !output.has_color() {
            return Err(RenderError::IncompatibleTargets(
                "frame output needs a color attachment".to_string(),
            ));
        }

        let observer = Observer::new(&visible.camera, output.extent());
        observer.upload(&mut *self.ctx.backend.borrow_mut());

        self.ctx.marker(stages::SHADOW);
        let shadows = self.shadows.render(
            &mut self.ctx,
            &observer,
            &visible.lights,
            &visible.shadow_casters,
        )?;
        log::debug!(
            "Frame {}x{}: {} lights, {} shadow maps",
            output.extent().width,
            output.extent().height,
            visible.lights.len(),
            shadows.len()
        );

        self.clear_output(output)?;

        let mut control = DeferredControl {
            ctx: &mut self.ctx,
            gbuffers: &self.gbuffers,
            config: &self.config,
            observer: &observer,
            shadows: &shadows,
            visible,
            output,
        };
        let result = procedure(&mut control);
        if let Err(err) = &result {
            log::debug!("Frame aborted: {}", err);
        }
        result
    }

    fn clear_output(&self, output: &RenderTarget) -> RenderResult<()> {
        let clear = ClearValues {
            color: Some(self.config.clear_color),
            depth: output.has_depth().then_some(1.0),
        };
        let mut backend = self.ctx.backend.borrow_mut();
        backend.bind_framebuffer(Some(output.framebuffer));
        backend.set_viewport(output.area());
        backend.clear(&clear)?;
        Ok(())
    }
}
