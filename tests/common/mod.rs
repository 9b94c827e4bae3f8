//! Common utilities for integration tests.
//!
//! Every test runs against the in-memory dummy backend. The helpers here
//! build the shared services a pass or filter needs and hand out render
//! targets borrowed from the test's own cache.

#![allow(dead_code)]

use std::rc::Rc;

use deferred_renderer::backend::*;
use deferred_renderer::pipeline::RenderContext;
use deferred_renderer::program::ProgramRegistry;
use deferred_renderer::resources::{RenderTargetCache, RenderTargetDescription, RenderTargetReceipt};
use deferred_renderer::CacheConfig;
use glam::Vec4;

/// Install a test logger once per test binary. `RUST_LOG=trace` shows backend traffic.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Program registry with every built-in program present
pub fn programs() -> Rc<ProgramRegistry> {
    Rc::new(ProgramRegistry::with_builtin_placeholders())
}

pub fn color_description(width: u32, height: u32) -> RenderTargetDescription {
    RenderTargetDescription::color(Extent::new(width, height), TextureFormat::Rgba8Unorm)
}

pub fn color_depth_description(width: u32, height: u32) -> RenderTargetDescription {
    color_description(width, height).with_depth(TextureFormat::Depth24Plus)
}

/// Test context owning a dummy backend and the services built on it.
pub struct TestContext {
    pub backend: SharedBackend<DummyBackend>,
    pub ctx: RenderContext<DummyBackend>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_backend(DummyBackend::new())
    }

    pub fn with_backend(backend: DummyBackend) -> Self {
        init_logger();
        let backend = share(backend);
        let targets = RenderTargetCache::new(backend.clone(), CacheConfig::default());
        let ctx = RenderContext::new(backend.clone(), programs(), targets);
        Self { backend, ctx }
    }

    /// Borrow a render target from the context's cache
    pub fn target(&self, description: &RenderTargetDescription) -> RenderTargetReceipt {
        self.ctx
            .targets
            .get(description)
            .expect("Failed to borrow render target")
    }

    /// Fill the color attachment of `target` with a horizontal ramp: texel x holds x + 1
    pub fn fill_ramp(&self, target: &RenderTargetReceipt) -> Vec<Vec4> {
        let extent = target.extent();
        let texels: Vec<Vec4> = (0..extent.pixel_count())
            .map(|i| Vec4::splat((i % extent.width as u64 + 1) as f32))
            .collect();
        self.backend
            .borrow_mut()
            .write_texels(target.color_texture().expect("no color"), &texels)
            .expect("Failed to write texels");
        texels
    }

    pub fn color_texels(&self, target: &RenderTargetReceipt) -> Vec<Vec4> {
        self.backend
            .borrow()
            .texels(target.color_texture().expect("no color"))
            .expect("texture not alive")
    }

    /// Programs of the fullscreen draws recorded so far, with their targets
    pub fn fullscreen_draws(&self) -> Vec<(ProgramHandle, Option<FramebufferHandle>)> {
        self.backend
            .borrow()
            .commands()
            .iter()
            .filter_map(|command| match command {
                DummyCommand::DrawFullscreen {
                    program,
                    framebuffer,
                    ..
                } => Some((*program, *framebuffer)),
                _ => None,
            })
            .collect()
    }
}
