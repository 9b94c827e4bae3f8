//! Off-screen render resources
//!
//! Descriptions, the resources built from them, their loaders and the typed
//! cache views the renderer borrows them through.

mod description;
mod gbuffer;
mod target;

pub use description::*;
pub use gbuffer::*;
pub use target::*;

use crate::backend::*;
use crate::error::{RenderError, RenderResult};

/// GPU objects created while building one resource.
///
/// Everything created through the guard is destroyed again when it is
/// dropped, unless [`PendingAllocations::commit`] was called first. Loaders
/// that need several objects use it so a failure part way through leaks
/// nothing.
pub struct PendingAllocations<'a, B: GraphicsBackend> {
    backend: &'a mut B,
    textures: Vec<TextureHandle>,
    framebuffers: Vec<FramebufferHandle>,
}

impl<'a, B: GraphicsBackend> PendingAllocations<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            textures: Vec::new(),
            framebuffers: Vec::new(),
        }
    }

    pub fn texture(&mut self, desc: &TextureDescriptor) -> RenderResult<TextureHandle> {
        let texture = self
            .backend
            .create_texture(desc)
            .map_err(RenderError::Allocation)?;
        self.textures.push(texture);
        Ok(texture)
    }

    pub fn framebuffer(&mut self, desc: &FramebufferDescriptor) -> RenderResult<FramebufferHandle> {
        let framebuffer = self
            .backend
            .create_framebuffer(desc)
            .map_err(RenderError::Allocation)?;
        self.framebuffers.push(framebuffer);
        Ok(framebuffer)
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    /// Keep everything created so far
    pub fn commit(mut self) {
        self.textures.clear();
        self.framebuffers.clear();
    }
}

impl<B: GraphicsBackend> Drop for PendingAllocations<'_, B> {
    fn drop(&mut self) {
        if self.textures.is_empty() && self.framebuffers.is_empty() {
            return;
        }
        log::debug!(
            "Rolling back {} textures and {} framebuffers",
            self.textures.len(),
            self.framebuffers.len()
        );
        for framebuffer in self.framebuffers.drain(..).rev() {
            self.backend.destroy_framebuffer(framebuffer);
        }
        for texture in self.textures.drain(..).rev() {
            self.backend.destroy_texture(texture);
        }
    }
}
