//! Services shared by every pass and filter of a frame

use std::rc::Rc;

use crate::backend::*;
use crate::binding::TextureBindingStack;
use crate::copier::RegionCopier;
use crate::error::RenderResult;
use crate::program::ProgramCache;
use crate::resources::RenderTargetCache;

/// Backend, programs, scratch targets, texture units and the region copier.
///
/// Fields are public so a pass can hold a binding scope on `bindings` while
/// still borrowing scratch targets from `targets`.
pub struct RenderContext<B: GraphicsBackend> {
    pub backend: SharedBackend<B>,
    pub programs: Rc<dyn ProgramCache>,
    pub targets: RenderTargetCache,
    pub bindings: TextureBindingStack<B>,
    pub copier: RegionCopier<B>,
}

impl<B: GraphicsBackend> RenderContext<B> {
    pub fn new(
        backend: SharedBackend<B>,
        programs: Rc<dyn ProgramCache>,
        targets: RenderTargetCache,
    ) -> Self {
        Self {
            bindings: TextureBindingStack::new(backend.clone()),
            copier: RegionCopier::new(backend.clone()),
            backend,
            programs,
            targets,
        }
    }

    pub fn program(&self, name: &str) -> RenderResult<ProgramHandle> {
        self.programs.program(name)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.borrow().capabilities()
    }

    /// Emit a debug marker
    pub fn marker(&self, label: &str) {
        self.backend.borrow_mut().debug_marker(label);
    }
}
