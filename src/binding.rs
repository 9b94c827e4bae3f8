//! Texture unit allocation
//!
//! Passes bind their input textures inside a [`BindingScope`]. A scope
//! hands out the next free texture unit on each bind and, when it ends,
//! rebinds exactly what was bound when it was entered. Scopes borrow the
//! stack (or their parent scope) mutably, so they can only end in reverse
//! order of entry, and they restore on every exit path, including errors
//! propagated with `?`.

use crate::backend::{GraphicsBackend, SharedBackend, TextureHandle, TextureUnit};
use crate::error::{RenderError, RenderResult};

struct Snapshot {
    first_free: u32,
    bound: Vec<Option<TextureHandle>>,
}

/// Tracks which texture is bound to each unit
pub struct TextureBindingStack<B: GraphicsBackend> {
    backend: SharedBackend<B>,
    bound: Vec<Option<TextureHandle>>,
    first_free: u32,
    saved: Vec<Snapshot>,
}

impl<B: GraphicsBackend> TextureBindingStack<B> {
    pub fn new(backend: SharedBackend<B>) -> Self {
        let units = backend.borrow().texture_unit_count();
        Self {
            backend,
            bound: vec![None; units as usize],
            first_free: 0,
            saved: Vec::new(),
        }
    }

    /// Start a binding scope
    pub fn enter(&mut self) -> BindingScope<'_, B> {
        self.saved.push(Snapshot {
            first_free: self.first_free,
            bound: self.bound.clone(),
        });
        BindingScope { stack: self }
    }

    pub fn unit_count(&self) -> u32 {
        self.bound.len() as u32
    }

    /// Number of scopes currently entered
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn bound(&self, unit: TextureUnit) -> Option<TextureHandle> {
        self.bound.get(unit.0 as usize).copied().flatten()
    }

    fn bind(&mut self, texture: TextureHandle) -> RenderResult<TextureUnit> {
        if self.first_free >= self.unit_count() {
            return Err(RenderError::TextureUnitsExhausted(self.unit_count()));
        }
        let unit = TextureUnit(self.first_free);
        self.backend.borrow_mut().bind_texture(unit, Some(texture));
        self.bound[unit.0 as usize] = Some(texture);
        self.first_free += 1;
        Ok(unit)
    }

    fn exit(&mut self) {
        let Some(snapshot) = self.saved.pop() else {
            return;
        };
        let mut backend = self.backend.borrow_mut();
        for (unit, (current, previous)) in self.bound.iter().zip(&snapshot.bound).enumerate() {
            if current != previous {
                backend.bind_texture(TextureUnit(unit as u32), *previous);
            }
        }
        self.bound = snapshot.bound;
        self.first_free = snapshot.first_free;
    }
}

/// A region of code whose texture bindings are undone when it ends
pub struct BindingScope<'a, B: GraphicsBackend> {
    stack: &'a mut TextureBindingStack<B>,
}

impl<B: GraphicsBackend> BindingScope<'_, B> {
    /// Bind a texture to the next free unit
    pub fn bind(&mut self, texture: TextureHandle) -> RenderResult<TextureUnit> {
        self.stack.bind(texture)
    }

    /// Start a nested scope; units bound here stay bound inside it
    pub fn enter(&mut self) -> BindingScope<'_, B> {
        self.stack.enter()
    }

    /// Units still free in this scope
    pub fn free_units(&self) -> u32 {
        self.stack.unit_count() - self.stack.first_free
    }
}

impl<B: GraphicsBackend> Drop for BindingScope<'_, B> {
    fn drop(&mut self) {
        self.stack.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{share, Capabilities, DummyBackend};

    fn stack(units: u32) -> (TextureBindingStack<DummyBackend>, SharedBackend<DummyBackend>) {
        let backend = share(DummyBackend::with_capabilities(Capabilities::default(), units));
        (TextureBindingStack::new(backend.clone()), backend)
    }

    #[test]
    fn test_nested_scope_restores_parent_bindings() {
        let (mut stack, backend) = stack(4);
        let mut outer = stack.enter();
        assert_eq!(outer.bind(TextureHandle(10)).unwrap(), TextureUnit(0));
        {
            let mut inner = outer.enter();
            assert_eq!(inner.bind(TextureHandle(20)).unwrap(), TextureUnit(1));
            assert_eq!(inner.bind(TextureHandle(30)).unwrap(), TextureUnit(2));
        }
        assert_eq!(backend.borrow().bound_texture(1), None);
        assert_eq!(backend.borrow().bound_texture(0), Some(TextureHandle(10)));
        // Units freed by the inner scope are handed out again
        assert_eq!(outer.bind(TextureHandle(40)).unwrap(), TextureUnit(1));
        drop(outer);
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.bound(TextureUnit(0)), None);
    }

    #[test]
    fn test_exhausted_units_fail_and_still_restore() {
        let (mut stack, backend) = stack(2);
        let result: RenderResult<()> = (|| {
            let mut scope = stack.enter();
            scope.bind(TextureHandle(1))?;
            scope.bind(TextureHandle(2))?;
            scope.bind(TextureHandle(3))?;
            Ok(())
        })();
        assert_eq!(result, Err(RenderError::TextureUnitsExhausted(2)));
        assert_eq!(backend.borrow().bound_texture(0), None);
        assert_eq!(backend.borrow().bound_texture(1), None);
        assert_eq!(stack.depth(), 0);
    }
}
