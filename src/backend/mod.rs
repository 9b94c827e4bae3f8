//! Backend abstraction layer
//!
//! Provides the trait the renderer drives and an in-memory implementation
//! used for tests and headless runs.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{DummyBackend, DummyCommand};
pub use traits::*;
pub use types::*;

use std::cell::RefCell;
use std::rc::Rc;

/// The single graphics context shared by every renderer component.
///
/// Rendering is single-threaded, so the context is reference counted and
/// borrowed for the duration of individual calls only.
pub type SharedBackend<B> = Rc<RefCell<B>>;

/// Wrap a backend for sharing between caches, loaders and passes
pub fn share<B: GraphicsBackend>(backend: B) -> SharedBackend<B> {
    Rc::new(RefCell::new(backend))
}
