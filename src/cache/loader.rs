//! Resource loader strategy
//!
//! One loader exists per resource kind. The cache calls it to allocate a
//! value on a miss, to release the value on eviction or teardown, and to
//! account the value's size against the cache capacity.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::RenderResult;

/// Allocates, sizes and destroys one kind of GPU resource
pub trait ResourceLoader {
    /// Description the resource is built from; also the cache key
    type Key: Clone + Eq + Hash + Debug;
    /// The resource handed to borrowers
    type Value: Clone;

    /// Allocate a new value for the description.
    ///
    /// Failures are reported as [`RenderError::Allocation`](crate::RenderError::Allocation)
    /// or [`RenderError::Unsupported`](crate::RenderError::Unsupported). A loader that
    /// creates several GPU objects releases the ones it already created before
    /// returning an error.
    fn load(&mut self, key: &Self::Key) -> RenderResult<Self::Value>;

    /// Release the GPU objects behind a value. Called at most once per value.
    fn close(&mut self, value: Self::Value);

    /// Accounted size in bytes
    fn size_of(&self, value: &Self::Value) -> usize;
}
