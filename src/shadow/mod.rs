//! Shadow maps
//!
//! Descriptions select the kind of map a light needs, the loader allocates
//! each kind, and the renderer fills one map per shadow casting light at the
//! start of every frame.

mod description;
mod loader;
mod renderer;

pub use description::*;
pub use loader::*;
pub use renderer::*;
