//! Deferred rendering pipeline
//!
//! A frame runs these stages in order:
//! 1. Shadow - one map per shadow casting light, borrowed for the frame
//! 2. Opaque-lit - geometry buffer fill, then ambient and per-light passes
//! 3. Opaque-unlit - unlit opaque instances drawn into the output
//! 4. Translucent - blended instances, back to front
//! 5. Post-processing - the configured filter chain, in place on the output
//!
//! [`DeferredRenderer::evaluate_with`] hands the stages to a custom procedure
//! through [`DeferredControl`].

mod context;
mod control;
mod observer;
mod opaque;
mod renderer;
mod translucent;

pub use context::RenderContext;
pub use control::{stages, DeferredControl};
pub use observer::Observer;
pub use renderer::DeferredRenderer;
