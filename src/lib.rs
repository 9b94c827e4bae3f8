//! Deferred renderer built on a borrow/lend cache of GPU resources
//!
//! Render targets, geometry buffers and shadow maps are borrowed from keyed
//! caches for the span of one pass and handed back through receipts, so a
//! frame allocates nothing once the caches are warm.
//!
//! # Features
//! - Borrow/lend caches with per-description limits and LRU eviction
//! - Shadow maps: basic, variance, cube and dual-paraboloid
//! - Multi-pass filters (blur, FXAA, fog, copy, emission) safe in place
//! - Region copies between framebuffers, including aliased ones
//! - Scoped texture unit binding that restores on every exit path
//! - Fixed or caller driven frame procedure
//!
//! All GPU work goes through [`backend::GraphicsBackend`]. The crate ships an
//! in-memory [`backend::DummyBackend`] for tests and headless runs.

pub mod backend;
pub mod binding;
pub mod cache;
pub mod config;
pub mod copier;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod program;
pub mod resources;
pub mod scene;
pub mod shadow;

pub use backend::{share, GraphicsBackend, SharedBackend};
pub use binding::{BindingScope, TextureBindingStack};
pub use cache::{BorrowCache, CacheStats, Receipt, ResourceLoader};
pub use config::{CacheConfig, RendererConfig};
pub use copier::{CopyChannels, RegionCopier};
pub use error::{RenderError, RenderResult};
pub use filters::{Filter, PostprocessStep};
pub use pipeline::{DeferredControl, DeferredRenderer, Observer, RenderContext};
pub use program::{ProgramCache, ProgramRegistry};
pub use resources::{RenderTarget, RenderTargetCache, RenderTargetDescription};
pub use scene::{Camera, Instance, Light, Material, VisibleSet};
pub use shadow::{ShadowMapCache, ShadowMapDescription, ShadowMapSet};
