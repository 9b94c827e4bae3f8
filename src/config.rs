//! Renderer configuration

use glam::{Vec3, Vec4};

use crate::filters::PostprocessStep;

/// Limits of one borrow/lend cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Bytes idle entries may occupy before they are evicted
    pub capacity: usize,
    /// Entries of one description lent out at once, 0 for no limit
    pub max_borrows_per_key: usize,
}

impl CacheConfig {
    pub fn new(capacity: usize, max_borrows_per_key: usize) -> Self {
        Self {
            capacity,
            max_borrows_per_key,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_borrows_per_key(mut self, max_borrows_per_key: usize) -> Self {
        self.max_borrows_per_key = max_borrows_per_key;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256 * 1024 * 1024, // 256 MiB
            max_borrows_per_key: 8,
        }
    }
}

/// Configuration for the deferred renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Scratch render targets used by filters and passes
    pub render_targets: CacheConfig,
    /// Geometry buffers
    pub gbuffers: CacheConfig,
    /// Shadow maps
    pub shadow_maps: CacheConfig,
    /// Color the output is cleared to before the opaque stages
    pub clear_color: Vec4,
    /// Ambient light added once per frame
    pub ambient: Vec3,
    /// Filters applied to the output after the translucent stage, in order
    pub postprocess: Vec<PostprocessStep>,
}

impl RendererConfig {
    pub fn with_postprocess(mut self, steps: Vec<PostprocessStep>) -> Self {
        self.postprocess = steps;
        self
    }

    pub fn with_ambient(mut self, ambient: Vec3) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_clear_color(mut self, clear_color: Vec4) -> Self {
        self.clear_color = clear_color;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            render_targets: CacheConfig::default(),
            gbuffers: CacheConfig::new(128 * 1024 * 1024, 2),
            shadow_maps: CacheConfig::new(128 * 1024 * 1024, 0),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            ambient: Vec3::splat(0.05),
            postprocess: Vec::new(),
        }
    }
}
