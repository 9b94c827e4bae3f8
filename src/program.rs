//! Shader program lookup
//!
//! Program compilation happens elsewhere; the renderer only needs to map a
//! program name to an executable handle.

use std::collections::HashMap;

use crate::backend::ProgramHandle;
use crate::error::{RenderError, RenderResult};

/// Program names the built-in passes and filters look up
pub mod names {
    pub const GBUFFER: &str = "deferred/gbuffer";
    pub const AMBIENT: &str = "deferred/ambient";
    pub const LIGHT_DIRECTIONAL: &str = "deferred/light-directional";
    pub const LIGHT_PROJECTIVE: &str = "deferred/light-projective";
    pub const LIGHT_SPHERICAL: &str = "deferred/light-spherical";
    pub const UNLIT: &str = "deferred/unlit";
    pub const TRANSLUCENT: &str = "deferred/translucent";
    pub const SHADOW_DEPTH: &str = "shadow/depth";
    pub const SHADOW_VARIANCE: &str = "shadow/variance";
    pub const SHADOW_DUAL_PARABOLOID: &str = "shadow/dual-paraboloid";
    pub const BLUR_HORIZONTAL: &str = "filter/blur-horizontal";
    pub const BLUR_VERTICAL: &str = "filter/blur-vertical";
    pub const FXAA: &str = "filter/fxaa";
    pub const FOG: &str = "filter/fog";
    pub const EMISSION_EXTRACT: &str = "filter/emission-extract";
    pub const EMISSION_COMPOSITE: &str = "filter/emission-composite";

    /// Every built-in program name
    pub const ALL: &[&str] = &[
        GBUFFER,
        AMBIENT,
        LIGHT_DIRECTIONAL,
        LIGHT_PROJECTIVE,
        LIGHT_SPHERICAL,
        UNLIT,
        TRANSLUCENT,
        SHADOW_DEPTH,
        SHADOW_VARIANCE,
        SHADOW_DUAL_PARABOLOID,
        BLUR_HORIZONTAL,
        BLUR_VERTICAL,
        FXAA,
        FOG,
        EMISSION_EXTRACT,
        EMISSION_COMPOSITE,
    ];
}

/// Looks up compiled programs by name
pub trait ProgramCache {
    fn program(&self, name: &str) -> RenderResult<ProgramHandle>;
}

/// Name to handle map filled in by whoever compiles the programs
#[derive(Debug, Clone, Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, ProgramHandle>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in name mapped to a distinct placeholder handle
    pub fn with_builtin_placeholders() -> Self {
        let mut registry = Self::new();
        for (index, name) in names::ALL.iter().enumerate() {
            registry.register(name, ProgramHandle(index as u64 + 1));
        }
        registry
    }

    /// Register a program, replacing any previous one with the same name
    pub fn register(&mut self, name: &str, program: ProgramHandle) -> Option<ProgramHandle> {
        self.programs.insert(name.to_string(), program)
    }

    pub fn remove(&mut self, name: &str) -> Option<ProgramHandle> {
        self.programs.remove(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl ProgramCache for ProgramRegistry {
    fn program(&self, name: &str) -> RenderResult<ProgramHandle> {
        self.programs
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::ProgramNotFound(name.to_string()))
    }
}
