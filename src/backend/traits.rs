//! Core backend abstraction trait
//!
//! The renderer drives exactly one graphics-API context through this trait.
//! Implementations are not expected to be safe for concurrent use.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create framebuffer: {0}")]
    FramebufferCreationFailed(String),
    #[error("Draw call failed: {0}")]
    DrawFailed(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub u64);

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to uploaded mesh data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Hardware capability flags
    fn capabilities(&self) -> Capabilities;

    /// Number of texture units available for simultaneous binding
    fn texture_unit_count(&self) -> u32;

    // Resource creation

    /// Create a 2D or cube texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Create a framebuffer from existing textures
    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle>;

    // Resource cleanup

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Destroy a framebuffer (attached textures are left alive)
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    // State

    /// Bind the framebuffer subsequent draws and clears write into
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Bind a texture to a texture unit, or unbind the unit
    fn bind_texture(&mut self, unit: TextureUnit, texture: Option<TextureHandle>);

    /// Set viewport
    fn set_viewport(&mut self, area: Area);

    /// Upload a uniform block shared by subsequent draws
    fn write_uniform_block(&mut self, name: &str, data: &[u8]);

    /// Insert a debug marker into the command stream
    fn debug_marker(&mut self, label: &str);

    // Commands

    /// Clear the bound framebuffer
    fn clear(&mut self, values: &ClearValues) -> BackendResult<()>;

    /// Draw a fullscreen triangle into the bound framebuffer
    fn draw_fullscreen(
        &mut self,
        program: ProgramHandle,
        state: &DrawState,
        uniforms: &[Uniform],
    ) -> BackendResult<()>;

    /// Draw a mesh into the bound framebuffer
    fn draw_mesh(
        &mut self,
        program: ProgramHandle,
        mesh: MeshHandle,
        state: &DrawState,
        uniforms: &[Uniform],
    ) -> BackendResult<()>;

    /// Copy (and rescale when sizes differ) a region between framebuffers
    fn blit_framebuffer(
        &mut self,
        source: FramebufferHandle,
        source_area: Area,
        target: FramebufferHandle,
        target_area: Area,
        mask: BlitMask,
        filter: FilterMode,
    ) -> BackendResult<()>;
}
