//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. Textures are plain arrays of RGBA
//! `f32` texels (depth is stored in the red channel), every call is recorded
//! in a command log, and allocations and draws can be made to fail on
//! demand. Draw calls do not shade anything; clears and blits do move texels.
//!
//! Blits read and write texels one at a time in scan order, so an in-place
//! copy between overlapping regions of the same texture shows the same
//! read/write hazard a real GPU would.

use std::collections::HashMap;

use glam::Vec4;

use super::traits::*;
use super::types::*;

/// A call recorded by the dummy backend
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCommand {
    CreateTexture(TextureHandle),
    DestroyTexture(TextureHandle),
    CreateFramebuffer(FramebufferHandle),
    DestroyFramebuffer(FramebufferHandle),
    BindFramebuffer(Option<FramebufferHandle>),
    BindTexture {
        unit: u32,
        texture: Option<TextureHandle>,
    },
    Viewport(Area),
    UniformBlock(String),
    Marker(String),
    Clear {
        framebuffer: Option<FramebufferHandle>,
    },
    DrawFullscreen {
        program: ProgramHandle,
        framebuffer: Option<FramebufferHandle>,
        blend: Option<BlendState>,
    },
    DrawMesh {
        program: ProgramHandle,
        mesh: MeshHandle,
        framebuffer: Option<FramebufferHandle>,
    },
    Blit {
        source: FramebufferHandle,
        source_area: Area,
        target: FramebufferHandle,
        target_area: Area,
        mask: BlitMask,
    },
}

#[derive(Debug)]
struct DummyTexture {
    desc: TextureDescriptor,
    layers: Vec<Vec<Vec4>>,
}

#[derive(Debug)]
struct DummyFramebuffer {
    color: Vec<AttachmentTarget>,
    depth: Option<AttachmentTarget>,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    capabilities: Capabilities,
    texture_units: u32,
    next_handle: u64,
    textures: HashMap<TextureHandle, DummyTexture>,
    framebuffers: HashMap<FramebufferHandle, DummyFramebuffer>,
    bound_framebuffer: Option<FramebufferHandle>,
    bound_textures: Vec<Option<TextureHandle>>,
    commands: Vec<DummyCommand>,
    texture_budget: Option<usize>,
    framebuffer_budget: Option<usize>,
    draw_budget: Option<usize>,
    textures_created: usize,
    textures_destroyed: usize,
    draws: usize,
}

impl DummyBackend {
    /// Create a new dummy backend with every capability and 16 texture units.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default(), 16)
    }

    pub fn with_capabilities(capabilities: Capabilities, texture_units: u32) -> Self {
        Self {
            capabilities,
            texture_units,
            next_handle: 1,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            bound_framebuffer: None,
            bound_textures: vec![None; texture_units as usize],
            commands: Vec::new(),
            texture_budget: None,
            framebuffer_budget: None,
            draw_budget: None,
            textures_created: 0,
            textures_destroyed: 0,
            draws: 0,
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    /// Let `count` more textures be created, then fail with out-of-memory.
    pub fn fail_texture_creation_after(&mut self, count: usize) {
        self.texture_budget = Some(count);
    }

    /// Let `count` more framebuffers be created, then fail.
    pub fn fail_framebuffer_creation_after(&mut self, count: usize) {
        self.framebuffer_budget = Some(count);
    }

    /// Let `count` more draws succeed, then fail every draw.
    pub fn fail_draw_after(&mut self, count: usize) {
        self.draw_budget = Some(count);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&mut self) {
        self.texture_budget = None;
        self.framebuffer_budget = None;
        self.draw_budget = None;
    }

    pub fn commands(&self) -> &[DummyCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Debug markers in the order they were emitted
    pub fn markers(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DummyCommand::Marker(label) => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    pub fn textures_destroyed(&self) -> usize {
        self.textures_destroyed
    }

    /// Number of successful draw calls
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    pub fn is_texture_alive(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.bound_textures.get(unit as usize).copied().flatten()
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.bound_framebuffer
    }

    /// Replace the texels of a 2D texture (row-major, bottom row first).
    pub fn write_texels(&mut self, texture: TextureHandle, texels: &[Vec4]) -> BackendResult<()> {
        let tex = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| BackendError::UnknownHandle(format!("{texture:?}")))?;
        let layer = &mut tex.layers[0];
        if texels.len() != layer.len() {
            return Err(BackendError::InvalidParameter(format!(
                "expected {} texels, got {}",
                layer.len(),
                texels.len()
            )));
        }
        layer.copy_from_slice(texels);
        Ok(())
    }

    /// All texels of a 2D texture
    pub fn texels(&self, texture: TextureHandle) -> Option<Vec<Vec4>> {
        self.textures.get(&texture).map(|t| t.layers[0].clone())
    }

    pub fn texel(&self, texture: TextureHandle, x: u32, y: u32) -> Option<Vec4> {
        let tex = self.textures.get(&texture)?;
        let extent = tex.desc.extent;
        if x >= extent.width || y >= extent.height {
            return None;
        }
        Some(tex.layers[0][(y * extent.width + x) as usize])
    }

    fn allocate_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn take_budget(budget: &mut Option<usize>) -> bool {
        match budget {
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        }
    }

    fn framebuffer_extent(&self, framebuffer: &DummyFramebuffer) -> Option<Extent> {
        framebuffer
            .color
            .first()
            .or(framebuffer.depth.as_ref())
            .and_then(|a| self.textures.get(&a.texture))
            .map(|t| t.desc.extent)
    }

    fn attachment_layer(attachment: &AttachmentTarget) -> usize {
        attachment.face.map(|f| f.index()).unwrap_or(0)
    }

    fn fill_attachment(&mut self, attachment: AttachmentTarget, value: Vec4) {
        let layer = Self::attachment_layer(&attachment);
        if let Some(tex) = self.textures.get_mut(&attachment.texture) {
            tex.layers[layer].iter_mut().for_each(|t| *t = value);
        }
    }

    fn read_texel(&self, attachment: &AttachmentTarget, x: u32, y: u32) -> Vec4 {
        let layer = Self::attachment_layer(attachment);
        self.textures
            .get(&attachment.texture)
            .map(|t| t.layers[layer][(y * t.desc.extent.width + x) as usize])
            .unwrap_or(Vec4::ZERO)
    }

    fn write_texel(&mut self, attachment: &AttachmentTarget, x: u32, y: u32, value: Vec4) {
        let layer = Self::attachment_layer(attachment);
        if let Some(tex) = self.textures.get_mut(&attachment.texture) {
            let width = tex.desc.extent.width;
            tex.layers[layer][(y * width + x) as usize] = value;
        }
    }

    fn blit_attachment(
        &mut self,
        source: AttachmentTarget,
        source_area: Area,
        target: AttachmentTarget,
        target_area: Area,
    ) {
        // Nearest sampling in both directions; linear requests are treated the same.
        for ty in 0..target_area.height {
            for tx in 0..target_area.width {
                let sx = source_area.x + tx * source_area.width / target_area.width;
                let sy = source_area.y + ty * source_area.height / target_area.height;
                let value = self.read_texel(&source, sx, sy);
                self.write_texel(&target, target_area.x + tx, target_area.y + ty, value);
            }
        }
    }

    fn check_draw(&mut self) -> BackendResult<()> {
        if self.bound_framebuffer.is_none() {
            return Err(BackendError::DrawFailed("no framebuffer bound".into()));
        }
        if !Self::take_budget(&mut self.draw_budget) {
            return Err(BackendError::DrawFailed("injected draw failure".into()));
        }
        self.draws += 1;
        Ok(())
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for DummyBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn texture_unit_count(&self) -> u32 {
        self.texture_units
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.extent.width == 0 || desc.extent.height == 0 {
            return Err(BackendError::InvalidParameter(format!(
                "texture {:?} has an empty extent",
                desc.label
            )));
        }
        if !Self::take_budget(&mut self.texture_budget) {
            log::trace!("DummyBackend: injected failure creating texture {:?}", desc.label);
            return Err(BackendError::OutOfMemory);
        }

        let handle = TextureHandle(self.allocate_handle());
        log::trace!(
            "DummyBackend: creating texture {:?} {:?} ({}x{}, {:?})",
            handle,
            desc.label,
            desc.extent.width,
            desc.extent.height,
            desc.format
        );
        let texels = vec![Vec4::ZERO; desc.extent.pixel_count() as usize];
        let layers = vec![texels; desc.dimension.layers() as usize];
        self.textures.insert(
            handle,
            DummyTexture {
                desc: desc.clone(),
                layers,
            },
        );
        self.textures_created += 1;
        self.commands.push(DummyCommand::CreateTexture(handle));
        Ok(handle)
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle> {
        for attachment in desc.color.iter().chain(desc.depth.iter()) {
            if !self.textures.contains_key(&attachment.texture) {
                return Err(BackendError::UnknownHandle(format!("{:?}", attachment.texture)));
            }
        }
        if desc.color.is_empty() && desc.depth.is_none() {
            return Err(BackendError::FramebufferCreationFailed(
                "framebuffer has no attachments".into(),
            ));
        }
        if !Self::take_budget(&mut self.framebuffer_budget) {
            return Err(BackendError::FramebufferCreationFailed(
                "injected framebuffer failure".into(),
            ));
        }

        let handle = FramebufferHandle(self.allocate_handle());
        log::trace!("DummyBackend: creating framebuffer {:?} {:?}", handle, desc.label);
        self.framebuffers.insert(
            handle,
            DummyFramebuffer {
                color: desc.color.clone(),
                depth: desc.depth,
            },
        );
        self.commands.push(DummyCommand::CreateFramebuffer(handle));
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        log::trace!("DummyBackend: destroying texture {:?}", texture);
        if self.textures.remove(&texture).is_some() {
            self.textures_destroyed += 1;
        } else {
            log::warn!("DummyBackend: destroying unknown texture {:?}", texture);
        }
        self.commands.push(DummyCommand::DestroyTexture(texture));
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        log::trace!("DummyBackend: destroying framebuffer {:?}", framebuffer);
        if self.framebuffers.remove(&framebuffer).is_none() {
            log::warn!("DummyBackend: destroying unknown framebuffer {:?}", framebuffer);
        }
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
        self.commands.push(DummyCommand::DestroyFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.bound_framebuffer = framebuffer;
        self.commands.push(DummyCommand::BindFramebuffer(framebuffer));
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: Option<TextureHandle>) {
        if let Some(slot) = self.bound_textures.get_mut(unit.0 as usize) {
            *slot = texture;
        }
        self.commands.push(DummyCommand::BindTexture {
            unit: unit.0,
            texture,
        });
    }

    fn set_viewport(&mut self, area: Area) {
        self.commands.push(DummyCommand::Viewport(area));
    }

    fn write_uniform_block(&mut self, name: &str, data: &[u8]) {
        log::trace!("DummyBackend: uniform block {} ({} bytes)", name, data.len());
        self.commands.push(DummyCommand::UniformBlock(name.to_string()));
    }

    fn debug_marker(&mut self, label: &str) {
        self.commands.push(DummyCommand::Marker(label.to_string()));
    }

    fn clear(&mut self, values: &ClearValues) -> BackendResult<()> {
        let handle = self
            .bound_framebuffer
            .ok_or_else(|| BackendError::InvalidParameter("no framebuffer bound".into()))?;
        let framebuffer = self
            .framebuffers
            .get(&handle)
            .ok_or_else(|| BackendError::UnknownHandle(format!("{handle:?}")))?;
        let color = framebuffer.color.clone();
        let depth = framebuffer.depth;

        if let Some(value) = values.color {
            for attachment in color {
                self.fill_attachment(attachment, value);
            }
        }
        if let (Some(value), Some(attachment)) = (values.depth, depth) {
            self.fill_attachment(attachment, Vec4::new(value, 0.0, 0.0, 0.0));
        }
        self.commands.push(DummyCommand::Clear {
            framebuffer: Some(handle),
        });
        Ok(())
    }

    fn draw_fullscreen(
        &mut self,
        program: ProgramHandle,
        state: &DrawState,
        uniforms: &[Uniform],
    ) -> BackendResult<()> {
        self.check_draw()?;
        log::trace!(
            "DummyBackend: fullscreen draw {:?} with {} uniforms",
            program,
            uniforms.len()
        );
        self.commands.push(DummyCommand::DrawFullscreen {
            program,
            framebuffer: self.bound_framebuffer,
            blend: state.blend,
        });
        Ok(())
    }

    fn draw_mesh(
        &mut self,
        program: ProgramHandle,
        mesh: MeshHandle,
        _state: &DrawState,
        uniforms: &[Uniform],
    ) -> BackendResult<()> {
        self.check_draw()?;
        log::trace!(
            "DummyBackend: mesh draw {:?} {:?} with {} uniforms",
            program,
            mesh,
            uniforms.len()
        );
        self.commands.push(DummyCommand::DrawMesh {
            program,
            mesh,
            framebuffer: self.bound_framebuffer,
        });
        Ok(())
    }

    fn blit_framebuffer(
        &mut self,
        source: FramebufferHandle,
        source_area: Area,
        target: FramebufferHandle,
        target_area: Area,
        mask: BlitMask,
        _filter: FilterMode,
    ) -> BackendResult<()> {
        let src = self
            .framebuffers
            .get(&source)
            .ok_or_else(|| BackendError::UnknownHandle(format!("{source:?}")))?;
        let dst = self
            .framebuffers
            .get(&target)
            .ok_or_else(|| BackendError::UnknownHandle(format!("{target:?}")))?;

        let src_extent = self
            .framebuffer_extent(src)
            .ok_or_else(|| BackendError::InvalidParameter("source has no size".into()))?;
        let dst_extent = self
            .framebuffer_extent(dst)
            .ok_or_else(|| BackendError::InvalidParameter("target has no size".into()))?;
        if !source_area.fits_within(src_extent) || !target_area.fits_within(dst_extent) {
            return Err(BackendError::InvalidParameter(format!(
                "blit {source_area:?} -> {target_area:?} outside {src_extent:?} / {dst_extent:?}"
            )));
        }

        let mut pairs = Vec::new();
        if mask.contains(BlitMask::COLOR) {
            if let (Some(s), Some(d)) = (src.color.first(), dst.color.first()) {
                pairs.push((*s, *d));
            }
        }
        if mask.contains(BlitMask::DEPTH) {
            if let (Some(s), Some(d)) = (src.depth, dst.depth) {
                pairs.push((s, d));
            }
        }

        for (s, d) in pairs {
            self.blit_attachment(s, source_area, d, target_area);
        }
        self.commands.push(DummyCommand::Blit {
            source,
            source_area,
            target,
            target_area,
            mask,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_target(backend: &mut DummyBackend, extent: Extent) -> (TextureHandle, FramebufferHandle) {
        let texture = backend
            .create_texture(&TextureDescriptor {
                extent,
                ..Default::default()
            })
            .unwrap();
        let framebuffer = backend
            .create_framebuffer(&FramebufferDescriptor {
                label: None,
                color: vec![AttachmentTarget::texture(texture)],
                depth: None,
            })
            .unwrap();
        (texture, framebuffer)
    }

    #[test]
    fn test_texture_budget_fails_after_count() {
        let mut backend = DummyBackend::new();
        backend.fail_texture_creation_after(1);
        let desc = TextureDescriptor::default();
        assert!(backend.create_texture(&desc).is_ok());
        assert_eq!(backend.create_texture(&desc), Err(BackendError::OutOfMemory));
        assert_eq!(backend.live_textures(), 1);
    }

    #[test]
    fn test_blit_rescales_with_nearest_sampling() {
        let mut backend = DummyBackend::new();
        let (src_tex, src) = color_target(&mut backend, Extent::new(2, 1));
        let (dst_tex, dst) = color_target(&mut backend, Extent::new(4, 1));
        backend
            .write_texels(src_tex, &[Vec4::splat(1.0), Vec4::splat(2.0)])
            .unwrap();

        backend
            .blit_framebuffer(
                src,
                Area::new(0, 0, 2, 1),
                dst,
                Area::new(0, 0, 4, 1),
                BlitMask::COLOR,
                FilterMode::Nearest,
            )
            .unwrap();

        let texels = backend.texels(dst_tex).unwrap();
        assert_eq!(texels[0], Vec4::splat(1.0));
        assert_eq!(texels[1], Vec4::splat(1.0));
        assert_eq!(texels[2], Vec4::splat(2.0));
        assert_eq!(texels[3], Vec4::splat(2.0));
    }

    #[test]
    fn test_draw_without_framebuffer_fails() {
        let mut backend = DummyBackend::new();
        let result = backend.draw_fullscreen(ProgramHandle(1), &DrawState::fullscreen(), &[]);
        assert!(matches!(result, Err(BackendError::DrawFailed(_))));
    }
}
