//! Opaque stages
//!
//! Opaque-lit:
//! 1. Geometry buffer pass - lit instances write albedo, normal, specular, depth
//! 2. Depth copy - the geometry buffer depth becomes the output depth
//! 3. Ambient pass - fullscreen, albedo times ambient light
//! 4. Light passes - one additive fullscreen pass per light, with its shadow map
//!
//! Opaque-unlit draws the remaining opaque instances straight into the output.

use glam::Vec4;

use crate::backend::*;
use crate::binding::BindingScope;
use crate::copier::CopyChannels;
use crate::error::RenderResult;
use crate::program::names;
use crate::resources::{GBuffer, GBufferDescription};
use crate::scene::{Instance, Light};
use crate::shadow::{ShadowMapEntry, ShadowMatrices};

use super::control::stages;
use super::DeferredControl;

impl<B: GraphicsBackend> DeferredControl<'_, B> {
    /// Fill the geometry buffer and accumulate lighting into the output
    pub fn render_opaque_lit(&mut self) -> RenderResult<()> {
        self.ctx.marker(stages::OPAQUE_LIT);
        let mut description = GBufferDescription::new(self.output.extent());
        if let Some(format) = self.output.description.depth {
            description = description.with_depth_format(format);
        }
        let gbuffer = self.gbuffers.get(&description)?;

        self.fill_gbuffer(&gbuffer)?;
        if self.output.has_depth() {
            self.ctx.copier.copy(
                &gbuffer.depth_target(),
                Area::full(gbuffer.extent()),
                self.output,
                self.output.area(),
                CopyChannels::Depth,
            )?;
        }
        self.accumulate_lights(&gbuffer)
    }

    /// Draw unlit opaque instances into the output
    pub fn render_opaque_unlit(&mut self) -> RenderResult<()> {
        self.ctx.marker(stages::OPAQUE_UNLIT);
        let state = DrawState::fullscreen().with_depth(DepthState::test_and_write());
        let visible = self.visible;
        let instances: Vec<&Instance> = visible.unlit_opaque().collect();
        self.draw_instances(self.output.framebuffer, self.output.area(), &instances, state)
    }

    fn fill_gbuffer(&mut self, gbuffer: &GBuffer) -> RenderResult<()> {
        {
            let mut backend = self.ctx.backend.borrow_mut();
            backend.bind_framebuffer(Some(gbuffer.framebuffer));
            backend.set_viewport(Area::full(gbuffer.extent()));
            backend.clear(&ClearValues::color_depth(Vec4::ZERO, 1.0))?;
        }
        let state = DrawState::fullscreen().with_depth(DepthState::test_and_write());
        let visible = self.visible;
        let instances: Vec<&Instance> = visible.lit_opaque().collect();
        self.draw_instances(gbuffer.framebuffer, Area::full(gbuffer.extent()), &instances, state)
    }

    pub(super) fn draw_instances(
        &mut self,
        framebuffer: FramebufferHandle,
        viewport: Area,
        instances: &[&Instance],
        state: DrawState,
    ) -> RenderResult<()> {
        let mut backend = self.ctx.backend.borrow_mut();
        backend.bind_framebuffer(Some(framebuffer));
        backend.set_viewport(viewport);
        for instance in instances {
            let program = self.ctx.programs.program(&instance.material.program)?;
            let uniform = self.observer.instance_uniform(instance);
            backend.write_uniform_block("instance", bytemuck::bytes_of(&uniform));
            backend.draw_mesh(
                program,
                instance.mesh,
                &state,
                &[Uniform::vec4("u_color", instance.material.color)],
            )?;
        }
        Ok(())
    }

    fn accumulate_lights(&mut self, gbuffer: &GBuffer) -> RenderResult<()> {
        let ambient = self.ctx.program(names::AMBIENT)?;
        let mut programs = Vec::with_capacity(self.visible.lights.len());
        for light in &self.visible.lights {
            programs.push(self.ctx.program(light_program(light))?);
        }

        let output = self.output;
        let additive = DrawState::fullscreen().with_blend(BlendState::additive());

        // Geometry buffer textures stay bound for every light
        let mut scope = self.ctx.bindings.enter();
        let samplers = [
            Uniform::sampler("u_albedo", scope.bind(gbuffer.albedo)?),
            Uniform::sampler("u_normal", scope.bind(gbuffer.normal)?),
            Uniform::sampler("u_specular", scope.bind(gbuffer.specular)?),
            Uniform::sampler("u_depth", scope.bind(gbuffer.depth)?),
        ];

        {
            let mut backend = self.ctx.backend.borrow_mut();
            backend.bind_framebuffer(Some(output.framebuffer));
            backend.set_viewport(output.area());
            let mut uniforms = samplers.to_vec();
            uniforms.push(Uniform::vec3("u_ambient", self.config.ambient));
            backend.draw_fullscreen(ambient, &DrawState::fullscreen(), &uniforms)?;
        }

        for (light, program) in self.visible.lights.iter().zip(programs) {
            let mut light_scope = scope.enter();
            let mut uniforms = samplers.to_vec();
            if let Some(entry) = self.shadows.get(light.id()) {
                bind_shadow(&mut light_scope, entry, &mut uniforms)?;
            }

            let mut backend = self.ctx.backend.borrow_mut();
            backend.write_uniform_block("light", bytemuck::bytes_of(&light.to_gpu_data()));
            backend.draw_fullscreen(program, &additive, &uniforms)?;
        }
        Ok(())
    }
}

fn light_program(light: &Light) -> &'static str {
    match light {
        Light::Directional(_) => names::LIGHT_DIRECTIONAL,
        Light::Projective(_) => names::LIGHT_PROJECTIVE,
        Light::Spherical(_) => names::LIGHT_SPHERICAL,
    }
}

/// Bind a light's shadow textures and add its sampling uniforms
fn bind_shadow<B: GraphicsBackend>(
    scope: &mut BindingScope<'_, B>,
    entry: &ShadowMapEntry,
    uniforms: &mut Vec<Uniform>,
) -> RenderResult<()> {
    const SHADOW_SAMPLERS: [&str; 2] = ["u_shadow0", "u_shadow1"];
    for (name, texture) in SHADOW_SAMPLERS.iter().zip(entry.map.textures()) {
        uniforms.push(Uniform::sampler(*name, scope.bind(texture)?));
    }
    match entry.matrices {
        ShadowMatrices::Single(matrix) => {
            uniforms.push(Uniform::mat4("u_shadow_matrix", matrix));
        }
        ShadowMatrices::Cube(_) => {
            uniforms.push(Uniform::int("u_shadow_cube", 1));
        }
        ShadowMatrices::Paraboloid { view, near, far } => {
            uniforms.push(Uniform::mat4("u_shadow_matrix", view));
            uniforms.push(Uniform::float("u_shadow_near", near));
            uniforms.push(Uniform::float("u_shadow_far", far));
        }
    }
    Ok(())
}
