//! Scene description consumed by the renderer
//!
//! The renderer only reads these types. Culling has already happened: a
//! [`VisibleSet`] lists what to draw this frame.

mod camera;
mod light;
mod transform;

pub use camera::*;
pub use light::*;
pub use transform::*;

use glam::{Vec3, Vec4};

use crate::backend::MeshHandle;
use crate::program::names;

/// How an instance is shaded
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Program drawing the instance
    pub program: String,
    /// Lit surfaces go through the geometry buffer and light accumulation
    pub lit: bool,
    /// Alpha below 1.0 makes the instance translucent
    pub color: Vec4,
}

impl Material {
    /// Opaque surface shaded by scene lights
    pub fn lit(color: Vec4) -> Self {
        Self {
            program: names::GBUFFER.to_string(),
            lit: true,
            color,
        }
    }

    /// Opaque surface drawn with its own color only
    pub fn unlit(color: Vec4) -> Self {
        Self {
            program: names::UNLIT.to_string(),
            lit: false,
            color,
        }
    }

    /// Blended surface drawn after the opaque stages
    pub fn translucent(color: Vec4) -> Self {
        Self {
            program: names::TRANSLUCENT.to_string(),
            lit: false,
            color,
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn is_translucent(&self) -> bool {
        self.color.w < 1.0
    }
}

/// A mesh placed in the world with a material
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub mesh: MeshHandle,
    pub transform: Transform,
    pub material: Material,
}

impl Instance {
    pub fn new(mesh: MeshHandle, transform: Transform, material: Material) -> Self {
        Self {
            mesh,
            transform,
            material,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }
}

/// Everything visible from the camera this frame
#[derive(Debug, Clone, Default)]
pub struct VisibleSet {
    pub camera: Camera,
    pub lights: Vec<Light>,
    /// Opaque instances, lit and unlit
    pub opaque: Vec<Instance>,
    pub translucent: Vec<Instance>,
    /// Instances rendered into shadow maps
    pub shadow_casters: Vec<Instance>,
}

impl VisibleSet {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    /// Add an instance to the opaque or translucent list by its material
    pub fn add_instance(&mut self, instance: Instance) {
        if instance.material.is_translucent() {
            self.translucent.push(instance);
        } else {
            self.opaque.push(instance);
        }
    }

    /// Add an instance that also casts shadows
    pub fn add_caster(&mut self, instance: Instance) {
        self.shadow_casters.push(instance.clone());
        self.add_instance(instance);
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lit_opaque(&self) -> impl Iterator<Item = &Instance> {
        self.opaque.iter().filter(|i| i.material.lit)
    }

    pub fn unlit_opaque(&self) -> impl Iterator<Item = &Instance> {
        self.opaque.iter().filter(|i| !i.material.lit)
    }
}
