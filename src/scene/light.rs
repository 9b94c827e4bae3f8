//! Light types for the scene

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::backend::CubeFace;
use crate::filters::BlurParameters;
use crate::shadow::{ShadowMapDescription, ShadowTextureDescription};

/// Identifies a light across frames; shadow maps are keyed by it per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u32);

/// Shadow cast along a single direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MappedShadow {
    Basic(ShadowTextureDescription),
    /// Variance map, blurred in place after rendering
    Variance {
        map: ShadowTextureDescription,
        blur: BlurParameters,
    },
}

impl MappedShadow {
    pub fn description(&self) -> ShadowMapDescription {
        match self {
            MappedShadow::Basic(map) => ShadowMapDescription::DirectionalBasic(*map),
            MappedShadow::Variance { map, .. } => ShadowMapDescription::DirectionalVariance(*map),
        }
    }
}

/// Shadow cast in every direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OmniShadow {
    Cube(ShadowTextureDescription),
    DualParaboloid(ShadowTextureDescription),
}

impl OmniShadow {
    pub fn description(&self) -> ShadowMapDescription {
        match self {
            OmniShadow::Cube(map) => ShadowMapDescription::OmniCubeBasic(*map),
            OmniShadow::DualParaboloid(map) => ShadowMapDescription::OmniDualParaboloidBasic(*map),
        }
    }
}

/// Light infinitely far away (like the sun)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub id: LightId,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub shadow: Option<MappedShadow>,
}

impl DirectionalLight {
    pub fn new(id: LightId, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            id,
            direction: direction.normalize(),
            color,
            intensity,
            shadow: None,
        }
    }

    /// Orthographic light matrix enclosing the given world-space points
    pub fn view_projection(&self, bounds: &[Vec3]) -> Mat4 {
        let direction = safe_direction(self.direction);
        let center = bounds.iter().copied().sum::<Vec3>() / bounds.len().max(1) as f32;
        let view = Mat4::look_at_rh(center - direction, center, up_for(direction));

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for point in bounds {
            let p = view.transform_point3(*point);
            min = min.min(p);
            max = max.max(p);
        }
        if bounds.is_empty() {
            min = Vec3::splat(-1.0);
            max = Vec3::splat(1.0);
        }
        // Catch casters between the bounds and the light
        let depth = (max.z - min.z).max(1.0);
        max.z += depth;

        Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max.z, -min.z) * view
    }
}

/// Spot-like light projecting a cone from a point
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectiveLight {
    pub id: LightId,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Full cone angle in radians
    pub fov: f32,
    pub shadow: Option<MappedShadow>,
}

impl ProjectiveLight {
    pub fn new(id: LightId, position: Vec3, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            id,
            position,
            direction: direction.normalize(),
            color,
            intensity,
            range: 10.0,
            fov: std::f32::consts::FRAC_PI_2,
            shadow: None,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        let direction = safe_direction(self.direction);
        let view = Mat4::look_at_rh(self.position, self.position + direction, up_for(direction));
        let fov = self.fov.clamp(0.1, std::f32::consts::PI - 0.01);
        Mat4::perspective_rh(fov, 1.0, SHADOW_NEAR, self.range.max(1.0)) * view
    }
}

/// Point light radiating in every direction
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalLight {
    pub id: LightId,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub shadow: Option<OmniShadow>,
}

impl SphericalLight {
    pub fn new(id: LightId, position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            id,
            position,
            color,
            intensity,
            radius,
            shadow: None,
        }
    }

    /// View-projection of one cube face
    pub fn face_view_projection(&self, face: CubeFace) -> Mat4 {
        let (forward, up) = face.basis();
        let view = Mat4::look_at_rh(self.position, self.position + forward, up);
        let projection = Mat4::perspective_rh(
            std::f32::consts::FRAC_PI_2,
            1.0,
            SHADOW_NEAR,
            self.radius.max(SHADOW_NEAR * 2.0),
        );
        projection * view
    }

    /// View matrix of the paraboloid pair; the positive hemisphere looks down -Z
    pub fn paraboloid_view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position - Vec3::Z, Vec3::Y)
    }
}

/// Near plane of perspective shadow projections
pub const SHADOW_NEAR: f32 = 0.05;

fn safe_direction(direction: Vec3) -> Vec3 {
    if direction.length_squared() > 1e-6 {
        direction.normalize()
    } else {
        -Vec3::Z
    }
}

fn up_for(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::X
    } else {
        Vec3::Y
    }
}

/// Light in the scene
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Projective(ProjectiveLight),
    Spherical(SphericalLight),
}

impl Light {
    pub fn id(&self) -> LightId {
        match self {
            Light::Directional(light) => light.id,
            Light::Projective(light) => light.id,
            Light::Spherical(light) => light.id,
        }
    }

    /// Shadow map the light needs this frame, if it casts shadows
    pub fn shadow_description(&self) -> Option<ShadowMapDescription> {
        match self {
            Light::Directional(light) => light.shadow.map(|s| s.description()),
            Light::Projective(light) => light.shadow.map(|s| s.description()),
            Light::Spherical(light) => light.shadow.map(|s| s.description()),
        }
    }

    /// Blur applied to the light's variance map after rendering
    pub fn variance_blur(&self) -> Option<BlurParameters> {
        let shadow = match self {
            Light::Directional(light) => light.shadow,
            Light::Projective(light) => light.shadow,
            Light::Spherical(_) => None,
        };
        match shadow {
            Some(MappedShadow::Variance { blur, .. }) => Some(blur),
            _ => None,
        }
    }

    /// Convert to GPU data format
    pub fn to_gpu_data(&self) -> GpuLightData {
        match self {
            Light::Directional(light) => GpuLightData {
                position: Vec4::new(0.0, 0.0, 0.0, f32::INFINITY),
                color_intensity: light.color.extend(light.intensity),
                direction_type: light.direction.extend(0.0), // type 0 = directional
                params: Vec4::ZERO,
            },
            Light::Projective(light) => GpuLightData {
                position: light.position.extend(light.range),
                color_intensity: light.color.extend(light.intensity),
                direction_type: light.direction.extend(1.0), // type 1 = projective
                params: Vec4::new((light.fov * 0.5).cos(), 0.0, 0.0, 0.0),
            },
            Light::Spherical(light) => GpuLightData {
                position: light.position.extend(light.radius),
                color_intensity: light.color.extend(light.intensity),
                direction_type: Vec4::new(0.0, 0.0, 0.0, 2.0), // type 2 = spherical
                params: Vec4::ZERO,
            },
        }
    }
}

/// GPU-friendly light data structure
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLightData {
    /// xyz = position, w = range or radius
    pub position: Vec4,
    /// xyz = color, w = intensity
    pub color_intensity: Vec4,
    /// xyz = direction, w = light type (0=directional, 1=projective, 2=spherical)
    pub direction_type: Vec4,
    /// x = cos(half cone angle), yzw = unused
    pub params: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_description_follows_light_kind() {
        let mut light = SphericalLight::new(LightId(1), Vec3::ZERO, Vec3::ONE, 1.0, 5.0);
        assert_eq!(Light::Spherical(light.clone()).shadow_description(), None);

        let map = ShadowTextureDescription::new(256);
        light.shadow = Some(OmniShadow::DualParaboloid(map));
        assert_eq!(
            Light::Spherical(light).shadow_description(),
            Some(ShadowMapDescription::OmniDualParaboloidBasic(map))
        );
    }

    #[test]
    fn test_directional_projection_contains_bounds() {
        let light = DirectionalLight::new(LightId(0), Vec3::new(0.0, -1.0, -1.0), Vec3::ONE, 1.0);
        let bounds = [Vec3::new(-2.0, 0.0, -2.0), Vec3::new(2.0, 1.0, 2.0)];
        let vp = light.view_projection(&bounds);
        for point in bounds {
            let clip = vp.project_point3(point);
            assert!(clip.x.abs() <= 1.0 + 1e-4 && clip.y.abs() <= 1.0 + 1e-4);
        }
    }
}
