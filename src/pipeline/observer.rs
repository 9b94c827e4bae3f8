//! Per-frame observer context
//!
//! Built once at the start of a frame from the visible set's camera and the
//! output size, then shared by every stage of that frame.

use glam::{Mat4, Vec3, Vec4};

use crate::backend::*;
use crate::scene::{Camera, Instance};

/// Camera matrices for one frame
#[derive(Debug, Clone)]
pub struct Observer {
    pub camera: Camera,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub extent: Extent,
}

impl Observer {
    /// Matrices for `camera` rendering into a surface of `extent`
    pub fn new(camera: &Camera, extent: Extent) -> Self {
        let mut camera = camera.clone();
        camera.set_aspect(extent.width as f32, extent.height.max(1) as f32);
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        Self {
            view,
            projection,
            view_projection: projection * view,
            extent,
            camera,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.camera.position
    }

    /// Distance in front of the camera along its view axis
    pub fn view_depth(&self, point: Vec3) -> f32 {
        -self.view.transform_point3(point).z
    }

    /// Uniform block shared by every draw of the frame
    pub fn uniform(&self) -> ObserverUniform {
        ObserverUniform {
            view: self.view,
            projection: self.projection,
            view_projection: self.view_projection,
            inv_view: self.view.inverse(),
            inv_projection: self.projection.inverse(),
            position: self.camera.position.extend(1.0),
            near_far: Vec4::new(
                self.camera.projection.near(),
                self.camera.projection.far(),
                self.extent.width as f32,
                self.extent.height as f32,
            ),
        }
    }

    pub fn instance_uniform(&self, instance: &Instance) -> InstanceUniform {
        let model = instance.transform.matrix();
        let model_view = self.view * model;
        InstanceUniform {
            model,
            model_view,
            normal_matrix: model_view.inverse().transpose(),
        }
    }

    /// Upload the observer block to the backend
    pub fn upload<B: GraphicsBackend>(&self, backend: &mut B) {
        backend.write_uniform_block("observer", bytemuck::bytes_of(&self.uniform()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_depth_grows_away_from_camera() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let observer = Observer::new(&camera, Extent::new(640, 480));
        assert!((observer.view_depth(Vec3::ZERO) - 5.0).abs() < 1e-5);
        assert!(observer.view_depth(Vec3::new(0.0, 0.0, -5.0)) > observer.view_depth(Vec3::ZERO));
    }
}
