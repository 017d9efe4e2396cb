//! Fixed camera placement and perspective projection
use nalgebra::{Matrix4, Point3, Vector3};

/// Camera configuration shared by every interactor
///
/// The camera sits on the -Y axis looking at the origin with +Z up; the
/// interactors move the model in front of it rather than moving the camera.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vector3<f64>,
    /// Vertical field of view, in degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }

    /// Create the projection matrix
    ///
    /// Follows OpenGL clip-space conventions (depth in `[-1, 1]`); rendering
    /// backends with a different depth range convert it themselves.
    pub fn projection_matrix(&self, aspect: f64) -> Matrix4<f64> {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Matrix4::new_perspective(aspect, self.fov.to_radians(), self.near, self.far)
    }

    /// Places a model-space transform in front of the camera
    pub fn matrix(&self, model_view: &Matrix4<f64>, aspect: f64) -> Matrix4<f64> {
        self.projection_matrix(aspect) * self.view_matrix() * model_view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, -3.0, 0.0),
            target: Point3::origin(),
            up: Vector3::z(),
            fov: 50.0,
            near: 0.1,
            far: 100.0,
        }
    }
}
