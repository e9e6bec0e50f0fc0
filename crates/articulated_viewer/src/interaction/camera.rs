//! Perspective camera used to turn pointer positions into world rays

use nalgebra::Perspective3;

use crate::foundation::math::{utils, Mat4, Point3, Vec3, Vec4, EPSILON};
use crate::scene::Ray;

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position in world space
    pub position: Vec3,
    /// Point the camera looks at
    pub target: Vec3,
    /// Up direction
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Width / height
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::z(),
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
    }

    /// Update the aspect ratio after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// World-to-view matrix (right-handed)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// View-to-clip matrix
    ///
    /// `None` for a zero or non-finite aspect ratio or an empty depth range,
    /// which `Perspective3` cannot represent.
    pub fn projection_matrix(&self) -> Option<Mat4> {
        let aspect_ok = self.aspect.is_finite() && self.aspect.abs() > EPSILON;
        let depth_ok = (self.far - self.near).is_finite() && (self.far - self.near).abs() > EPSILON;
        if !aspect_ok || !depth_ok {
            return None;
        }
        Some(Perspective3::new(self.aspect, self.fov, self.near, self.far).to_homogeneous())
    }

    /// Combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Option<Mat4> {
        Some(self.projection_matrix()? * self.view_matrix())
    }

    /// World-space ray from the eye through an NDC position
    ///
    /// Returns `None` when the camera matrices are degenerate (for example
    /// the eye sits on the target, the aspect ratio is zero, or `up` is
    /// parallel to the view direction).
    pub fn screen_to_world_ray(&self, ndc_x: f32, ndc_y: f32) -> Option<Ray> {
        utils::try_normalize(&(self.target - self.position))?;
        let inverse = self.view_projection_matrix()?.try_inverse()?;

        let unproject = |z: f32| {
            let h = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            (h.w.abs() > f32::EPSILON).then(|| h.xyz() / h.w)
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;

        let direction = utils::try_normalize(&(far - near))?;
        Some(Ray::new(self.position, direction))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(3.0, 3.0, 2.0), 45.0, 16.0 / 9.0, 0.05, 100.0)
    }
}
