//! Camera definition driving tile refinement

use crate::core::types::{DMat3, DMat4, DQuat, DVec3, UVec2};
use crate::math::Frustum;

/// Camera state sufficient for the refinement predicate: position,
/// orientation, projection parameters and the viewport in pixels.
#[derive(Clone, Debug)]
pub struct Definition {
    /// World position
    pub position: DVec3,
    /// Rotation as quaternion
    pub rotation: DQuat,
    /// Vertical field of view in radians
    pub fov_y: f64,
    /// Viewport size in pixels
    pub viewport: UVec2,
    /// Near clip plane
    pub near: f64,
    /// Far clip plane
    pub far: f64,
}

impl Definition {
    /// Create a new camera definition
    pub fn new(position: DVec3, fov_y_degrees: f64, viewport: UVec2) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            viewport,
            near: 1.0,
            far: 1.0e6,
        }
    }

    /// Create a camera looking at a target
    pub fn look_at(position: DVec3, target: DVec3, up: DVec3) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        let rotation = DQuat::from_mat3(&DMat3::from_cols(right, up, -forward));

        Self {
            position,
            rotation,
            fov_y: 60.0_f64.to_radians(),
            viewport: UVec2::new(1920, 1080),
            near: 1.0,
            far: 1.0e6,
        }
    }

    /// Aspect ratio (width / height)
    pub fn aspect(&self) -> f64 {
        self.viewport.x as f64 / self.viewport.y as f64
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> DMat4 {
        let rotation_matrix = DMat4::from_quat(self.rotation.conjugate());
        let translation_matrix = DMat4::from_translation(-self.position);
        rotation_matrix * translation_matrix
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh(self.fov_y, self.aspect(), self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> DMat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Extract the view frustum
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }

    /// Get forward direction (negative Z in camera space)
    pub fn forward(&self) -> DVec3 {
        self.rotation * -DVec3::Z
    }

    /// On-screen extent in pixels of a world-space length viewed at the
    /// given distance. Infinite when the distance is zero (the camera
    /// touches or sits inside the measured volume).
    pub fn screen_space_size(&self, world_size: f64, distance: f64) -> f64 {
        if distance <= 0.0 {
            return f64::INFINITY;
        }
        world_size * self.viewport.y as f64 / (2.0 * distance * (self.fov_y * 0.5).tan())
    }

    /// Update viewport size (call on window resize)
    pub fn set_viewport(&mut self, viewport: UVec2) {
        self.viewport = viewport;
    }
}

impl Default for Definition {
    fn default() -> Self {
        Self::new(DVec3::new(0.0, 0.0, 5.0), 60.0, UVec2::new(1920, 1080))
    }
}
