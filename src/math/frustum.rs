//! View-frustum culling for tile selection

use crate::core::types::{DMat4, DVec3, DVec4};
use super::aabb::Aabb;

/// Half-space `normal . p + distance >= 0`
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane {
    /// Build a normalized plane from raw `ax + by + cz + d` coefficients
    fn from_coefficients(v: DVec4) -> Self {
        let inv_len = v.truncate().length().recip();
        Self {
            normal: v.truncate() * inv_len,
            distance: v.w * inv_len,
        }
    }

    /// Signed distance to the plane, positive on the inside
    pub fn distance_to_point(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.distance
    }
}

/// The six bounding half-spaces of a camera's view volume
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the bounding planes of a view-projection matrix. Each clip
    /// axis contributes the pair `w_row ± axis_row`: near/far from z,
    /// left/right from x, bottom/top from y.
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = vp.transpose();
        let w = rows.w_axis;

        let mut planes = [Plane { normal: DVec3::Z, distance: 0.0 }; 6];
        for (pair, row) in [rows.z_axis, rows.x_axis, rows.y_axis].into_iter().enumerate() {
            planes[pair * 2] = Plane::from_coefficients(w + row);
            planes[pair * 2 + 1] = Plane::from_coefficients(w - row);
        }
        Self { planes }
    }

    /// Check if a point lies inside every bounding half-space
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Conservative box test: a box is rejected only when some plane has
    /// even the box corner most aligned with its normal on the outside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let farthest = DVec3::select(plane.normal.cmpge(DVec3::ZERO), aabb.max, aabb.min);
            plane.distance_to_point(farthest) >= 0.0
        })
    }
}
