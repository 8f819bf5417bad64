//! Axis-aligned bounding boxes
//!
//! Tile bounds arrive from the AABB decorator as min/max corners in world
//! space; the streaming core only measures them (texel extent, distance
//! to the camera) and tests them against the view frustum.

use crate::core::types::DVec3;

/// World-space box spanned by two corners, `min <= max` per axis
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Edge lengths per axis
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Midpoint of the box
    pub fn center(&self) -> DVec3 {
        self.min + 0.5 * self.size()
    }

    /// Closest point of the box to `p`; `p` itself when inside
    pub fn closest_point(&self, p: DVec3) -> DVec3 {
        p.clamp(self.min, self.max)
    }

    /// Distance from `p` to the box, zero inside
    pub fn distance_to_point(&self, p: DVec3) -> f64 {
        p.distance(self.closest_point(p))
    }

    /// Surfaces count as inside
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.closest_point(p) == p
    }

    /// Whether two boxes overlap, touching faces included
    pub fn intersects(&self, other: &Aabb) -> bool {
        let separated = other.min.cmpgt(self.max).any() || self.min.cmpgt(other.max).any();
        !separated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::ONE)
    }

    #[test]
    fn test_extent_and_center() {
        let tile = Aabb::new(
            DVec3::new(250.0, 500.0, 0.0),
            DVec3::new(500.0, 750.0, 100.0),
        );
        assert_eq!(tile.size(), DVec3::new(250.0, 250.0, 100.0));
        assert_eq!(tile.center(), DVec3::new(375.0, 625.0, 50.0));
    }

    #[test]
    fn test_contains_point() {
        assert!(unit().contains_point(DVec3::splat(0.25)));
        assert!(unit().contains_point(DVec3::ONE));
        assert!(!unit().contains_point(DVec3::new(0.5, 0.5, 1.5)));
    }

    #[test]
    fn test_distance_zero_inside_euclidean_outside() {
        assert_eq!(unit().distance_to_point(DVec3::splat(0.5)), 0.0);
        assert_eq!(unit().distance_to_point(DVec3::new(4.0, 0.5, 0.5)), 3.0);
        let to_corner = unit().distance_to_point(DVec3::splat(2.0));
        assert!((to_corner - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_intersects() {
        let overlapping = Aabb::new(DVec3::splat(0.75), DVec3::splat(1.75));
        let touching = Aabb::new(DVec3::ONE, DVec3::splat(2.0));
        let apart = Aabb::new(DVec3::splat(3.0), DVec3::splat(4.0));
        assert!(unit().intersects(&overlapping));
        assert!(unit().intersects(&touching));
        assert!(!unit().intersects(&apart));
    }
}
