//! World-space bounding boxes for tiles

use std::sync::Arc;

use crate::core::types::{DVec2, DVec3};
use crate::math::Aabb;
use super::TileId;

/// Maps tile ids to world-space bounding boxes.
///
/// The streaming core never computes map projections itself; it only
/// consults the decorator. Implementations must be pure and thread-safe
/// after construction.
pub trait AabbDecorator: Send + Sync {
    fn aabb(&self, id: TileId) -> Aabb;
}

pub type AabbDecoratorPtr = Arc<dyn AabbDecorator>;

/// Planar decorator: the root tile covers a rectangle in the xy ground
/// plane, each zoom level subdivides it evenly, and z spans a fixed
/// height range.
#[derive(Clone, Copy, Debug)]
pub struct PlanarBounds {
    origin: DVec2,
    size: DVec2,
    min_height: f64,
    max_height: f64,
}

impl PlanarBounds {
    pub fn new(origin: DVec2, size: DVec2, min_height: f64, max_height: f64) -> Self {
        Self {
            origin,
            size,
            min_height,
            max_height,
        }
    }
}

impl AabbDecorator for PlanarBounds {
    fn aabb(&self, id: TileId) -> Aabb {
        let n = (1u64 << id.zoom) as f64;
        let tile = self.size / n;
        let min = self.origin + tile * DVec2::new(id.x as f64, id.y as f64);
        Aabb::new(
            DVec3::new(min.x, min.y, self.min_height),
            DVec3::new(min.x + tile.x, min.y + tile.y, self.max_height),
        )
    }
}
