//! Quad-tree refinement predicate
//!
//! A tile subdivides when one of its texels would project to more pixels
//! on screen than the permissible error. Tiles outside the view frustum
//! (which includes everything behind the camera) never refine.

use std::sync::Arc;

use crate::core::camera::Definition;
use crate::tile::bounds::AabbDecoratorPtr;
use crate::tile::TileId;

/// Hard zoom cap guarding the traversal against unbounded refinement
pub const MAX_ZOOM_LEVEL: u8 = 20;

/// Build the refinement predicate for one camera state. The returned
/// closure is pure: captured state is cloned, so it can outlive the
/// scheduler borrow it was built from.
pub fn refine_functor(
    camera: &Definition,
    aabb_decorator: &AabbDecoratorPtr,
    error_threshold_px: f32,
    tile_size_px: u32,
) -> impl Fn(TileId) -> bool {
    let camera = camera.clone();
    let frustum = camera.frustum();
    let decorator = Arc::clone(aabb_decorator);

    move |id: TileId| {
        if id.zoom >= MAX_ZOOM_LEVEL {
            return false;
        }
        let bounds = decorator.aabb(id);
        if !frustum.intersects_aabb(&bounds) {
            return false;
        }

        let size = bounds.size();
        let texel_size = size.x.max(size.y) / tile_size_px as f64;
        let distance = bounds.distance_to_point(camera.position);
        camera.screen_space_size(texel_size, distance) > error_threshold_px as f64
    }
}
