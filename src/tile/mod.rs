//! Tile identifiers and payload types
//!
//! A tile id addresses one cell of the pyramidal quad-tree: `(zoom, x, y)`
//! with four children per tile at `zoom + 1`. Four sibling tiles form a
//! quad, identified by their parent id; the quad is the unit of
//! scheduling, caching and GPU residency.

use std::fmt;
use std::sync::Arc;

use crate::core::types::SharedBytes;
use crate::math::Aabb;
use crate::raster::Raster;
use crate::render::texture::CompressionAlgorithm;

pub mod bounds;
pub mod conversion;
pub mod quadtree;

pub use bounds::{AabbDecorator, AabbDecoratorPtr, PlanarBounds};

/// Identifier of one tile of the pyramidal quad-tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    /// The root tile covering the whole world extent
    pub const ROOT: TileId = TileId { zoom: 0, x: 0, y: 0 };

    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// The four children at `zoom + 1`, in z-order
    pub fn children(&self) -> [TileId; 4] {
        let (zoom, x, y) = (self.zoom + 1, self.x * 2, self.y * 2);
        [
            TileId::new(zoom, x, y),
            TileId::new(zoom, x + 1, y),
            TileId::new(zoom, x, y + 1),
            TileId::new(zoom, x + 1, y + 1),
        ]
    }

    /// The parent tile, or `None` for the root
    pub fn parent(&self) -> Option<TileId> {
        if self.zoom == 0 {
            None
        } else {
            Some(TileId::new(self.zoom - 1, self.x / 2, self.y / 2))
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Entries of the bounded caches expose the tile id they are keyed by
pub trait TileBound {
    fn tile_id(&self) -> TileId;
}

/// Undecoded payload of a single tile. Either blob may be absent;
/// absence means "use the default tile".
#[derive(Clone, Debug)]
pub struct TileData {
    pub id: TileId,
    /// Color imagery, compressed bytes (JPEG/PNG or a compressed-texture blob)
    pub ortho: Option<SharedBytes>,
    /// Elevation raster, compressed bytes
    pub height: Option<SharedBytes>,
}

/// Four sibling tiles sharing a parent, identified by the parent id.
/// Fewer than four children occur only at data-source boundaries.
#[derive(Clone, Debug)]
pub struct TileQuad {
    pub id: TileId,
    pub tiles: Vec<TileData>,
}

impl TileQuad {
    pub fn n_tiles(&self) -> usize {
        self.tiles.len()
    }
}

impl TileBound for TileQuad {
    fn tile_id(&self) -> TileId {
        self.id
    }
}

/// Decoded color payload of a GPU tile
#[derive(Clone, Debug)]
pub enum ColorData {
    /// Uncompressed RGBA raster, decoded on the scheduler thread
    Rgba8(Arc<image::RgbaImage>),
    /// Pre-compressed texture blob, passed through to the renderer
    Compressed {
        algorithm: CompressionAlgorithm,
        bytes: SharedBytes,
    },
}

/// Decoded form of one tile, ready for texture upload
#[derive(Clone, Debug)]
pub struct GpuTile {
    pub id: TileId,
    pub bounds: Aabb,
    pub ortho: ColorData,
    pub height: Arc<Raster<u16>>,
}

/// Decoded quad handed to the renderer; the scheduler does not mutate
/// it after emission.
#[derive(Clone, Debug)]
pub struct GpuTileQuad {
    pub id: TileId,
    pub tiles: Vec<GpuTile>,
}

impl TileBound for GpuTileQuad {
    fn tile_id(&self) -> TileId {
        self.id
    }
}

/// Shadow-cache record mirroring GPU residency, by id only
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuCacheInfo {
    pub id: TileId,
}

impl TileBound for GpuCacheInfo {
    fn tile_id(&self) -> TileId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_are_z_ordered() {
        let id = TileId::new(3, 5, 2);
        assert_eq!(
            id.children(),
            [
                TileId::new(4, 10, 4),
                TileId::new(4, 11, 4),
                TileId::new(4, 10, 5),
                TileId::new(4, 11, 5),
            ]
        );
    }

    #[test]
    fn test_parent_of_children() {
        let id = TileId::new(7, 33, 91);
        for child in id.children() {
            assert_eq!(child.parent(), Some(id));
        }
        assert_eq!(TileId::ROOT.parent(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TileId::new(4, 10, 5).to_string(), "4/10/5");
    }
}
