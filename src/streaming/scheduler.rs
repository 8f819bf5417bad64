//! Tile scheduler core
//!
//! Synchronous control loop state: converts the current camera into a
//! working set of tile-quad ids, reconciles it against the RAM cache and
//! the GPU shadow cache, and returns fetch requests and residency deltas
//! as values. Timers and channels live in the service layer.

use std::sync::Arc;
use std::time::Duration;

use crate::core::camera::Definition;
use crate::core::types::SharedBytes;
use crate::render::texture::CompressionAlgorithm;
use crate::tile::bounds::AabbDecoratorPtr;
use crate::tile::{conversion, quadtree, GpuCacheInfo, GpuTile, GpuTileQuad, TileId, TileQuad};
use super::cache::Cache;
use super::config::SchedulerConfig;
use super::refine::refine_functor;

/// The RAM purge pass only acts once occupancy exceeds this slack factor
/// times the capacity, so bursts of stale deliveries do not thrash.
pub const RAM_PURGE_SLACK: f32 = 1.1;

/// Residency delta the renderer applies to its tile arrays
#[derive(Clone, Debug, Default)]
pub struct GpuQuadDelta {
    /// Freshly decoded quads to upload
    pub added: Vec<GpuTileQuad>,
    /// Ids whose slots are freed
    pub removed: Vec<TileId>,
}

impl GpuQuadDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Scheduler state: camera, decorator, error budget, the two bounded
/// caches and the default tiles substituted for missing payloads.
pub struct Scheduler {
    camera: Option<Definition>,
    aabb_decorator: Option<AabbDecoratorPtr>,
    permissible_screen_space_error: f32,
    ortho_tile_size: u32,
    height_tile_size: u32,
    update_timeout: Duration,
    purge_timeout: Duration,
    enabled: bool,
    ram_quad_limit: usize,
    compression_algorithm: CompressionAlgorithm,
    ram_cache: Cache<TileQuad>,
    gpu_cached: Cache<GpuCacheInfo>,
    default_ortho_tile: SharedBytes,
    default_height_tile: SharedBytes,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let default_ortho_tile = conversion::default_ortho_tile(config.ortho_tile_size);
        let default_height_tile = conversion::default_height_tile(config.height_tile_size);
        Self {
            camera: None,
            aabb_decorator: None,
            permissible_screen_space_error: config.permissible_screen_space_error,
            ortho_tile_size: config.ortho_tile_size,
            height_tile_size: config.height_tile_size,
            update_timeout: config.update_timeout,
            purge_timeout: config.purge_timeout,
            enabled: config.enabled,
            ram_quad_limit: config.ram_quad_limit,
            compression_algorithm: config.compression_algorithm,
            ram_cache: Cache::new(config.ram_quad_limit),
            gpu_cached: Cache::new(config.gpu_quad_limit),
            default_ortho_tile,
            default_height_tile,
        }
    }

    /// Store the most recent camera state. The service arms the update
    /// timer after delivering this.
    pub fn update_camera(&mut self, camera: Definition) {
        self.camera = Some(camera);
    }

    /// Insert fetched quads into the RAM cache. Stale deliveries for ids
    /// no longer needed are accepted; the next purge reclaims them.
    pub fn receive_quads(&mut self, quads: Vec<TileQuad>) {
        debug_assert!(quads.iter().all(|quad| quad.n_tiles() <= 4));
        self.ram_cache.insert(quads);
    }

    /// Ids currently needed but absent from the RAM cache, in traversal
    /// order. Emitted to the fetcher as `quads_requested`.
    pub fn collect_quad_requests(&self) -> Vec<TileId> {
        let mut requested = self.tiles_for_current_camera_position();
        requested.retain(|id| !self.ram_cache.contains(*id));
        requested
    }

    /// Reconcile GPU residency: promote every refined RAM quad that is
    /// not yet resident, mark still-refined shadow entries useful, purge
    /// the shadow cache, and fold quads promoted and evicted within the
    /// same pass out of the delta. The net delta stays consistent even
    /// when the desired set exceeds the GPU capacity.
    pub fn update_gpu_quads(&mut self) -> GpuQuadDelta {
        let Some(should_refine) = self.refine_predicate() else {
            return GpuQuadDelta::default();
        };
        let Some(decorator) = self.aabb_decorator.clone() else {
            return GpuQuadDelta::default();
        };

        let mut new_gpu_quads = Vec::new();
        {
            let gpu_cached = &self.gpu_cached;
            let compression = self.compression_algorithm;
            let default_ortho = &self.default_ortho_tile;
            let default_height = &self.default_height_tile;
            self.ram_cache.visit(|quad| {
                if !should_refine(quad.id) {
                    return false;
                }
                if gpu_cached.contains(quad.id) {
                    return true;
                }

                let tiles = quad
                    .tiles
                    .iter()
                    .map(|tile| GpuTile {
                        id: tile.id,
                        bounds: decorator.aabb(tile.id),
                        ortho: conversion::color_data(tile.ortho.as_ref(), compression, default_ortho),
                        height: Arc::new(conversion::height_raster(
                            tile.height.as_ref(),
                            default_height,
                        )),
                    })
                    .collect();
                new_gpu_quads.push(GpuTileQuad { id: quad.id, tiles });
                true
            });
        }

        let infos = new_gpu_quads
            .iter()
            .map(|quad| GpuCacheInfo { id: quad.id })
            .collect();
        self.gpu_cached.insert(infos);
        self.gpu_cached.visit(|info| should_refine(info.id));
        let superfluous = self.gpu_cached.purge();

        // quads promoted and evicted within this pass cancel out
        let mut superfluous_ids: Vec<TileId> =
            superfluous.iter().map(|info| info.id).collect();
        new_gpu_quads.retain(|quad| {
            if let Some(i) = superfluous_ids.iter().position(|id| *id == quad.id) {
                superfluous_ids.remove(i);
                false
            } else {
                true
            }
        });

        let delta = GpuQuadDelta {
            added: new_gpu_quads,
            removed: superfluous_ids,
        };
        if !delta.is_empty() {
            log::debug!(
                "gpu update: {} quads added, {} removed, {} resident",
                delta.added.len(),
                delta.removed.len(),
                self.gpu_cached.n_cached_objects()
            );
        }
        delta
    }

    /// Purge pass: evict RAM quads once occupancy exceeds the slack
    /// threshold, keeping quads the current camera still refines.
    pub fn purge_ram_cache(&mut self) {
        let slack_limit = (self.ram_quad_limit as f32 * RAM_PURGE_SLACK) as usize;
        if self.ram_cache.n_cached_objects() < slack_limit {
            return;
        }

        if let Some(should_refine) = self.refine_predicate() {
            self.ram_cache.visit(|quad| should_refine(quad.id));
        }
        let removed = self.ram_cache.purge();
        if !removed.is_empty() {
            log::debug!("purged {} quads from the ram cache", removed.len());
        }
    }

    /// The working set: every quad that must be available because its
    /// children are candidates for display, i.e. the inner nodes of the
    /// refinement traversal. Leaves are implicit children.
    fn tiles_for_current_camera_position(&self) -> Vec<TileId> {
        let Some(should_refine) = self.refine_predicate() else {
            return Vec::new();
        };

        let mut inner_nodes = Vec::new();
        quadtree::traverse(TileId::ROOT, should_refine, |id| {
            inner_nodes.push(id);
            id.children()
        });
        inner_nodes
    }

    fn refine_predicate(&self) -> Option<impl Fn(TileId) -> bool> {
        let camera = self.camera.as_ref()?;
        let decorator = self.aabb_decorator.as_ref()?;
        Some(refine_functor(
            camera,
            decorator,
            self.permissible_screen_space_error,
            self.ortho_tile_size,
        ))
    }

    pub fn set_aabb_decorator(&mut self, decorator: AabbDecoratorPtr) {
        self.aabb_decorator = Some(decorator);
    }

    pub fn set_permissible_screen_space_error(&mut self, error_px: f32) {
        if !error_px.is_finite() || error_px <= 0.0 {
            log::warn!("ignoring invalid screen space error {error_px}px");
            return;
        }
        self.permissible_screen_space_error = error_px;
    }

    /// Capacity changes take effect at the next purge
    pub fn set_ram_quad_limit(&mut self, limit: usize) {
        if limit == 0 {
            log::warn!("ignoring zero ram quad limit");
            return;
        }
        self.ram_quad_limit = limit;
        self.ram_cache.set_capacity(limit);
    }

    /// Capacity changes take effect at the next update pass
    pub fn set_gpu_quad_limit(&mut self, limit: usize) {
        if limit == 0 {
            log::warn!("ignoring zero gpu quad limit");
            return;
        }
        self.gpu_cached.set_capacity(limit);
    }

    pub fn set_update_timeout(&mut self, timeout: Duration) {
        if timeout.is_zero() {
            log::warn!("ignoring zero update timeout");
            return;
        }
        self.update_timeout = timeout;
    }

    pub fn set_purge_timeout(&mut self, timeout: Duration) {
        if timeout.is_zero() {
            log::warn!("ignoring zero purge timeout");
            return;
        }
        self.purge_timeout = timeout;
    }

    /// Compression the fetcher must apply to ortho payloads; forwarded
    /// from the renderer's format negotiation.
    pub fn set_compression_algorithm(&mut self, algorithm: CompressionAlgorithm) {
        self.compression_algorithm = algorithm;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn update_timeout(&self) -> Duration {
        self.update_timeout
    }

    pub fn purge_timeout(&self) -> Duration {
        self.purge_timeout
    }

    pub fn ortho_tile_size(&self) -> u32 {
        self.ortho_tile_size
    }

    pub fn height_tile_size(&self) -> u32 {
        self.height_tile_size
    }

    pub fn compression_algorithm(&self) -> CompressionAlgorithm {
        self.compression_algorithm
    }

    pub fn ram_cache(&self) -> &Cache<TileQuad> {
        &self.ram_cache
    }

    pub fn gpu_cache(&self) -> &Cache<GpuCacheInfo> {
        &self.gpu_cached
    }
}
