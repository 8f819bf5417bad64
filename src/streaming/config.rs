//! Scheduler configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::texture::CompressionAlgorithm;

/// Tuning knobs of the tile scheduler. All of them can also be changed
/// at runtime through the scheduler's setters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Debounce before an update pass runs (roughly a few frames)
    pub update_timeout: Duration,
    /// Debounce before a RAM purge pass runs
    pub purge_timeout: Duration,
    /// Maximum quads held in the RAM cache
    pub ram_quad_limit: usize,
    /// Maximum quads resident on the GPU
    pub gpu_quad_limit: usize,
    /// Permissible on-screen size of one texel, in pixels
    pub permissible_screen_space_error: f32,
    /// Edge length of ortho tiles, in pixels
    pub ortho_tile_size: u32,
    /// Edge length of height tiles, in pixels
    pub height_tile_size: u32,
    /// Compression the fetcher applies to ortho payloads
    pub compression_algorithm: CompressionAlgorithm,
    /// Whether the scheduler arms its timers
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_timeout: Duration::from_millis(100),
            purge_timeout: Duration::from_millis(500),
            ram_quad_limit: 12000,
            gpu_quad_limit: 512,
            permissible_screen_space_error: 2.0,
            ortho_tile_size: 256,
            height_tile_size: 65,
            compression_algorithm: CompressionAlgorithm::Uncompressed,
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert!(config.purge_timeout > config.update_timeout);
        assert!(config.ram_quad_limit > config.gpu_quad_limit);
    }
}
