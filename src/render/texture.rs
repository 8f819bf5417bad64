//! Texture residency protocol between scheduler and renderer
//!
//! The renderer keeps one array texture per layer (ortho color, height).
//! The scheduler emits residency deltas; the renderer places added tiles
//! in free array slots and frees the slots of removed ids. This module
//! carries the shared vocabulary: compressed-format negotiation, per-layer
//! texture formats, filter constraints and the id-to-slot bookkeeping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tile::TileId;

/// Compression applied to ortho tile payloads. Negotiated once at startup
/// and forwarded to the fetcher so pre-compressed blobs arrive in a format
/// the GPU accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    #[default]
    Uncompressed,
    Dxt1,
    Etc1,
    Etc2,
}

/// Best compressed-texture family the GPU supports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressedFormatCapability {
    Dxt1,
    Etc1,
    Etc2,
    None,
}

/// Detect the compressed-texture capability from the device features.
/// Desktop GPUs report BC (DXT), mobile GPUs ETC2.
pub fn compressed_format_capability(features: wgpu::Features) -> CompressedFormatCapability {
    if features.contains(wgpu::Features::TEXTURE_COMPRESSION_BC) {
        CompressedFormatCapability::Dxt1
    } else if features.contains(wgpu::Features::TEXTURE_COMPRESSION_ETC2) {
        CompressedFormatCapability::Etc2
    } else {
        CompressedFormatCapability::None
    }
}

/// Compression the fetcher should apply, given the GPU capability
pub fn preferred_compression_algorithm(
    capability: CompressedFormatCapability,
) -> CompressionAlgorithm {
    match capability {
        CompressedFormatCapability::Dxt1 => CompressionAlgorithm::Dxt1,
        CompressedFormatCapability::Etc1 => CompressionAlgorithm::Etc1,
        CompressedFormatCapability::Etc2 => CompressionAlgorithm::Etc2,
        CompressedFormatCapability::None => CompressionAlgorithm::Uncompressed,
    }
}

/// Texture format of the ortho color array for a negotiated algorithm.
/// ETC1 blobs upload as ETC2, which is bit-compatible.
pub fn ortho_texture_format(algorithm: CompressionAlgorithm) -> wgpu::TextureFormat {
    match algorithm {
        CompressionAlgorithm::Uncompressed => wgpu::TextureFormat::Rgba8UnormSrgb,
        CompressionAlgorithm::Dxt1 => wgpu::TextureFormat::Bc1RgbaUnormSrgb,
        CompressionAlgorithm::Etc1 | CompressionAlgorithm::Etc2 => {
            wgpu::TextureFormat::Etc2Rgb8UnormSrgb
        }
    }
}

/// Texture format of the height array
pub const HEIGHT_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Uint;

/// Mip filtering is only available for uncompressed color tiles;
/// compressed uploads carry a single mip level.
pub fn mip_filtering_supported(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb
    )
}

/// Sampler filter for a layer. Integer height textures must sample nearest.
pub fn filter_mode(format: wgpu::TextureFormat) -> wgpu::FilterMode {
    if format == HEIGHT_TEXTURE_FORMAT {
        wgpu::FilterMode::Nearest
    } else {
        wgpu::FilterMode::Linear
    }
}

/// Renderer-side bookkeeping for array-texture layers: which id occupies
/// which slot, and which slots are free.
#[derive(Debug)]
pub struct SlotAllocator {
    slots: HashMap<TileId, u32>,
    free: Vec<u32>,
    capacity: u32,
}

impl SlotAllocator {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity as usize),
            free: (0..capacity).rev().collect(),
            capacity,
        }
    }

    /// Slot occupied by an id, if resident
    pub fn slot(&self, id: TileId) -> Option<u32> {
        self.slots.get(&id).copied()
    }

    /// Allocate the next free slot for an id. Returns the existing slot
    /// when the id is already resident, `None` when the array is full.
    pub fn allocate(&mut self, id: TileId) -> Option<u32> {
        if let Some(&slot) = self.slots.get(&id) {
            return Some(slot);
        }
        let slot = self.free.pop()?;
        self.slots.insert(id, slot);
        Some(slot)
    }

    /// Free the slot of a removed id, returning it for reuse
    pub fn release(&mut self, id: TileId) -> Option<u32> {
        let slot = self.slots.remove(&id)?;
        self.free.push(slot);
        Some(slot)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn n_occupied(&self) -> usize {
        self.slots.len()
    }
}
