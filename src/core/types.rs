//! Core type aliases and re-exports
//!
//! World coordinates are double precision: geographic extents run into
//! millions of metres, where f32 resolution drops below one metre.

use std::sync::Arc;

pub use glam::{DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, UVec2};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Immutable reference-counted byte buffer, shared between the RAM cache
/// and decoders without copying.
pub type SharedBytes = Arc<Vec<u8>>;
