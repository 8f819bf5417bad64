//! Renderer-facing protocol types

pub mod texture;
