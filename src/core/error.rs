//! Error types for the streaming core

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
