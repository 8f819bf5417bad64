//! Core types and utilities

pub mod camera;
pub mod error;
pub mod types;

pub use error::Error;
pub use types::*;
