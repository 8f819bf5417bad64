//! Payload decoding and default tile synthesis
//!
//! Decoding failures never cross the scheduler boundary: malformed or
//! missing payload bytes degrade to the default tile, observable only
//! through pixel content.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageBuffer, ImageFormat, RgbaImage};

use crate::core::types::{Result, SharedBytes};
use crate::raster::Raster;
use crate::render::texture::CompressionAlgorithm;
use super::ColorData;

/// Decode ortho tile bytes into an RGBA raster
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Decode height tile bytes into a u16 elevation raster.
///
/// Native 16-bit grayscale images are used directly; 8-bit color images
/// pack elevation as `(r << 8) | g`.
pub fn decode_height(bytes: &[u8]) -> Result<Raster<u16>> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(match decoded {
        DynamicImage::ImageLuma16(gray) => {
            let (width, height) = gray.dimensions();
            Raster::from_vec(width, height, gray.into_raw())
        }
        other => {
            let rgba = other.to_rgba8();
            let (width, height) = rgba.dimensions();
            let data = rgba
                .pixels()
                .map(|p| (u16::from(p[0]) << 8) | u16::from(p[1]))
                .collect();
            Raster::from_vec(width, height, data)
        }
    })
}

/// Build the default ortho tile: a white JPEG of the given edge length
pub fn default_ortho_tile(size: u32) -> SharedBytes {
    let tile = image::RgbImage::from_pixel(size, size, image::Rgb([255, 255, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(tile)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .expect("default ortho tile encodes to memory");
    Arc::new(buffer.into_inner())
}

/// Build the default height tile: a black 16-bit PNG of the given edge length
pub fn default_height_tile(size: u32) -> SharedBytes {
    let tile: ImageBuffer<image::Luma<u16>, Vec<u16>> = ImageBuffer::new(size, size);
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma16(tile)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("default height tile encodes to memory");
    Arc::new(buffer.into_inner())
}

/// Color payload for one GPU tile: decode uncompressed imagery, pass
/// pre-compressed blobs through, substitute the default tile when bytes
/// are missing or malformed.
pub fn color_data(
    bytes: Option<&SharedBytes>,
    algorithm: CompressionAlgorithm,
    default_bytes: &SharedBytes,
) -> ColorData {
    match bytes {
        Some(blob) if algorithm != CompressionAlgorithm::Uncompressed => ColorData::Compressed {
            algorithm,
            bytes: Arc::clone(blob),
        },
        Some(blob) => match decode_rgba(blob) {
            Ok(img) => ColorData::Rgba8(Arc::new(img)),
            Err(e) => {
                log::warn!("ortho tile decode failed ({e}), substituting default tile");
                default_color(default_bytes)
            }
        },
        None => default_color(default_bytes),
    }
}

fn default_color(default_bytes: &SharedBytes) -> ColorData {
    let img = decode_rgba(default_bytes).expect("default ortho tile is a valid image");
    ColorData::Rgba8(Arc::new(img))
}

/// Height raster for one GPU tile, substituting the default tile when
/// bytes are missing or malformed.
pub fn height_raster(bytes: Option<&SharedBytes>, default_bytes: &SharedBytes) -> Raster<u16> {
    match bytes {
        Some(blob) => decode_height(blob).unwrap_or_else(|e| {
            log::warn!("height tile decode failed ({e}), substituting default tile");
            default_height(default_bytes)
        }),
        None => default_height(default_bytes),
    }
}

fn default_height(default_bytes: &SharedBytes) -> Raster<u16> {
    decode_height(default_bytes).expect("default height tile is a valid image")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ortho_tile_is_white_jpeg() {
        let bytes = default_ortho_tile(64);
        let img = decode_rgba(&bytes).unwrap();
        assert_eq!(img.dimensions(), (64, 64));
        let p = img.get_pixel(32, 32);
        // JPEG is lossy; a solid tile stays near-white
        assert!(p[0] > 250 && p[1] > 250 && p[2] > 250);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_default_height_tile_is_zero() {
        let bytes = default_height_tile(65);
        let raster = decode_height(&bytes).unwrap();
        assert_eq!((raster.width(), raster.height()), (65, 65));
        assert!(raster.data().iter().all(|&h| h == 0));
    }

    #[test]
    fn test_decode_height_prefers_native_16_bit() {
        let gray: ImageBuffer<image::Luma<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(4, 4, image::Luma([12345u16]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma16(gray)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();

        let raster = decode_height(buffer.get_ref()).unwrap();
        assert_eq!(raster.get(2, 2), Some(12345));
    }

    #[test]
    fn test_decode_height_packs_color_channels() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 0]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();

        let raster = decode_height(buffer.get_ref()).unwrap();
        assert_eq!(raster.get(0, 0), Some((1 << 8) | 2));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_rgba(b"not an image").is_err());
        assert!(decode_height(b"not an image").is_err());
    }

    #[test]
    fn test_color_data_substitutes_default_on_missing_and_malformed() {
        let default = default_ortho_tile(16);

        for bytes in [None, Some(Arc::new(b"garbage".to_vec()))] {
            match color_data(bytes.as_ref(), CompressionAlgorithm::Uncompressed, &default) {
                ColorData::Rgba8(img) => assert_eq!(img.dimensions(), (16, 16)),
                ColorData::Compressed { .. } => panic!("expected decoded default"),
            }
        }
    }

    #[test]
    fn test_color_data_passes_compressed_blobs_through() {
        let default = default_ortho_tile(16);
        let blob = Arc::new(vec![0u8; 32]);

        match color_data(Some(&blob), CompressionAlgorithm::Etc2, &default) {
            ColorData::Compressed { algorithm, bytes } => {
                assert_eq!(algorithm, CompressionAlgorithm::Etc2);
                assert!(Arc::ptr_eq(&bytes, &blob));
            }
            ColorData::Rgba8(_) => panic!("expected passthrough"),
        }
    }

    #[test]
    fn test_height_raster_substitutes_default() {
        let default = default_height_tile(8);
        let raster = height_raster(None, &default);
        assert_eq!((raster.width(), raster.height()), (8, 8));

        let malformed = Arc::new(b"zzz".to_vec());
        let raster = height_raster(Some(&malformed), &default);
        assert!(raster.data().iter().all(|&h| h == 0));
    }
}
