//! Transparent placeholder tile.
//!
//! Archives answer with this image when they hold no data for a tile and no
//! fallback can serve it, so map clients render "nothing here" instead of an
//! error.
//!
//! The PNG is encoded once at first access and shared for the lifetime of the
//! process.

use std::io::Cursor;
use std::sync::OnceLock;

use bytes::Bytes;
use image::{ImageError, ImageFormat, RgbaImage};
use tracing::error;

/// Edge length of the placeholder in pixels.
pub const PLACEHOLDER_SIZE: u32 = 256;

static PLACEHOLDER: OnceLock<Bytes> = OnceLock::new();

/// Encodes a fully transparent PNG of the given dimensions.
pub fn generate_transparent_png(width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    // New RGBA buffers are zeroed, i.e. transparent black
    let image = RgbaImage::new(width, height);
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Returns the shared 256×256 transparent placeholder.
///
/// Cloning the returned [`Bytes`] is cheap. If encoding ever fails the error
/// is logged and an empty body is served instead.
pub fn placeholder_tile() -> Bytes {
    PLACEHOLDER
        .get_or_init(
            || match generate_transparent_png(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE) {
                Ok(png) => Bytes::from(png),
                Err(e) => {
                    error!(error = %e, "Failed to encode placeholder tile");
                    Bytes::new()
                }
            },
        )
        .clone()
}

/// Encodes the placeholder eagerly.
///
/// Call during startup so an encoding problem surfaces before the first
/// request instead of as an empty tile.
pub fn init_placeholder() -> Result<(), ImageError> {
    if PLACEHOLDER.get().is_none() {
        let png = generate_transparent_png(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)?;
        let _ = PLACEHOLDER.set(Bytes::from(png));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_placeholder_is_png() {
        let png = placeholder_tile();
        assert!(png.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn test_placeholder_is_transparent_256() {
        let decoded = image::load_from_memory(&placeholder_tile())
            .unwrap()
            .to_rgba8();

        assert_eq!(decoded.dimensions(), (256, 256));
        assert!(decoded.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_placeholder_is_cached() {
        init_placeholder().unwrap();
        let a = placeholder_tile();
        let b = placeholder_tile();
        assert_eq!(a, b);
        // Same backing allocation
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_generate_other_sizes() {
        let png = generate_transparent_png(16, 8).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }
}
