/// Decoded texture pixels, ready for upload

use std::path::Path;

use crate::error::{Error, Result};

/// RGBA8 image in row-major order, top row first
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Build from raw RGBA8 bytes
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `pixels` is not `width * height * 4` bytes long.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(Error::invalid_argument(
                "TextureImage",
                "from_rgba8",
                format!(
                    "{}x{} texture needs {} bytes, got {}",
                    width,
                    height,
                    expected,
                    pixels.len()
                ),
            ));
        }
        Ok(Self { width, height, pixels })
    }

    /// Decode an image file (PNG) into RGBA8
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path)
            .map_err(|e| Error::Io(format!("Failed to load texture '{}': {}", path.display(), e)))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba8(width, height, decoded.into_raw())
    }

    /// Single-color texture
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self { width, height, pixels }
    }
}
