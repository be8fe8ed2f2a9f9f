//! Resize, greyscale and JPEG encode.
//!
//! # Design Decisions
//!
//! - **Forced square output**: the source is stretched to 256×256 whatever its
//!   aspect ratio.
//!
//! - **Greyscale before encode**: the resized image is reduced to a single
//!   luminance channel, so the JPEG is written as a one-component image.
//!
//! - **Quality is an encode parameter**: it is applied last, after all pixel
//!   operations.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use crate::error::TransformError;

/// Width of every artifact in pixels.
pub const OUTPUT_WIDTH: u32 = 256;

/// Height of every artifact in pixels.
pub const OUTPUT_HEIGHT: u32 = 256;

/// JPEG quality of every artifact (0-100 scale).
pub const OUTPUT_JPEG_QUALITY: u8 = 60;

// =============================================================================
// Transformer
// =============================================================================

/// Applies the resize/greyscale/quality filter to decoded images.
///
/// # Example
///
/// ```ignore
/// use image_filter_server::transform::ImageTransformer;
///
/// let transformer = ImageTransformer::new();
/// let jpeg = transformer.transform(&decoded)?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    width: u32,
    height: u32,
    quality: u8,
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageTransformer {
    /// Create a transformer with the standard 256×256, quality 60 settings.
    pub fn new() -> Self {
        Self {
            width: OUTPUT_WIDTH,
            height: OUTPUT_HEIGHT,
            quality: OUTPUT_JPEG_QUALITY,
        }
    }

    /// Output dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// JPEG quality used for encoding.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Resize and greyscale the image without encoding it.
    pub fn filter(&self, image: &DynamicImage) -> GrayImage {
        image
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_luma8()
    }

    /// Run the full filter and return the encoded JPEG.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Encode`] if the JPEG encoder fails.
    pub fn transform(&self, image: &DynamicImage) -> Result<Bytes, TransformError> {
        let grey = self.filter(image);

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(&grey)
            .map_err(|e| TransformError::Encode(e.to_string()))?;

        Ok(Bytes::from(output))
    }

    /// Run [`transform`](Self::transform) on tokio's blocking pool.
    pub async fn transform_blocking(&self, image: DynamicImage) -> Result<Bytes, TransformError> {
        let transformer = self.clone();
        tokio::task::spawn_blocking(move || transformer.transform(&image))
            .await
            .map_err(|e| TransformError::Task(e.to_string()))?
    }
}

// =============================================================================
// Tests
// =============================================================================
