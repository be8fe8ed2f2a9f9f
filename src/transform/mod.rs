//! Image transformation.
//!
//! Every artifact is produced by the same deterministic filter:
//!
//! 1. Resize to exactly [`OUTPUT_WIDTH`]×[`OUTPUT_HEIGHT`] (aspect ratio is not kept)
//! 2. Convert to greyscale (luminance only)
//! 3. Encode as JPEG at [`OUTPUT_JPEG_QUALITY`]

mod encoder;

pub use encoder::{ImageTransformer, OUTPUT_HEIGHT, OUTPUT_JPEG_QUALITY, OUTPUT_WIDTH};
