use url::Url;

use crate::error::PipelineError;

/// Suffixes accepted on image URLs. Matching is case-sensitive.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".png", ".jpg"];

/// Check that `image_url` names a PNG or JPEG over HTTP(S).
///
/// Runs before any network I/O. The URL must be non-empty, end in exactly
/// `.png` or `.jpg`, and parse as an absolute `http`/`https` URL.
pub fn validate_image_url(image_url: &str) -> Result<(), PipelineError> {
    let invalid = || PipelineError::InvalidImageUrl {
        url: image_url.to_string(),
    };

    if image_url.is_empty() || !ALLOWED_EXTENSIONS.iter().any(|ext| image_url.ends_with(ext)) {
        return Err(invalid());
    }

    let parsed = Url::parse(image_url).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }

    Ok(())
}
