//! Accepted poster image formats and upload limits.
//!
//! Only the first bytes of the payload are inspected: the declared MIME type
//! must be on the allow-list and must agree with the format sniffed from the
//! content, so a renamed text file cannot be stored as an image.

use image::ImageFormat;

use crate::error::CoreError;

/// Default per-upload size limit (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// MIME types accepted for poster images.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Check an uploaded image and return the file extension to store it under.
pub fn check_image(
    declared_mime: Option<&str>,
    data: &[u8],
    max_bytes: usize,
) -> Result<&'static str, CoreError> {
    if data.is_empty() {
        return Err(CoreError::Validation("Image file is empty".into()));
    }
    if data.len() > max_bytes {
        return Err(CoreError::Validation(format!(
            "Image file must not exceed {} bytes",
            max_bytes
        )));
    }

    let mime = normalize_mime(declared_mime.unwrap_or_default());
    if !ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(CoreError::Validation(format!(
            "Unsupported image type '{mime}'. Supported: {}",
            ACCEPTED_MIME_TYPES.join(", ")
        )));
    }

    let sniffed = image::guess_format(data).map_err(|_| {
        CoreError::Validation("Image content is not a recognised image format".into())
    })?;
    if ImageFormat::from_mime_type(&mime) != Some(sniffed) {
        return Err(CoreError::Validation(format!(
            "Image content does not match declared type '{mime}'"
        )));
    }

    extension_for(sniffed)
}

/// Lower-case a MIME type and drop any parameters (`; charset=...`).
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn extension_for(format: ImageFormat) -> Result<&'static str, CoreError> {
    match format {
        ImageFormat::Png => Ok("png"),
        ImageFormat::Jpeg => Ok("jpg"),
        ImageFormat::Gif => Ok("gif"),
        ImageFormat::WebP => Ok("webp"),
        other => Err(CoreError::Validation(format!(
            "Unsupported image format {other:?}"
        ))),
    }
}
