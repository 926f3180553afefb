//! Multipart handling for poster forms.
//!
//! The form is read completely before anything is written: size and MIME
//! checks run on the buffered image, and only a form that parsed cleanly has
//! its image saved to the artifact store. From that point the returned
//! [`UploadedImage`] is owned by the poster service, which either commits it
//! or removes it.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::http::StatusCode;
use posterboard_core::artifact::ArtifactStore;
use posterboard_core::error::CoreError;
use posterboard_core::image_upload::{check_image, normalize_mime};
use posterboard_db::models::poster::PosterInput;

use crate::error::{AppError, AppResult};

/// Form field carrying the category id.
pub const CATEGORY_ID_FIELD: &str = "categoryId";
/// Form field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// An image that has been written to the artifact store but is not yet
/// referenced by any poster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Name of the form field the file arrived in.
    pub field_name: String,
    /// Artifact reference returned by the store.
    pub stored_path: String,
    /// Size in bytes.
    pub size: usize,
    /// Normalized declared MIME type.
    pub mime_type: String,
}

/// A parsed poster form.
#[derive(Debug)]
pub struct PosterForm {
    pub input: PosterInput,
    pub image: Option<UploadedImage>,
}

/// Buffered image part, not yet checked or stored.
struct RawImage {
    mime: Option<String>,
    data: Vec<u8>,
}

/// Read a poster form and store its image, if any.
///
/// Unknown fields are ignored. Only a single image file is accepted.
pub async fn read_poster_form(
    multipart: Result<Multipart, MultipartRejection>,
    artifacts: &dyn ArtifactStore,
    max_bytes: usize,
) -> AppResult<PosterForm> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut category_id: Option<String> = None;
    let mut raw_image: Option<RawImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            CATEGORY_ID_FIELD => {
                category_id = Some(field.text().await.map_err(multipart_error)?);
            }
            IMAGE_FIELD => {
                // Browsers submit an empty, unnamed part when no file was picked.
                let unnamed = field.file_name().map_or(true, str::is_empty);
                let mime = field.content_type().map(str::to_string);
                let data = read_limited(field, max_bytes).await?;
                if data.is_empty() && unnamed {
                    continue;
                }
                if raw_image.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one image file may be uploaded".into(),
                    ));
                }
                raw_image = Some(RawImage { mime, data });
            }
            _ => {} // ignore unknown fields
        }
    }

    let image = match raw_image {
        Some(raw) => Some(store_image(raw, artifacts, max_bytes).await?),
        None => None,
    };

    Ok(PosterForm {
        input: PosterInput { category_id },
        image,
    })
}

async fn store_image(
    raw: RawImage,
    artifacts: &dyn ArtifactStore,
    max_bytes: usize,
) -> AppResult<UploadedImage> {
    let extension = check_image(raw.mime.as_deref(), &raw.data, max_bytes)?;
    let stored_path = artifacts.save(extension, &raw.data).await?;
    tracing::debug!(path = %stored_path, size = raw.data.len(), "Uploaded image stored");

    Ok(UploadedImage {
        field_name: IMAGE_FIELD.to_string(),
        stored_path,
        size: raw.data.len(),
        mime_type: normalize_mime(raw.mime.as_deref().unwrap_or_default()),
    })
}

/// Buffer a field, failing as soon as it grows past `max_bytes`.
async fn read_limited(mut field: Field<'_>, max_bytes: usize) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > max_bytes {
            return Err(CoreError::Validation(format!(
                "Image file must not exceed {max_bytes} bytes"
            ))
            .into());
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
