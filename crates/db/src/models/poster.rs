//! Poster model and DTOs.
//!
//! A poster is always returned together with its category; the flat
//! [`PosterRow`] produced by the join is folded into [`Poster`].

use posterboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use validator::Validate;

use super::category::Category;

/// A poster with its category eagerly loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poster {
    pub id: DbId,
    pub category_id: DbId,
    /// Reference to the stored image artifact (path under the upload directory).
    pub image: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub category: Category,
}

/// One row of `posters JOIN categories`.
#[derive(Debug, Clone, FromRow)]
pub struct PosterRow {
    pub id: DbId,
    pub category_id: DbId,
    pub image: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub category_name: String,
    pub category_created_at: Timestamp,
    pub category_updated_at: Timestamp,
}

impl From<PosterRow> for Poster {
    fn from(row: PosterRow) -> Self {
        Poster {
            id: row.id,
            category_id: row.category_id,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                created_at: row.category_created_at,
                updated_at: row.category_updated_at,
            },
        }
    }
}

/// A committed update: the poster as stored, plus the image it referenced
/// immediately before the write.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedPoster {
    pub poster: Poster,
    pub previous_image: String,
}

/// [`PosterRow`] returned by an update, with the image it replaced.
#[derive(Debug, Clone, FromRow)]
pub struct UpdatedPosterRow {
    #[sqlx(flatten)]
    pub poster: PosterRow,
    pub previous_image: String,
}

impl From<UpdatedPosterRow> for UpdatedPoster {
    fn from(row: UpdatedPosterRow) -> Self {
        UpdatedPoster {
            poster: row.poster.into(),
            previous_image: row.previous_image,
        }
    }
}

/// Text fields of a poster form, validated before any write.
#[derive(Debug, Clone, Default, Validate)]
pub struct PosterInput {
    #[validate(
        required(message = "\"categoryId\" is required"),
        length(min = 1, message = "\"categoryId\" is not allowed to be empty")
    )]
    pub category_id: Option<String>,
}

/// Insert payload for a poster whose image is already stored.
#[derive(Debug, Clone)]
pub struct NewPoster {
    pub category_id: DbId,
    pub image: String,
}

/// Update payload. `image` is `None` when the image is left unchanged.
#[derive(Debug, Clone)]
pub struct PosterChanges {
    pub category_id: DbId,
    pub image: Option<String>,
}
