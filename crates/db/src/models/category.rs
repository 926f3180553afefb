//! Category model and DTOs.

use posterboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `categories` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating or replacing a category.
///
/// The schema is closed: unknown fields are rejected during deserialization.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    #[validate(
        required(message = "\"name\" is required"),
        length(min = 1, message = "\"name\" is not allowed to be empty")
    )]
    pub name: Option<String>,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}
