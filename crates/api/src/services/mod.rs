//! Entity services.
//!
//! Services own the control flow of each operation: validation, persistence
//! and (for posters) the artifact lifecycle. Handlers only translate HTTP to
//! service calls and results to envelopes.

pub mod category;
pub mod poster;

pub use category::CategoryService;
pub use poster::PosterService;

use posterboard_core::error::CoreError;
use posterboard_core::types::DbId;

/// Resolve a path id. Ids that cannot exist are reported as not found rather
/// than malformed, so lookups by any unknown id behave the same.
pub(crate) fn lookup_id(entity: &'static str, raw: &str) -> Result<DbId, CoreError> {
    raw.trim()
        .parse::<DbId>()
        .map_err(|_| CoreError::not_found(entity, raw))
}
