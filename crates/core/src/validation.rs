//! Input validation helpers.
//!
//! Request DTOs declare their schema with `#[derive(Validate)]`; this module
//! turns the first failing rule into a [`CoreError::Validation`] so handlers
//! report a single human-readable message.

use validator::{Validate, ValidationErrors};

use crate::error::CoreError;
use crate::types::DbId;

/// Run the declared validation rules on `input`.
///
/// Only the first failure (ordered by field name) is reported.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(first_message(&errors)))
}

/// Parse a client-supplied identifier field, rejecting malformed values.
pub fn parse_id_field(field: &str, raw: &str) -> Result<DbId, CoreError> {
    raw.trim()
        .parse::<DbId>()
        .map_err(|_| CoreError::Validation(format!("\"{field}\" must be a valid id")))
}

fn first_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|err| match &err.message {
                Some(msg) => msg.to_string(),
                None => format!("\"{field}\" is invalid"),
            })
        })
        .unwrap_or_else(|| "Invalid input".to_string())
}
